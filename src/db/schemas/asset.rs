//! Asset document schema
//!
//! Uploaded media owned by a profile; the binary lives in the media store,
//! the document records only its URL and handle.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Stamped, Timestamps};

/// Collection name for assets
pub const ASSET_COLLECTION: &str = "assets";

/// Kind of uploaded media
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    #[default]
    Image,
    Video,
    Audio,
    Document,
}

impl AssetKind {
    /// Collection-field value, as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Video => "video",
            AssetKind::Audio => "audio",
            AssetKind::Document => "document",
        }
    }
}

/// Asset document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AssetDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Lifecycle timestamps (created_at, updated_at)
    #[serde(flatten, default)]
    pub timestamps: Timestamps,

    /// Owning profile
    pub owner: ObjectId,

    pub title: String,

    #[serde(default)]
    pub asset_type: AssetKind,

    /// Stored object URL and its media-store handle
    pub url: String,

    pub public_id: String,

    #[serde(default = "default_true")]
    pub is_public: bool,
}

fn default_true() -> bool {
    true
}

impl AssetDoc {
    /// Create a new asset document
    pub fn new(
        owner: ObjectId,
        title: String,
        asset_type: AssetKind,
        url: String,
        public_id: String,
    ) -> Self {
        Self {
            _id: None,
            timestamps: Timestamps::default(),
            owner,
            title,
            asset_type,
            url,
            public_id,
            is_public: true,
        }
    }
}

impl IntoIndexes for AssetDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Owner FK for listings and cascades
            (
                doc! { "owner": 1 },
                Some(IndexOptions::builder().name("owner_index".to_string()).build()),
            ),
        ]
    }
}

impl Stamped for AssetDoc {
    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}
