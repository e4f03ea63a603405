//! Collection document schema
//!
//! A named, ordered grouping of webs owned by one profile.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Stamped, Timestamps};

/// Collection name for collections
pub const COLLECTION_COLLECTION: &str = "collections";

/// Collection document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CollectionDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Lifecycle timestamps (created_at, updated_at)
    #[serde(flatten, default)]
    pub timestamps: Timestamps,

    /// Owning profile
    pub owner: ObjectId,

    /// Display name, text-indexed, unique per owner
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Member webs in display order
    #[serde(default)]
    pub webs: Vec<ObjectId>,

    /// View counter, incremented on read
    #[serde(default)]
    pub views: i64,

    /// Whether the collection appears in cross-owner feeds
    #[serde(default = "default_true")]
    pub is_public: bool,
}

fn default_true() -> bool {
    true
}

impl CollectionDoc {
    /// Create a new collection document
    pub fn new(owner: ObjectId, name: String, description: String) -> Self {
        Self {
            _id: None,
            timestamps: Timestamps::default(),
            owner,
            name,
            description,
            webs: Vec::new(),
            views: 0,
            is_public: true,
        }
    }
}

impl IntoIndexes for CollectionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One name per owner
            (
                doc! { "owner": 1, "name": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("owner_name_unique".to_string())
                        .build(),
                ),
            ),
            // Text search over names
            (
                doc! { "name": "text" },
                Some(IndexOptions::builder().name("name_text".to_string()).build()),
            ),
        ]
    }
}

impl Stamped for CollectionDoc {
    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}
