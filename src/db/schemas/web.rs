//! Web document schema
//!
//! A web is a self-contained HTML/CSS/JS snippet with a rendered preview.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Stamped, Timestamps};

/// Collection name for webs
pub const WEB_COLLECTION: &str = "webs";

/// Web document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct WebDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Lifecycle timestamps (created_at, updated_at)
    #[serde(flatten, default)]
    pub timestamps: Timestamps,

    /// Owning profile
    pub owner: ObjectId,

    /// Display title, text-indexed
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Source payload
    #[serde(default)]
    pub html: String,

    #[serde(default)]
    pub css: String,

    #[serde(default)]
    pub js: String,

    /// Rendered preview image and its media-store handle
    pub image: String,

    pub image_public_id: String,

    /// External stylesheet / script URLs injected at render time
    #[serde(default)]
    pub css_links: Vec<String>,

    #[serde(default)]
    pub js_links: Vec<String>,

    /// View counter, incremented on read
    #[serde(default)]
    pub views: i64,

    /// Whether the web appears in cross-owner feeds
    #[serde(default = "default_true")]
    pub is_public: bool,

    /// Web this one was forked from, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forked_from: Option<ObjectId>,
}

fn default_true() -> bool {
    true
}

impl IntoIndexes for WebDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Owner FK for listings and cascades
            (
                doc! { "owner": 1 },
                Some(IndexOptions::builder().name("owner_index".to_string()).build()),
            ),
            // Text search over titles
            (
                doc! { "title": "text" },
                Some(IndexOptions::builder().name("title_text".to_string()).build()),
            ),
        ]
    }
}

impl Stamped for WebDoc {
    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}
