//! Comment document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Stamped, Timestamps};

/// Collection name for comments
pub const COMMENT_COLLECTION: &str = "comments";

/// Comment document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CommentDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Lifecycle timestamps (created_at, updated_at)
    #[serde(flatten, default)]
    pub timestamps: Timestamps,

    /// Authoring profile
    pub owner: ObjectId,

    /// Web the comment is attached to
    pub web: ObjectId,

    pub text: String,
}

impl CommentDoc {
    /// Create a new comment document
    pub fn new(owner: ObjectId, web: ObjectId, text: String) -> Self {
        Self {
            _id: None,
            timestamps: Timestamps::default(),
            owner,
            web,
            text,
        }
    }
}

impl IntoIndexes for CommentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Per-web thread listing
            (
                doc! { "web": 1 },
                Some(IndexOptions::builder().name("web_index".to_string()).build()),
            ),
            // Owner FK for cascades
            (
                doc! { "owner": 1 },
                Some(IndexOptions::builder().name("owner_index".to_string()).build()),
            ),
        ]
    }
}

impl Stamped for CommentDoc {
    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}
