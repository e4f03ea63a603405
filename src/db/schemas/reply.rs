//! Reply document schema
//!
//! One level deep only: replies attach to comments, never to other replies.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Stamped, Timestamps};

/// Collection name for replies
pub const REPLY_COLLECTION: &str = "replies";

/// Reply document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ReplyDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Lifecycle timestamps (created_at, updated_at)
    #[serde(flatten, default)]
    pub timestamps: Timestamps,

    /// Authoring profile
    pub owner: ObjectId,

    /// Comment the reply is attached to
    pub comment: ObjectId,

    pub text: String,
}

impl ReplyDoc {
    /// Create a new reply document
    pub fn new(owner: ObjectId, comment: ObjectId, text: String) -> Self {
        Self {
            _id: None,
            timestamps: Timestamps::default(),
            owner,
            comment,
            text,
        }
    }
}

impl IntoIndexes for ReplyDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Per-comment thread listing
            (
                doc! { "comment": 1 },
                Some(IndexOptions::builder().name("comment_index".to_string()).build()),
            ),
            // Owner FK for cascades
            (
                doc! { "owner": 1 },
                Some(IndexOptions::builder().name("owner_index".to_string()).build()),
            ),
        ]
    }
}

impl Stamped for ReplyDoc {
    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}
