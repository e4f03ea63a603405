//! Save edge schema
//!
//! Bookmarks a collection for the acting profile, same toggle semantics as
//! reactions and follows.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Stamped, Timestamps};

/// Collection name for saves
pub const SAVE_COLLECTION: &str = "saves";

/// Save edge stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SaveDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Lifecycle timestamps (created_at, updated_at)
    #[serde(flatten, default)]
    pub timestamps: Timestamps,

    /// Collection being saved
    pub collection: ObjectId,

    /// Acting profile
    pub saved_by: ObjectId,
}

impl SaveDoc {
    /// Create a new save edge
    pub fn new(collection: ObjectId, saved_by: ObjectId) -> Self {
        Self {
            _id: None,
            timestamps: Timestamps::default(),
            collection,
            saved_by,
        }
    }
}

impl IntoIndexes for SaveDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // At most one edge per (collection, actor)
            (
                doc! { "collection": 1, "saved_by": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("collection_actor_unique".to_string())
                        .build(),
                ),
            ),
            // Actor FK for saved feeds
            (
                doc! { "saved_by": 1 },
                Some(
                    IndexOptions::builder()
                        .name("saved_by_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl Stamped for SaveDoc {
    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}
