//! Follow edge schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Stamped, Timestamps};

/// Collection name for follows
pub const FOLLOW_COLLECTION: &str = "follows";

/// Follow edge stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct FollowDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Lifecycle timestamps (created_at, updated_at)
    #[serde(flatten, default)]
    pub timestamps: Timestamps,

    /// Profile being followed
    pub profile: ObjectId,

    /// Acting profile
    pub followed_by: ObjectId,
}

impl FollowDoc {
    /// Create a new follow edge
    pub fn new(profile: ObjectId, followed_by: ObjectId) -> Self {
        Self {
            _id: None,
            timestamps: Timestamps::default(),
            profile,
            followed_by,
        }
    }
}

impl IntoIndexes for FollowDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // At most one edge per (profile, actor)
            (
                doc! { "profile": 1, "followed_by": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("profile_actor_unique".to_string())
                        .build(),
                ),
            ),
            // Actor FK for following feeds
            (
                doc! { "followed_by": 1 },
                Some(
                    IndexOptions::builder()
                        .name("followed_by_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl Stamped for FollowDoc {
    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}
