//! Reaction edge schema
//!
//! One document per (actor, target) like. The target is a tagged reference,
//! so a reaction can point at any content kind while staying a single shape,
//! and the compound unique index makes the toggle atomic.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Stamped, Timestamps};
use crate::db::schemas::{
    ASSET_COLLECTION, COLLECTION_COLLECTION, COMMENT_COLLECTION, REPLY_COLLECTION, WEB_COLLECTION,
};

/// Collection name for reactions
pub const REACTION_COLLECTION: &str = "reactions";

/// Content kinds a reaction can attach to
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    #[default]
    Web,
    Asset,
    Collection,
    Comment,
    Reply,
}

impl TargetKind {
    /// Tag value as stored in the edge document
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Web => "web",
            TargetKind::Asset => "asset",
            TargetKind::Collection => "collection",
            TargetKind::Comment => "comment",
            TargetKind::Reply => "reply",
        }
    }

    /// Collection holding documents of this kind
    pub fn collection_name(&self) -> &'static str {
        match self {
            TargetKind::Web => WEB_COLLECTION,
            TargetKind::Asset => ASSET_COLLECTION,
            TargetKind::Collection => COLLECTION_COLLECTION,
            TargetKind::Comment => COMMENT_COLLECTION,
            TargetKind::Reply => REPLY_COLLECTION,
        }
    }
}

/// Tagged reference to a piece of content
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TargetRef {
    pub kind: TargetKind,
    pub id: ObjectId,
}

impl TargetRef {
    pub fn new(kind: TargetKind, id: ObjectId) -> Self {
        Self { kind, id }
    }

    pub fn web(id: ObjectId) -> Self {
        Self::new(TargetKind::Web, id)
    }

    pub fn asset(id: ObjectId) -> Self {
        Self::new(TargetKind::Asset, id)
    }

    pub fn collection(id: ObjectId) -> Self {
        Self::new(TargetKind::Collection, id)
    }

    pub fn comment(id: ObjectId) -> Self {
        Self::new(TargetKind::Comment, id)
    }

    pub fn reply(id: ObjectId) -> Self {
        Self::new(TargetKind::Reply, id)
    }
}

/// Reaction edge stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ReactionDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Lifecycle timestamps (created_at, updated_at)
    #[serde(flatten, default)]
    pub timestamps: Timestamps,

    /// Acting profile
    pub reacted_by: ObjectId,

    /// What was liked
    pub target: TargetRef,
}

impl ReactionDoc {
    /// Create a new reaction edge
    pub fn new(reacted_by: ObjectId, target: TargetRef) -> Self {
        Self {
            _id: None,
            timestamps: Timestamps::default(),
            reacted_by,
            target,
        }
    }
}

impl IntoIndexes for ReactionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // At most one edge per (target, actor); concurrent toggles race on
            // this index instead of on a read-then-write
            (
                doc! { "target.kind": 1, "target.id": 1, "reacted_by": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("target_actor_unique".to_string())
                        .build(),
                ),
            ),
            // Actor FK for liked-by feeds and profile cascades
            (
                doc! { "reacted_by": 1 },
                Some(
                    IndexOptions::builder()
                        .name("reacted_by_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl Stamped for ReactionDoc {
    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_kind_round_trips_as_lowercase_tag() {
        let target = TargetRef::comment(ObjectId::new());
        let doc = bson::to_document(&target).unwrap();
        assert_eq!(doc.get_str("kind").unwrap(), "comment");

        let back: TargetRef = bson::from_document(doc).unwrap();
        assert_eq!(back, target);
    }

    #[test]
    fn test_unique_index_covers_full_edge_key() {
        let (keys, opts) = ReactionDoc::into_indices().remove(0);
        assert_eq!(
            keys.keys().collect::<Vec<_>>(),
            vec!["target.kind", "target.id", "reacted_by"]
        );
        assert_eq!(opts.unwrap().unique, Some(true));
    }
}
