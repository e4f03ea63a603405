//! Atomic engagement toggles
//!
//! A toggle flips the presence of one edge: reaction on content, follow on a
//! profile, save on a collection. The naive find-then-branch-then-write
//! sequence loses the at-most-one invariant under concurrent duplicates, so
//! every toggle here races on the edge collection's unique compound index
//! instead: delete-if-present first, then insert, and treat a duplicate-key
//! conflict as losing the race to a concurrent twin.

use bson::{doc, oid::ObjectId, Document};
use tracing::debug;

use crate::db::schemas::{FollowDoc, ReactionDoc, SaveDoc, TargetKind, TargetRef};
use crate::db::Collections;
use crate::types::{EngineError, Result};

/// Definite final state of a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The edge now exists
    Added,
    /// The edge no longer exists
    Removed,
}

impl ToggleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleOutcome::Added => "added",
            ToggleOutcome::Removed => "removed",
        }
    }
}

/// Engagement toggle engine backed by the edge collections
#[derive(Clone)]
pub struct ToggleEngine {
    collections: Collections,
}

impl ToggleEngine {
    pub fn new(collections: Collections) -> Self {
        Self { collections }
    }

    /// Flip the acting profile's reaction on a target.
    ///
    /// The target must resolve to an existing document of the tagged kind.
    pub async fn toggle_reaction(&self, actor: ObjectId, target: TargetRef) -> Result<ToggleOutcome> {
        self.resolve_target(&target).await?;

        let key = doc! {
            "target.kind": target.kind.as_str(),
            "target.id": target.id,
            "reacted_by": actor,
        };

        if self
            .collections
            .reactions
            .find_one_and_delete(key.clone())
            .await?
            .is_some()
        {
            debug!(%actor, kind = target.kind.as_str(), id = %target.id, "reaction removed");
            return Ok(ToggleOutcome::Removed);
        }

        match self
            .collections
            .reactions
            .insert_one(ReactionDoc::new(actor, target))
            .await
        {
            Ok(_) => {
                debug!(%actor, kind = target.kind.as_str(), id = %target.id, "reaction added");
                Ok(ToggleOutcome::Added)
            }
            // A concurrent twin won the insert; this call becomes the off half
            Err(e) if e.is_conflict() => {
                self.collections.reactions.find_one_and_delete(key).await?;
                Ok(ToggleOutcome::Removed)
            }
            Err(e) => Err(e),
        }
    }

    /// Flip the acting profile's follow edge on another profile.
    ///
    /// Following yourself is rejected.
    pub async fn toggle_follow(&self, actor: ObjectId, profile: ObjectId) -> Result<ToggleOutcome> {
        if actor == profile {
            return Err(EngineError::invalid("cannot follow your own profile"));
        }

        if !self.collections.profiles.exists(doc! { "_id": profile }).await? {
            return Err(EngineError::invalid(format!("profile {} does not exist", profile)));
        }

        let key = doc! { "profile": profile, "followed_by": actor };

        if self
            .collections
            .follows
            .find_one_and_delete(key.clone())
            .await?
            .is_some()
        {
            debug!(%actor, %profile, "follow removed");
            return Ok(ToggleOutcome::Removed);
        }

        match self
            .collections
            .follows
            .insert_one(FollowDoc::new(profile, actor))
            .await
        {
            Ok(_) => {
                debug!(%actor, %profile, "follow added");
                Ok(ToggleOutcome::Added)
            }
            Err(e) if e.is_conflict() => {
                self.collections.follows.find_one_and_delete(key).await?;
                Ok(ToggleOutcome::Removed)
            }
            Err(e) => Err(e),
        }
    }

    /// Flip the acting profile's save edge on a collection
    pub async fn toggle_save(&self, actor: ObjectId, collection: ObjectId) -> Result<ToggleOutcome> {
        if !self
            .collections
            .collections
            .exists(doc! { "_id": collection })
            .await?
        {
            return Err(EngineError::invalid(format!(
                "collection {} does not exist",
                collection
            )));
        }

        let key = doc! { "collection": collection, "saved_by": actor };

        if self
            .collections
            .saves
            .find_one_and_delete(key.clone())
            .await?
            .is_some()
        {
            debug!(%actor, %collection, "save removed");
            return Ok(ToggleOutcome::Removed);
        }

        match self
            .collections
            .saves
            .insert_one(SaveDoc::new(collection, actor))
            .await
        {
            Ok(_) => {
                debug!(%actor, %collection, "save added");
                Ok(ToggleOutcome::Added)
            }
            Err(e) if e.is_conflict() => {
                self.collections.saves.find_one_and_delete(key).await?;
                Ok(ToggleOutcome::Removed)
            }
            Err(e) => Err(e),
        }
    }

    /// Save a collection without toggling; saving twice is a no-op
    pub async fn save(&self, actor: ObjectId, collection: ObjectId) -> Result<()> {
        if !self
            .collections
            .collections
            .exists(doc! { "_id": collection })
            .await?
        {
            return Err(EngineError::invalid(format!(
                "collection {} does not exist",
                collection
            )));
        }

        match self
            .collections
            .saves
            .insert_one(SaveDoc::new(collection, actor))
            .await
        {
            Ok(_) => {
                debug!(%actor, %collection, "save added");
                Ok(())
            }
            Err(e) if e.is_conflict() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Drop a save edge; dropping an absent one is a no-op
    pub async fn unsave(&self, actor: ObjectId, collection: ObjectId) -> Result<()> {
        let removed = self
            .collections
            .saves
            .delete_one(doc! { "collection": collection, "saved_by": actor })
            .await?;
        if removed > 0 {
            debug!(%actor, %collection, "save removed");
        }
        Ok(())
    }

    /// Confirm the tagged target resolves to a stored document
    async fn resolve_target(&self, target: &TargetRef) -> Result<()> {
        let filter = doc! { "_id": target.id };
        let found = match target.kind {
            TargetKind::Web => self.collections.webs.exists(filter).await?,
            TargetKind::Asset => self.collections.assets.exists(filter).await?,
            TargetKind::Collection => self.collections.collections.exists(filter).await?,
            TargetKind::Comment => self.collections.comments.exists(filter).await?,
            TargetKind::Reply => self.collections.replies.exists(filter).await?,
        };

        if found {
            Ok(())
        } else {
            Err(EngineError::invalid(format!(
                "{} {} does not exist",
                target.kind.as_str(),
                target.id
            )))
        }
    }
}

/// Exact-key filter for a reaction edge, shared with the projection layer
pub fn reaction_key(actor: ObjectId, target: &TargetRef) -> Document {
    doc! {
        "target.kind": target.kind.as_str(),
        "target.id": target.id,
        "reacted_by": actor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(ToggleOutcome::Added.as_str(), "added");
        assert_eq!(ToggleOutcome::Removed.as_str(), "removed");
    }

    #[test]
    fn test_reaction_key_matches_unique_index_fields() {
        let actor = ObjectId::new();
        let target = TargetRef::web(ObjectId::new());
        let key = reaction_key(actor, &target);

        assert_eq!(
            key.keys().collect::<Vec<_>>(),
            vec!["target.kind", "target.id", "reacted_by"]
        );
        assert_eq!(key.get_str("target.kind").unwrap(), "web");
    }

    // Toggle parity under concurrency is exercised by the ignored
    // integration suite against a running MongoDB.
}
