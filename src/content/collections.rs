//! Collection lifecycle operations
//!
//! Creation, renaming, publish toggling, the view counter, and set-semantics
//! membership. The per-owner name uniqueness lives in the index, so a clash
//! surfaces as `Conflict` straight from the write.

use bson::{doc, oid::ObjectId};
use tracing::debug;

use crate::db::schemas::CollectionDoc;
use crate::db::{touch_update, Collections};
use crate::types::{EngineError, Result};

/// Fields for a new collection
#[derive(Debug, Clone, Default)]
pub struct NewCollection {
    pub name: String,
    pub description: String,
    pub is_public: bool,
}

/// Collection lifecycle store
#[derive(Clone)]
pub struct CollectionStore {
    collections: Collections,
}

impl CollectionStore {
    pub fn new(collections: Collections) -> Self {
        Self { collections }
    }

    /// Create a collection; the name must be unused by this owner
    pub async fn create(&self, owner: ObjectId, new: NewCollection) -> Result<CollectionDoc> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(EngineError::invalid("name is required"));
        }

        let mut collection = CollectionDoc::new(owner, name.to_string(), new.description);
        collection.is_public = new.is_public;

        let id = self
            .collections
            .collections
            .insert_one(collection)
            .await
            .map_err(|e| name_clash(e, name))?;
        debug!(collection = %id, %owner, "created collection");

        self.collections
            .collections
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| EngineError::unavailable("stored collection vanished before readback"))
    }

    /// Rename a collection and replace its description
    pub async fn update(
        &self,
        owner: ObjectId,
        collection: ObjectId,
        name: &str,
        description: Option<String>,
    ) -> Result<CollectionDoc> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::invalid("name is required"));
        }

        let update = touch_update(doc! {
            "$set": { "name": name, "description": description.unwrap_or_default() }
        });

        self.collections
            .collections
            .find_one_and_update(doc! { "_id": collection, "owner": owner }, update)
            .await
            .map_err(|e| name_clash(e, name))?
            .ok_or_else(|| not_owned(collection, owner))
    }

    /// Flip a collection's publish status
    pub async fn toggle_publish(
        &self,
        owner: ObjectId,
        collection: ObjectId,
    ) -> Result<CollectionDoc> {
        let flip = vec![doc! {
            "$set": { "is_public": { "$not": "$is_public" }, "updated_at": "$$NOW" }
        }];

        self.collections
            .collections
            .find_one_and_update(doc! { "_id": collection, "owner": owner }, flip)
            .await?
            .ok_or_else(|| not_owned(collection, owner))
    }

    /// Bump the view counter; any viewer may do this
    pub async fn increment_views(&self, collection: ObjectId) -> Result<()> {
        let result = self
            .collections
            .collections
            .update_one(doc! { "_id": collection }, doc! { "$inc": { "views": 1 } })
            .await?;

        if result.matched_count == 0 {
            return Err(EngineError::not_found(format!("collection {}", collection)));
        }
        Ok(())
    }

    /// Add a web to the membership list. Adding a web already present is a
    /// quiet success; the web need not belong to the collection's owner.
    pub async fn add_web(
        &self,
        owner: ObjectId,
        collection: ObjectId,
        web: ObjectId,
    ) -> Result<CollectionDoc> {
        self.collections
            .collections
            .find_one_and_update(
                doc! { "_id": collection, "owner": owner },
                doc! { "$addToSet": { "webs": web } },
            )
            .await?
            .ok_or_else(|| not_owned(collection, owner))
    }

    /// Remove a web from the membership list; removing an absent web is a
    /// quiet success.
    pub async fn remove_web(
        &self,
        owner: ObjectId,
        collection: ObjectId,
        web: ObjectId,
    ) -> Result<CollectionDoc> {
        self.collections
            .collections
            .find_one_and_update(
                doc! { "_id": collection, "owner": owner },
                doc! { "$pull": { "webs": web } },
            )
            .await?
            .ok_or_else(|| not_owned(collection, owner))
    }
}

fn not_owned(collection: ObjectId, owner: ObjectId) -> EngineError {
    EngineError::not_found(format!("collection {} owned by {}", collection, owner))
}

fn name_clash(error: EngineError, name: &str) -> EngineError {
    if error.is_conflict() {
        EngineError::conflict(format!("a collection named '{}' already exists", name))
    } else {
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_clash_rewrites_conflict_only() {
        let conflict = name_clash(EngineError::conflict("E11000"), "snippets");
        assert!(matches!(conflict, EngineError::Conflict(msg) if msg.contains("snippets")));

        let other = name_clash(EngineError::unavailable("down"), "snippets");
        assert!(matches!(other, EngineError::Unavailable(_)));
    }
}
