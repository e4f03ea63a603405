//! Referential cleanup
//!
//! Deleting content tears down everything that points at it before the
//! document itself goes: dependents first, the referenced item last, each
//! step an idempotent bulk write. A teardown interrupted partway resumes by
//! re-issuing the same call, and feeds tolerate the half-finished state
//! because edge-rooted pipelines drop dangling rows.

use std::sync::Arc;

use bson::{doc, oid::ObjectId, Document};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::db::mongo::{IntoIndexes, MongoCollection, Stamped};
use crate::db::schemas::{
    TargetKind, WebDoc, ASSET_COLLECTION, COLLECTION_COLLECTION, COMMENT_COLLECTION,
    DEFAULT_AVATAR_PUBLIC_ID, DEFAULT_COVER_PUBLIC_ID, PROFILE_COLLECTION, REPLY_COLLECTION,
    WEB_COLLECTION,
};
use crate::db::Collections;
use crate::services::MediaStore;
use crate::types::{EngineError, Result};

/// Coordinates multi-collection teardown for every content kind
#[derive(Clone)]
pub struct CascadeCoordinator {
    collections: Collections,
    media: Arc<dyn MediaStore>,
}

impl CascadeCoordinator {
    pub fn new(collections: Collections, media: Arc<dyn MediaStore>) -> Self {
        Self { collections, media }
    }

    /// Delete a web you own, its comment tree, every reaction in that tree,
    /// and every pinned/showcase/membership reference to it
    pub async fn delete_web(&self, owner: ObjectId, web: ObjectId) -> Result<()> {
        let found = self
            .collections
            .webs
            .find_one(doc! { "_id": web, "owner": owner })
            .await?
            .ok_or_else(|| EngineError::not_found(format!("web {} owned by {}", web, owner)))?;

        self.teardown_web_dependents(&[web]).await?;

        let removed = self.collections.webs.delete_one(doc! { "_id": web }).await?;
        info!(%web, %owner, removed, "deleted web");

        self.discard_web_media(&[found]).await;
        Ok(())
    }

    /// Delete a comment you own, its replies, and the reactions on both
    pub async fn delete_comment(&self, owner: ObjectId, comment: ObjectId) -> Result<()> {
        if self
            .collections
            .comments
            .find_one(doc! { "_id": comment, "owner": owner })
            .await?
            .is_none()
        {
            return Err(EngineError::not_found(format!(
                "comment {} owned by {}",
                comment, owner
            )));
        }

        self.teardown_comment_dependents(&[comment]).await?;

        let removed = self
            .collections
            .comments
            .delete_one(doc! { "_id": comment })
            .await?;
        info!(%comment, %owner, removed, "deleted comment");
        Ok(())
    }

    /// Delete a reply you own and its reactions
    pub async fn delete_reply(&self, owner: ObjectId, reply: ObjectId) -> Result<()> {
        if self
            .collections
            .replies
            .find_one(doc! { "_id": reply, "owner": owner })
            .await?
            .is_none()
        {
            return Err(EngineError::not_found(format!(
                "reply {} owned by {}",
                reply, owner
            )));
        }

        self.delete_reactions_on(TargetKind::Reply, &[reply]).await?;

        let removed = self
            .collections
            .replies
            .delete_one(doc! { "_id": reply })
            .await?;
        info!(%reply, %owner, removed, "deleted reply");
        Ok(())
    }

    /// Delete a collection you own, its reactions, and every save of it.
    /// Member webs are untouched; they belong to their own owners.
    pub async fn delete_collection(&self, owner: ObjectId, collection: ObjectId) -> Result<()> {
        if self
            .collections
            .collections
            .find_one(doc! { "_id": collection, "owner": owner })
            .await?
            .is_none()
        {
            return Err(EngineError::not_found(format!(
                "collection {} owned by {}",
                collection, owner
            )));
        }

        self.teardown_collection_dependents(&[collection]).await?;

        let removed = self
            .collections
            .collections
            .delete_one(doc! { "_id": collection })
            .await?;
        info!(%collection, %owner, removed, "deleted collection");
        Ok(())
    }

    /// Delete an asset you own, its reactions, and its stored object
    pub async fn delete_asset(&self, owner: ObjectId, asset: ObjectId) -> Result<()> {
        let found = self
            .collections
            .assets
            .find_one(doc! { "_id": asset, "owner": owner })
            .await?
            .ok_or_else(|| {
                EngineError::not_found(format!("asset {} owned by {}", asset, owner))
            })?;

        self.delete_reactions_on(TargetKind::Asset, &[asset]).await?;

        let removed = self
            .collections
            .assets
            .delete_one(doc! { "_id": asset })
            .await?;
        info!(%asset, %owner, removed, "deleted asset");

        self.discard_media(&found.public_id).await;
        Ok(())
    }

    /// Delete a profile and everything it ever produced: preferences, owned
    /// content with each content kind's own cascade, authored engagement
    /// edges, follow edges on either side, then the profile document itself
    pub async fn delete_profile(&self, owner: ObjectId) -> Result<()> {
        let profile = self
            .collections
            .profiles
            .find_one(doc! { "_id": owner })
            .await?
            .ok_or_else(|| EngineError::not_found(format!("profile {}", owner)))?;

        let prefs = self
            .collections
            .editor_prefs
            .delete_many(doc! { "owner": owner })
            .await?;

        let webs = self.collections.webs.find_many(doc! { "owner": owner }).await?;
        let web_ids: Vec<ObjectId> = webs.iter().filter_map(|w| w._id).collect();
        self.teardown_web_dependents(&web_ids).await?;
        let removed_webs = self
            .collections
            .webs
            .delete_many(doc! { "owner": owner })
            .await?;

        let owned_collections = self
            .collections
            .collections
            .find_many(doc! { "owner": owner })
            .await?;
        let collection_ids: Vec<ObjectId> =
            owned_collections.iter().filter_map(|c| c._id).collect();
        self.teardown_collection_dependents(&collection_ids).await?;
        let removed_collections = self
            .collections
            .collections
            .delete_many(doc! { "owner": owner })
            .await?;

        let assets = self
            .collections
            .assets
            .find_many(doc! { "owner": owner })
            .await?;
        let asset_ids: Vec<ObjectId> = assets.iter().filter_map(|a| a._id).collect();
        self.delete_reactions_on(TargetKind::Asset, &asset_ids).await?;
        let removed_assets = self
            .collections
            .assets
            .delete_many(doc! { "owner": owner })
            .await?;

        // Comments and replies left on other people's content die with the
        // author too.
        let comments = self
            .collections
            .comments
            .find_many(doc! { "owner": owner })
            .await?;
        let comment_ids: Vec<ObjectId> = comments.iter().filter_map(|c| c._id).collect();
        self.teardown_comment_dependents(&comment_ids).await?;
        let removed_comments = self
            .collections
            .comments
            .delete_many(doc! { "owner": owner })
            .await?;

        let replies = self
            .collections
            .replies
            .find_many(doc! { "owner": owner })
            .await?;
        let reply_ids: Vec<ObjectId> = replies.iter().filter_map(|r| r._id).collect();
        self.delete_reactions_on(TargetKind::Reply, &reply_ids).await?;
        let removed_replies = self
            .collections
            .replies
            .delete_many(doc! { "owner": owner })
            .await?;

        let removed_reactions = self
            .collections
            .reactions
            .delete_many(doc! { "reacted_by": owner })
            .await?;
        let removed_saves = self
            .collections
            .saves
            .delete_many(doc! { "saved_by": owner })
            .await?;
        let removed_follows = self
            .collections
            .follows
            .delete_many(doc! { "$or": [ { "profile": owner }, { "followed_by": owner } ] })
            .await?;

        let removed = self
            .collections
            .profiles
            .delete_one(doc! { "_id": owner })
            .await?;
        info!(
            profile = %owner,
            prefs,
            webs = removed_webs,
            collections = removed_collections,
            assets = removed_assets,
            comments = removed_comments,
            replies = removed_replies,
            reactions = removed_reactions,
            saves = removed_saves,
            follows = removed_follows,
            removed,
            "deleted profile"
        );

        self.discard_web_media(&webs).await;
        for asset in &assets {
            self.discard_media(&asset.public_id).await;
        }
        if profile.avatar_public_id != DEFAULT_AVATAR_PUBLIC_ID {
            self.discard_media(&profile.avatar_public_id).await;
        }
        if profile.cover_image_public_id != DEFAULT_COVER_PUBLIC_ID {
            self.discard_media(&profile.cover_image_public_id).await;
        }

        Ok(())
    }

    /// Remove engagement edges whose endpoint no longer resolves.
    ///
    /// Interrupted teardowns leave these behind; feeds already ignore them,
    /// so the sweep only reclaims storage. Returns the number removed.
    pub async fn sweep_orphans(&self) -> Result<u64> {
        let mut removed = 0_u64;

        let targets = [
            (TargetKind::Web, WEB_COLLECTION),
            (TargetKind::Asset, ASSET_COLLECTION),
            (TargetKind::Collection, COLLECTION_COLLECTION),
            (TargetKind::Comment, COMMENT_COLLECTION),
            (TargetKind::Reply, REPLY_COLLECTION),
        ];
        for (kind, from) in targets {
            let mut pipeline = vec![doc! { "$match": { "target.kind": kind.as_str() } }];
            pipeline.extend(dangling_stages(from, "target.id"));
            let dropped = drop_dangling(&self.collections.reactions, pipeline).await?;
            debug!(kind = kind.as_str(), dropped, "swept reactions on vanished targets");
            removed += dropped;
        }
        removed += drop_dangling(
            &self.collections.reactions,
            dangling_stages(PROFILE_COLLECTION, "reacted_by"),
        )
        .await?;

        removed += drop_dangling(
            &self.collections.follows,
            dangling_stages(PROFILE_COLLECTION, "profile"),
        )
        .await?;
        removed += drop_dangling(
            &self.collections.follows,
            dangling_stages(PROFILE_COLLECTION, "followed_by"),
        )
        .await?;

        removed += drop_dangling(
            &self.collections.saves,
            dangling_stages(COLLECTION_COLLECTION, "collection"),
        )
        .await?;
        removed += drop_dangling(
            &self.collections.saves,
            dangling_stages(PROFILE_COLLECTION, "saved_by"),
        )
        .await?;

        info!(removed, "orphan sweep finished");
        Ok(removed)
    }

    async fn teardown_web_dependents(&self, webs: &[ObjectId]) -> Result<()> {
        if webs.is_empty() {
            return Ok(());
        }

        let comments = self
            .collections
            .comments
            .find_many(doc! { "web": { "$in": webs } })
            .await?;
        let comment_ids: Vec<ObjectId> = comments.iter().filter_map(|c| c._id).collect();
        self.teardown_comment_dependents(&comment_ids).await?;
        let removed_comments = self
            .collections
            .comments
            .delete_many(doc! { "web": { "$in": webs } })
            .await?;

        let removed_reactions = self.delete_reactions_on(TargetKind::Web, webs).await?;

        let unpinned = self
            .collections
            .profiles
            .update_many(
                doc! { "$or": [
                    { "pinned": { "$in": webs } },
                    { "showcase": { "$in": webs } },
                ] },
                doc! { "$pull": {
                    "pinned": { "$in": webs },
                    "showcase": { "$in": webs },
                } },
            )
            .await?;
        let unlisted = self
            .collections
            .collections
            .update_many(
                doc! { "webs": { "$in": webs } },
                doc! { "$pull": { "webs": { "$in": webs } } },
            )
            .await?;

        info!(
            webs = webs.len(),
            comments = removed_comments,
            reactions = removed_reactions,
            profiles_touched = unpinned.modified_count,
            collections_touched = unlisted.modified_count,
            "tore down web dependents"
        );
        Ok(())
    }

    async fn teardown_comment_dependents(&self, comments: &[ObjectId]) -> Result<()> {
        if comments.is_empty() {
            return Ok(());
        }

        let replies = self
            .collections
            .replies
            .find_many(doc! { "comment": { "$in": comments } })
            .await?;
        let reply_ids: Vec<ObjectId> = replies.iter().filter_map(|r| r._id).collect();
        self.delete_reactions_on(TargetKind::Reply, &reply_ids).await?;
        let removed_replies = self
            .collections
            .replies
            .delete_many(doc! { "comment": { "$in": comments } })
            .await?;
        self.delete_reactions_on(TargetKind::Comment, comments).await?;

        debug!(
            comments = comments.len(),
            replies = removed_replies,
            "tore down comment dependents"
        );
        Ok(())
    }

    async fn teardown_collection_dependents(&self, collections: &[ObjectId]) -> Result<()> {
        if collections.is_empty() {
            return Ok(());
        }

        self.delete_reactions_on(TargetKind::Collection, collections)
            .await?;
        let removed_saves = self
            .collections
            .saves
            .delete_many(doc! { "collection": { "$in": collections } })
            .await?;

        debug!(
            collections = collections.len(),
            saves = removed_saves,
            "tore down collection dependents"
        );
        Ok(())
    }

    async fn delete_reactions_on(&self, kind: TargetKind, targets: &[ObjectId]) -> Result<u64> {
        if targets.is_empty() {
            return Ok(0);
        }
        self.collections
            .reactions
            .delete_many(doc! {
                "target.kind": kind.as_str(),
                "target.id": { "$in": targets },
            })
            .await
    }

    async fn discard_media(&self, handle: &str) {
        if handle.is_empty() {
            return;
        }
        if let Err(error) = self.media.delete(handle).await {
            warn!(handle, %error, "failed to discard stored object");
        }
    }

    /// Previews can be shared across forks; the object survives while any
    /// remaining web still points at it.
    async fn discard_web_media(&self, webs: &[WebDoc]) {
        let mut handles: Vec<&str> = webs
            .iter()
            .map(|w| w.image_public_id.as_str())
            .filter(|h| !h.is_empty())
            .collect();
        handles.sort_unstable();
        handles.dedup();

        for handle in handles {
            match self
                .collections
                .webs
                .count(doc! { "image_public_id": handle })
                .await
            {
                Ok(0) => self.discard_media(handle).await,
                Ok(_) => {}
                Err(error) => warn!(handle, %error, "could not check preview references"),
            }
        }
    }
}

/// Lookup-and-keep-misses stages: rows whose `local_field` no longer
/// resolves in `from`
fn dangling_stages(from: &str, local_field: &str) -> Vec<Document> {
    vec![
        doc! { "$lookup": {
            "from": from,
            "localField": local_field,
            "foreignField": "_id",
            "as": "resolved",
        } },
        doc! { "$match": { "resolved": { "$size": 0 } } },
    ]
}

async fn drop_dangling<T>(
    collection: &MongoCollection<T>,
    mut pipeline: Vec<Document>,
) -> Result<u64>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + Stamped,
{
    pipeline.push(doc! { "$project": { "_id": 1 } });

    let rows = collection.aggregate(pipeline).await?;
    let ids: Vec<ObjectId> = rows
        .iter()
        .filter_map(|row| row.get_object_id("_id").ok())
        .collect();
    if ids.is_empty() {
        return Ok(0);
    }

    collection.delete_many(doc! { "_id": { "$in": ids } }).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dangling_stages_shape() {
        let stages = dangling_stages(WEB_COLLECTION, "target.id");
        assert_eq!(stages.len(), 2);

        let lookup = stages[0].get_document("$lookup").unwrap();
        assert_eq!(lookup.get_str("from").unwrap(), WEB_COLLECTION);
        assert_eq!(lookup.get_str("localField").unwrap(), "target.id");
        assert_eq!(lookup.get_str("foreignField").unwrap(), "_id");

        let keep = stages[1].get_document("$match").unwrap();
        let size = keep.get_document("resolved").unwrap();
        assert_eq!(size.get_i32("$size").unwrap(), 0);
    }

    // Cascade completeness is exercised by the ignored integration suite
    // against a running MongoDB.
}
