//! Engine composition
//!
//! Wires the stores, feeds, toggle engine, and cascade coordinator over one
//! set of collection handles, and carries the operation timeout every
//! long-running entry point runs under.

use std::future::Future;
use std::sync::Arc;

use bson::oid::ObjectId;
use tracing::info;

use crate::cascade::CascadeCoordinator;
use crate::config::EnginePolicy;
use crate::content::{
    AssetStore, CollectionStore, CommentStore, EditorStore, ProfileStore, WebStore,
};
use crate::db::Collections;
use crate::engagement::ToggleEngine;
use crate::feed::{CollectionFeed, CommentFeed, ProfileFeed, WebFeed};
use crate::services::{Mailer, MediaStore};
use crate::types::{EngineError, Result};

/// Read-side composers, one per content kind
pub struct Feeds {
    pub webs: WebFeed,
    pub collections: CollectionFeed,
    pub profiles: ProfileFeed,
    pub comments: CommentFeed,
}

/// The assembled engagement engine
pub struct Engine {
    policy: EnginePolicy,
    pub db: Collections,
    pub toggles: ToggleEngine,
    pub webs: WebStore,
    pub collections: CollectionStore,
    pub comments: CommentStore,
    pub assets: AssetStore,
    pub profiles: ProfileStore,
    pub editor: EditorStore,
    pub feeds: Feeds,
    pub cascade: CascadeCoordinator,
}

impl Engine {
    pub fn new(
        db: Collections,
        media: Arc<dyn MediaStore>,
        mailer: Arc<dyn Mailer>,
        policy: EnginePolicy,
    ) -> Self {
        let feeds = Feeds {
            webs: WebFeed::new(db.clone()),
            collections: CollectionFeed::new(db.clone()),
            profiles: ProfileFeed::new(db.clone(), policy.clone()),
            comments: CommentFeed::new(db.clone()),
        };

        Self {
            toggles: ToggleEngine::new(db.clone()),
            webs: WebStore::new(db.clone(), Arc::clone(&media)),
            collections: CollectionStore::new(db.clone()),
            comments: CommentStore::new(db.clone()),
            assets: AssetStore::new(db.clone()),
            profiles: ProfileStore::new(db.clone(), Arc::clone(&media), mailer),
            editor: EditorStore::new(db.clone()),
            cascade: CascadeCoordinator::new(db.clone(), media),
            feeds,
            policy,
            db,
        }
    }

    /// Run an engine future under the configured operation timeout
    pub async fn run<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.policy.op_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::unavailable(format!(
                "operation did not finish within {}ms",
                self.policy.op_timeout.as_millis()
            ))),
        }
    }

    /// Verify the password, then cascade the whole account away
    pub async fn delete_account(&self, owner: ObjectId, password: &str) -> Result<()> {
        self.profiles.verify_credentials(owner, password).await?;
        self.run(self.cascade.delete_profile(owner)).await?;
        info!(profile = %owner, "account deleted");
        Ok(())
    }

    /// Delete a web you own, under the operation timeout
    pub async fn delete_web(&self, owner: ObjectId, web: ObjectId) -> Result<()> {
        self.run(self.cascade.delete_web(owner, web)).await
    }

    /// Delete a comment you own, under the operation timeout
    pub async fn delete_comment(&self, owner: ObjectId, comment: ObjectId) -> Result<()> {
        self.run(self.cascade.delete_comment(owner, comment)).await
    }

    /// Delete a reply you own, under the operation timeout
    pub async fn delete_reply(&self, owner: ObjectId, reply: ObjectId) -> Result<()> {
        self.run(self.cascade.delete_reply(owner, reply)).await
    }

    /// Delete a collection you own, under the operation timeout
    pub async fn delete_collection(&self, owner: ObjectId, collection: ObjectId) -> Result<()> {
        self.run(self.cascade.delete_collection(owner, collection))
            .await
    }

    /// Delete an asset you own, under the operation timeout
    pub async fn delete_asset(&self, owner: ObjectId, asset: ObjectId) -> Result<()> {
        self.run(self.cascade.delete_asset(owner, asset)).await
    }

    /// Sweep edges whose endpoints no longer resolve
    pub async fn sweep_orphans(&self) -> Result<u64> {
        self.run(self.cascade.sweep_orphans()).await
    }

    pub fn policy(&self) -> &EnginePolicy {
        &self.policy
    }
}
