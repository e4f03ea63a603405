//! MongoDB storage layer
//!
//! Typed collection wrapper plus the document schemas it manages.

pub mod mongo;
pub mod schemas;

pub use mongo::{touch_update, IntoIndexes, MongoClient, MongoCollection, Stamped, Timestamps};

use crate::types::Result;
use schemas::{
    AssetDoc, CollectionDoc, CommentDoc, EditorPrefsDoc, FollowDoc, ProfileDoc, ReactionDoc,
    ReplyDoc, SaveDoc, WebDoc, ASSET_COLLECTION, COLLECTION_COLLECTION, COMMENT_COLLECTION,
    EDITOR_PREFS_COLLECTION, FOLLOW_COLLECTION, PROFILE_COLLECTION, REACTION_COLLECTION,
    REPLY_COLLECTION, SAVE_COLLECTION, WEB_COLLECTION,
};

/// Every typed collection the engine works with, opened once at startup.
///
/// Opening applies each schema's indexes, including the unique edge indexes
/// the toggle engine depends on.
#[derive(Clone)]
pub struct Collections {
    pub profiles: MongoCollection<ProfileDoc>,
    pub webs: MongoCollection<WebDoc>,
    pub assets: MongoCollection<AssetDoc>,
    pub collections: MongoCollection<CollectionDoc>,
    pub comments: MongoCollection<CommentDoc>,
    pub replies: MongoCollection<ReplyDoc>,
    pub reactions: MongoCollection<ReactionDoc>,
    pub follows: MongoCollection<FollowDoc>,
    pub saves: MongoCollection<SaveDoc>,
    pub editor_prefs: MongoCollection<EditorPrefsDoc>,
}

impl Collections {
    /// Open every collection and apply indexes
    pub async fn open(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            profiles: client.collection(PROFILE_COLLECTION).await?,
            webs: client.collection(WEB_COLLECTION).await?,
            assets: client.collection(ASSET_COLLECTION).await?,
            collections: client.collection(COLLECTION_COLLECTION).await?,
            comments: client.collection(COMMENT_COLLECTION).await?,
            replies: client.collection(REPLY_COLLECTION).await?,
            reactions: client.collection(REACTION_COLLECTION).await?,
            follows: client.collection(FOLLOW_COLLECTION).await?,
            saves: client.collection(SAVE_COLLECTION).await?,
            editor_prefs: client.collection(EDITOR_PREFS_COLLECTION).await?,
        })
    }
}
