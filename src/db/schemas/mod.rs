//! Database schemas for Weavery
//!
//! Defines MongoDB document structures for profiles, content kinds, and the
//! engagement edges between them.

mod asset;
mod collection;
mod comment;
mod editor;
mod follow;
mod profile;
mod reaction;
mod reply;
mod save;
mod web;

pub use asset::{AssetDoc, AssetKind, ASSET_COLLECTION};
pub use collection::{CollectionDoc, COLLECTION_COLLECTION};
pub use comment::{CommentDoc, COMMENT_COLLECTION};
pub use editor::{EditorPrefsDoc, EDITOR_PREFS_COLLECTION};
pub use follow::{FollowDoc, FOLLOW_COLLECTION};
pub use profile::{
    ProfileDoc, DEFAULT_AVATAR_PUBLIC_ID, DEFAULT_AVATAR_URL, DEFAULT_COVER_PUBLIC_ID,
    DEFAULT_COVER_URL, PROFILE_COLLECTION,
};
pub use reaction::{ReactionDoc, TargetKind, TargetRef, REACTION_COLLECTION};
pub use reply::{ReplyDoc, REPLY_COLLECTION};
pub use save::{SaveDoc, SAVE_COLLECTION};
pub use web::{WebDoc, WEB_COLLECTION};
