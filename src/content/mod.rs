//! Content lifecycle stores
//!
//! Create/update/toggle operations for every content kind. Ownership is
//! enforced inside the conditional write, never as a separate check, and
//! deletion always goes through the cascade coordinator.

pub mod assets;
pub mod collections;
pub mod comments;
pub mod editor;
pub mod profiles;
pub mod webs;

pub use assets::{AssetStore, NewAsset};
pub use collections::{CollectionStore, NewCollection};
pub use comments::CommentStore;
pub use editor::{EditorPrefsUpdate, EditorStore};
pub use profiles::{NewProfile, ProfileStore, ProfileUpdate};
pub use webs::{ForkOptions, NewWeb, WebStore, WebUpdate};
