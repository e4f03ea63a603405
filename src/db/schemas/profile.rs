//! Profile document schema
//!
//! Stores maker identity, credentials, and the pinned/showcase web lists.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Stamped, Timestamps};

/// Collection name for profiles
pub const PROFILE_COLLECTION: &str = "users";

/// Fallback avatar served until the maker uploads their own
pub const DEFAULT_AVATAR_URL: &str =
    "https://res.cloudinary.com/dvrpvl53d/image/upload/v1705401447/vbhdn2mo3facgwbanema.jpg";
pub const DEFAULT_AVATAR_PUBLIC_ID: &str = "vbhdn2mo3facgwbanema";

/// Fallback cover image
pub const DEFAULT_COVER_URL: &str =
    "https://res.cloudinary.com/dvrpvl53d/image/upload/v1705401598/l1bthaxmnngyxabxmhwi.jpg";
pub const DEFAULT_COVER_PUBLIC_ID: &str = "l1bthaxmnngyxabxmhwi";

/// Profile document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProfileDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Lifecycle timestamps (created_at, updated_at)
    #[serde(flatten, default)]
    pub timestamps: Timestamps,

    /// Unique lowercase handle
    pub username: String,

    /// Unique contact address
    pub email: String,

    /// Display name
    pub full_name: String,

    /// Argon2 password hash
    pub password_hash: String,

    /// Avatar image URL and its media-store handle
    #[serde(default = "default_avatar_url")]
    pub avatar: String,

    #[serde(default = "default_avatar_public_id")]
    pub avatar_public_id: String,

    /// Cover image URL and its media-store handle
    #[serde(default = "default_cover_url")]
    pub cover_image: String,

    #[serde(default = "default_cover_public_id")]
    pub cover_image_public_id: String,

    /// Webs the maker pinned to their profile, newest first
    #[serde(default)]
    pub pinned: Vec<ObjectId>,

    /// Webs the maker chose to showcase, in display order
    #[serde(default)]
    pub showcase: Vec<ObjectId>,

    /// Whether the contact address has been confirmed
    #[serde(default)]
    pub is_verified: bool,

    /// Free-form self description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    /// Up to three external links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link1: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub link2: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub link3: Option<String>,
}

fn default_avatar_url() -> String {
    DEFAULT_AVATAR_URL.to_string()
}

fn default_avatar_public_id() -> String {
    DEFAULT_AVATAR_PUBLIC_ID.to_string()
}

fn default_cover_url() -> String {
    DEFAULT_COVER_URL.to_string()
}

fn default_cover_public_id() -> String {
    DEFAULT_COVER_PUBLIC_ID.to_string()
}

impl ProfileDoc {
    /// Create a new profile document with default imagery
    pub fn new(username: String, email: String, full_name: String, password_hash: String) -> Self {
        Self {
            _id: None,
            timestamps: Timestamps::default(),
            username,
            email,
            full_name,
            password_hash,
            avatar: default_avatar_url(),
            avatar_public_id: default_avatar_public_id(),
            cover_image: default_cover_url(),
            cover_image_public_id: default_cover_public_id(),
            pinned: Vec::new(),
            showcase: Vec::new(),
            is_verified: false,
            bio: None,
            link1: None,
            link2: None,
            link3: None,
        }
    }
}

impl IntoIndexes for ProfileDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique handle
            (
                doc! { "username": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("username_unique".to_string())
                        .build(),
                ),
            ),
            // Unique contact address
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            // Text search over handle and display name, handle weighted higher
            (
                doc! { "username": "text", "full_name": "text" },
                Some(
                    IndexOptions::builder()
                        .weights(doc! { "username": 3, "full_name": 1 })
                        .name("profile_text".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl Stamped for ProfileDoc {
    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}
