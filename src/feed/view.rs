//! Typed feed items
//!
//! These decode the documents the aggregation pipelines emit. Fields that
//! only some feeds attach (owner join, viewer flags, score fields) are
//! optional with serde defaults so one type covers every feed of its kind.

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::db::mongo::Timestamps;
use crate::db::schemas::AssetKind;

/// Nested owner projection attached to content items.
///
/// One level deep: identity fields always, follower projections only on
/// single-item reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerView {
    pub _id: ObjectId,
    pub username: String,
    pub full_name: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_followed_by_me: Option<bool>,
}

/// A web as feeds return it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebItem {
    pub _id: ObjectId,
    #[serde(flatten, default)]
    pub timestamps: Timestamps,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub css: String,
    #[serde(default)]
    pub js: String,
    pub image: String,
    #[serde(default)]
    pub image_public_id: String,
    #[serde(default)]
    pub css_links: Vec<String>,
    #[serde(default)]
    pub js_links: Vec<String>,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forked_from: Option<ObjectId>,

    /// Joined owner, absent on owner-scoped feeds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerView>,

    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub comments_count: i64,
    #[serde(default)]
    pub is_liked_by_me: bool,

    /// Present on the trending feed only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impression_score: Option<i64>,

    /// Present on search feeds only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_score: Option<f64>,
}

/// Slim web used inside collection and recommendation previews
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebPreview {
    pub _id: ObjectId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub views: i64,
}

/// A collection as list feeds return it, with a member-web preview strip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionItem {
    pub _id: ObjectId,
    #[serde(flatten, default)]
    pub timestamps: Timestamps,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub is_public: bool,

    /// First few member webs, most viewed first
    #[serde(default)]
    pub webs: Vec<WebPreview>,
    #[serde(default)]
    pub webs_count: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerView>,

    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub saves_count: i64,
    #[serde(default)]
    pub is_liked_by_me: bool,
    #[serde(default)]
    pub is_saved_by_me: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_score: Option<f64>,
}

/// A single collection read, carrying the raw membership list for paging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionView {
    pub _id: ObjectId,
    #[serde(flatten, default)]
    pub timestamps: Timestamps,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub webs: Vec<ObjectId>,
    #[serde(default)]
    pub webs_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerView>,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub saves_count: i64,
    #[serde(default)]
    pub is_liked_by_me: bool,
    #[serde(default)]
    pub is_saved_by_me: bool,
}

/// A profile as follower/following/recommendation/search feeds return it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileItem {
    pub _id: ObjectId,
    pub username: String,
    pub full_name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub webs_count: i64,
    #[serde(default)]
    pub is_followed_by_me: bool,

    /// Recommendation feed extras
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_web_views: Option<i64>,
    #[serde(default)]
    pub showcase_webs: Vec<WebPreview>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_score: Option<f64>,
}

/// A showcase web on a profile page, payload included for live previews
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowcaseWeb {
    pub _id: ObjectId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub css: String,
    #[serde(default)]
    pub js: String,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub is_liked_by_me: bool,
}

/// A full profile page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileView {
    pub _id: ObjectId,
    #[serde(flatten, default)]
    pub timestamps: Timestamps,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link3: Option<String>,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub following_count: i64,
    #[serde(default)]
    pub is_followed_by_me: bool,
    #[serde(default)]
    pub showcase: Vec<ShowcaseWeb>,
}

/// An asset as listings return it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetItem {
    pub _id: ObjectId,
    #[serde(flatten, default)]
    pub timestamps: Timestamps,
    pub title: String,
    #[serde(default)]
    pub asset_type: AssetKind,
    pub url: String,
    #[serde(default)]
    pub public_id: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub is_liked_by_me: bool,
}

/// A comment in a web's thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentItem {
    pub _id: ObjectId,
    #[serde(flatten, default)]
    pub timestamps: Timestamps,
    pub text: String,
    pub web: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerView>,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub replies_count: i64,
    #[serde(default)]
    pub is_liked_by_me: bool,
}

/// A reply in a comment's thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyItem {
    pub _id: ObjectId,
    #[serde(flatten, default)]
    pub timestamps: Timestamps,
    pub text: String,
    pub comment: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerView>,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub is_liked_by_me: bool,
}

/// A comment with its reply thread, for the single-comment read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: CommentItem,
    #[serde(default)]
    pub replies: Vec<ReplyItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_web_item_decodes_pipeline_output() {
        let raw = doc! {
            "_id": ObjectId::new(),
            "title": "orbit",
            "image": "https://img.example/orbit.png",
            "views": 7i64,
            "is_public": true,
            "likes_count": 2i64,
            "comments_count": 0i64,
            "is_liked_by_me": false,
            "owner": {
                "_id": ObjectId::new(),
                "username": "mira",
                "full_name": "Mira L",
                "avatar": "https://img.example/a.png",
            },
        };

        let item: WebItem = bson::from_document(raw).unwrap();
        assert_eq!(item.likes_count, 2);
        assert!(item.owner.is_some());
        assert!(item.text_score.is_none());
    }

    #[test]
    fn test_profile_item_tolerates_missing_extras() {
        let raw = doc! {
            "_id": ObjectId::new(),
            "username": "juno",
            "full_name": "Juno K",
            "followers_count": 4i64,
            "webs_count": 9i64,
            "is_followed_by_me": true,
        };

        let item: ProfileItem = bson::from_document(raw).unwrap();
        assert!(item.total_web_views.is_none());
        assert!(item.showcase_webs.is_empty());
    }

    #[test]
    fn test_counts_default_to_zero() {
        let raw = doc! {
            "_id": ObjectId::new(),
            "text": "nice gradient",
            "web": ObjectId::new(),
        };

        let item: CommentItem = bson::from_document(raw).unwrap();
        assert_eq!(item.likes_count, 0);
        assert_eq!(item.replies_count, 0);
        assert!(!item.is_liked_by_me);
    }

    #[test]
    fn test_feed_only_fields_stay_off_the_wire() {
        let raw = doc! {
            "_id": ObjectId::new(),
            "title": "orbit",
            "image": "https://img.example/orbit.png",
            "views": 7i64,
            "is_public": true,
            "likes_count": 2i64,
        };

        let item: WebItem = bson::from_document(raw).unwrap();
        let json = serde_json::to_value(&item).unwrap();

        // Absent optionals are omitted, not serialized as null
        assert!(json.get("impression_score").is_none());
        assert!(json.get("text_score").is_none());
        assert!(json.get("owner").is_none());
        assert!(json.get("forked_from").is_none());
        assert_eq!(json["likes_count"], 2);
    }
}
