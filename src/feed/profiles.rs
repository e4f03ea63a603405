//! Profile feeds
//!
//! Profile pages, follower/following lists, the recommendation feed, and
//! handle search. Every entry carries its own follower projection so lists
//! render without per-entry round trips.

use bson::{doc, oid::ObjectId, Document};
use tracing::debug;

use crate::config::EnginePolicy;
use crate::db::schemas::{FOLLOW_COLLECTION, PROFILE_COLLECTION, REACTION_COLLECTION, WEB_COLLECTION};
use crate::db::Collections;
use crate::feed::page::{paginate, Page, PageRequest};
use crate::feed::sort::{profile_search_sort_stage, recommended_sort_stage};
use crate::feed::view::{ProfileItem, ProfileView};
use crate::projection::{replace_with, text_score_stage, viewer_flag};
use crate::types::{EngineError, Result};

/// How many top webs the recommendation feed previews per profile
const RECOMMENDED_PREVIEW_WEBS: i64 = 2;

/// Profile feed composer
#[derive(Clone)]
pub struct ProfileFeed {
    collections: Collections,
    policy: EnginePolicy,
}

impl ProfileFeed {
    pub fn new(collections: Collections, policy: EnginePolicy) -> Self {
        Self { collections, policy }
    }

    /// Full profile page by handle.
    ///
    /// Showcase webs are restricted to public ones unless the viewer is the
    /// profile's owner.
    pub async fn profile_view(&self, username: &str, viewer: Option<ObjectId>) -> Result<ProfileView> {
        let profile = self
            .collections
            .profiles
            .find_one(doc! { "username": username })
            .await?
            .ok_or_else(|| EngineError::not_found(format!("profile '{}'", username)))?;

        let profile_id = profile
            ._id
            .ok_or_else(|| EngineError::unavailable("stored profile missing _id"))?;
        let is_owner = viewer == Some(profile_id);

        let mut showcase_pipeline = Vec::new();
        if !is_owner {
            showcase_pipeline.push(doc! { "$match": { "is_public": true } });
        }
        showcase_pipeline.extend([
            doc! {
                "$lookup": {
                    "from": REACTION_COLLECTION,
                    "let": { "target_id": "$_id" },
                    "pipeline": [
                        {
                            "$match": {
                                "$expr": {
                                    "$and": [
                                        { "$eq": ["$target.kind", "web"] },
                                        { "$eq": ["$target.id", "$$target_id"] },
                                    ]
                                }
                            }
                        }
                    ],
                    "as": "likes",
                }
            },
            doc! {
                "$addFields": {
                    "likes_count": { "$size": "$likes" },
                    "is_liked_by_me": viewer_flag(viewer, "$likes.reacted_by"),
                }
            },
            doc! {
                "$project": {
                    "title": 1,
                    "description": 1,
                    "image": 1,
                    "html": 1,
                    "css": 1,
                    "js": 1,
                    "views": 1,
                    "likes_count": 1,
                    "is_liked_by_me": 1,
                }
            },
        ]);

        let pipeline = vec![
            doc! { "$match": { "_id": profile_id } },
            doc! {
                "$lookup": {
                    "from": FOLLOW_COLLECTION,
                    "localField": "_id",
                    "foreignField": "profile",
                    "as": "followers",
                }
            },
            doc! {
                "$lookup": {
                    "from": FOLLOW_COLLECTION,
                    "localField": "_id",
                    "foreignField": "followed_by",
                    "as": "following",
                }
            },
            doc! {
                "$lookup": {
                    "from": WEB_COLLECTION,
                    "localField": "showcase",
                    "foreignField": "_id",
                    "as": "showcase",
                    "pipeline": showcase_pipeline,
                }
            },
            doc! {
                "$addFields": {
                    "followers_count": { "$size": "$followers" },
                    "following_count": { "$size": "$following" },
                    "is_followed_by_me": viewer_flag(viewer, "$followers.followed_by"),
                }
            },
            doc! {
                "$project": {
                    "password_hash": 0,
                    "followers": 0,
                    "following": 0,
                    "pinned": 0,
                }
            },
        ];

        let mut results = self.collections.profiles.aggregate(pipeline).await?;
        let found = results
            .pop()
            .ok_or_else(|| EngineError::not_found(format!("profile '{}'", username)))?;

        bson::from_document(found)
            .map_err(|e| EngineError::unavailable(format!("failed to decode profile: {}", e)))
    }

    /// Profiles following the given profile, newest follow first
    pub async fn followers(
        &self,
        profile: ObjectId,
        viewer: Option<ObjectId>,
        request: PageRequest,
    ) -> Result<Page<ProfileItem>> {
        let mut pipeline = vec![
            doc! { "$match": { "profile": profile } },
            doc! { "$sort": { "created_at": -1 } },
            doc! {
                "$lookup": {
                    "from": PROFILE_COLLECTION,
                    "localField": "followed_by",
                    "foreignField": "_id",
                    "as": "entry",
                    "pipeline": profile_entry_stages(viewer),
                }
            },
        ];
        pipeline.extend(replace_with("entry"));

        paginate(&self.collections.follows, pipeline, &request).await
    }

    /// Profiles the given profile follows, newest follow first
    pub async fn following(
        &self,
        profile: ObjectId,
        viewer: Option<ObjectId>,
        request: PageRequest,
    ) -> Result<Page<ProfileItem>> {
        let mut pipeline = vec![
            doc! { "$match": { "followed_by": profile } },
            doc! { "$sort": { "created_at": -1 } },
            doc! {
                "$lookup": {
                    "from": PROFILE_COLLECTION,
                    "localField": "profile",
                    "foreignField": "_id",
                    "as": "entry",
                    "pipeline": profile_entry_stages(viewer),
                }
            },
        ];
        pipeline.extend(replace_with("entry"));

        paginate(&self.collections.follows, pipeline, &request).await
    }

    /// Profiles worth following: never the viewer, never already followed,
    /// ranked by reach, audience, then output.
    ///
    /// The verified-only filter is a policy knob rather than a hardcoded
    /// predicate.
    pub async fn recommended(
        &self,
        viewer: ObjectId,
        request: PageRequest,
    ) -> Result<Page<ProfileItem>> {
        let follows = self
            .collections
            .follows
            .find_many(doc! { "followed_by": viewer })
            .await?;

        let mut excluded: Vec<ObjectId> = follows.iter().map(|f| f.profile).collect();
        excluded.push(viewer);
        debug!(%viewer, excluded = excluded.len(), "composing recommendations");

        let mut base = doc! { "_id": { "$nin": excluded } };
        if self.policy.recommend_verified_only {
            base.insert("is_verified", true);
        }

        let pipeline = vec![
            doc! { "$match": base },
            doc! {
                "$lookup": {
                    "from": FOLLOW_COLLECTION,
                    "localField": "_id",
                    "foreignField": "profile",
                    "as": "followers",
                }
            },
            doc! {
                "$lookup": {
                    "from": WEB_COLLECTION,
                    "localField": "_id",
                    "foreignField": "owner",
                    "as": "webs",
                    "pipeline": [
                        { "$match": { "is_public": true } },
                        { "$sort": { "views": -1 } },
                        { "$project": { "title": 1, "image": 1, "views": 1 } },
                    ],
                }
            },
            doc! {
                "$addFields": {
                    "followers_count": { "$size": "$followers" },
                    "webs_count": { "$size": "$webs" },
                    "total_web_views": { "$sum": "$webs.views" },
                    "showcase_webs": { "$slice": ["$webs", RECOMMENDED_PREVIEW_WEBS] },
                }
            },
            doc! {
                "$project": {
                    "username": 1,
                    "full_name": 1,
                    "avatar": 1,
                    "is_verified": 1,
                    "followers_count": 1,
                    "webs_count": 1,
                    "total_web_views": 1,
                    "showcase_webs": 1,
                }
            },
            recommended_sort_stage(),
        ];

        paginate(&self.collections.profiles, pipeline, &request).await
    }

    /// Full-text search over handles and display names
    pub async fn search(
        &self,
        query: &str,
        viewer: Option<ObjectId>,
        request: PageRequest,
    ) -> Result<Page<ProfileItem>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(EngineError::invalid("search query is required"));
        }

        let mut pipeline = vec![doc! { "$match": { "$text": { "$search": trimmed } } }];
        pipeline.extend(profile_entry_stages(viewer));
        pipeline.push(text_score_stage());
        pipeline.push(profile_search_sort_stage());

        paginate(&self.collections.profiles, pipeline, &request).await
    }
}

/// Per-entry projection for profile lists: follower and web counts, the
/// viewer's follow flag, identity fields only.
fn profile_entry_stages(viewer: Option<ObjectId>) -> Vec<Document> {
    vec![
        doc! {
            "$lookup": {
                "from": FOLLOW_COLLECTION,
                "localField": "_id",
                "foreignField": "profile",
                "as": "followers",
            }
        },
        doc! {
            "$lookup": {
                "from": WEB_COLLECTION,
                "localField": "_id",
                "foreignField": "owner",
                "as": "webs",
            }
        },
        doc! {
            "$addFields": {
                "followers_count": { "$size": "$followers" },
                "webs_count": { "$size": "$webs" },
                "is_followed_by_me": viewer_flag(viewer, "$followers.followed_by"),
            }
        },
        doc! {
            "$project": {
                "_id": 1,
                "username": 1,
                "full_name": 1,
                "avatar": 1,
                "followers_count": 1,
                "webs_count": 1,
                "is_followed_by_me": 1,
                "created_at": 1,
            }
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::Bson;

    #[test]
    fn test_entry_projection_keeps_identity_fields_only() {
        let stages = profile_entry_stages(None);
        let projection = stages
            .last()
            .unwrap()
            .get_document("$project")
            .unwrap();
        assert!(projection.contains_key("username"));
        assert!(!projection.contains_key("email"));
        assert!(!projection.contains_key("password_hash"));
    }

    #[test]
    fn test_anonymous_entry_flag_is_literal() {
        let stages = profile_entry_stages(None);
        let fields = stages[2].get_document("$addFields").unwrap();
        assert_eq!(fields.get_bool("is_followed_by_me").unwrap(), false);
    }

    #[test]
    fn test_recommended_preview_is_sliced() {
        let slice = doc! { "$slice": ["$webs", RECOMMENDED_PREVIEW_WEBS] };
        assert_eq!(
            slice.get_array("$slice").unwrap()[1],
            Bson::Int64(RECOMMENDED_PREVIEW_WEBS)
        );
    }
}
