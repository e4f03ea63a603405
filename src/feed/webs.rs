//! Web feeds
//!
//! Every feed is one aggregation: filter, joined projections, sort, facet
//! pagination. Cross-owner feeds carry an `is_public` predicate in the base
//! match; owner-scoped feeds skip it.

use bson::{doc, oid::ObjectId, Document};

use crate::db::schemas::{TargetKind, WEB_COLLECTION};
use crate::db::Collections;
use crate::feed::page::{paginate, Page, PageRequest};
use crate::feed::sort::{
    search_sort_stage, trending_sort_stage, SortKey, SortSpec, WEB_SORT_KEYS,
};
use crate::feed::view::WebItem;
use crate::projection::{
    comment_count_stages, impression_stage, like_stages, owner_identity_lookup,
    owner_profile_lookup, owner_unwrap, replace_with, strip_arrays, text_score_stage,
};
use crate::types::{EngineError, Result};

/// Which slice of a profile's webs a by-owner listing selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebScope {
    Public,
    Private,
    Forked,
}

impl WebScope {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "public" => Ok(WebScope::Public),
            "private" => Ok(WebScope::Private),
            "forked" => Ok(WebScope::Forked),
            other => Err(EngineError::invalid(format!("invalid web scope '{}'", other))),
        }
    }
}

/// Web feed composer
#[derive(Clone)]
pub struct WebFeed {
    collections: Collections,
}

impl WebFeed {
    pub fn new(collections: Collections) -> Self {
        Self { collections }
    }

    /// Single web with full owner projection.
    ///
    /// By-id reads are link-addressable and skip the visibility predicate.
    pub async fn by_id(&self, web: ObjectId, viewer: Option<ObjectId>) -> Result<WebItem> {
        let mut pipeline = vec![doc! { "$match": { "_id": web } }];
        pipeline.push(owner_profile_lookup(viewer));
        pipeline.extend(like_stages(TargetKind::Web, viewer));
        pipeline.extend(comment_count_stages());
        pipeline.push(owner_unwrap());
        pipeline.push(strip_arrays(&["likes", "comments"]));

        let mut results = self.collections.webs.aggregate(pipeline).await?;
        let found = results
            .pop()
            .ok_or_else(|| EngineError::not_found(format!("web {}", web)))?;

        bson::from_document(found)
            .map_err(|e| EngineError::unavailable(format!("failed to decode web: {}", e)))
    }

    /// Webs owned by a profile, scope-filtered.
    ///
    /// The private scope is owner-only: any other viewer gets an empty page
    /// rather than a peek at unpublished work.
    pub async fn by_owner(
        &self,
        owner: ObjectId,
        scope: WebScope,
        viewer: Option<ObjectId>,
        sort: Option<SortSpec>,
        request: PageRequest,
    ) -> Result<Page<WebItem>> {
        let sort = sort.unwrap_or_else(|| SortSpec::desc(SortKey::Views));
        sort.validate_against(WEB_SORT_KEYS, "webs")?;

        let is_owner = viewer == Some(owner);
        let base = match scope {
            WebScope::Public => doc! { "owner": owner, "is_public": true },
            WebScope::Private => {
                if !is_owner {
                    return Ok(Page::empty(&request));
                }
                doc! { "owner": owner, "is_public": false }
            }
            WebScope::Forked => {
                let mut filter = doc! { "owner": owner, "forked_from": { "$exists": true } };
                if !is_owner {
                    filter.insert("is_public", true);
                }
                filter
            }
        };

        let mut pipeline = vec![doc! { "$match": base }];
        pipeline.extend(web_item_stages(viewer));
        pipeline.push(sort.stage());

        paginate(&self.collections.webs, pipeline, &request).await
    }

    /// The viewer's own webs, public and private alike
    pub async fn own_work(
        &self,
        owner: ObjectId,
        sort: Option<SortSpec>,
        request: PageRequest,
    ) -> Result<Page<WebItem>> {
        let sort = sort.unwrap_or_else(|| SortSpec::desc(SortKey::Views));
        sort.validate_against(WEB_SORT_KEYS, "webs")?;

        let mut pipeline = vec![doc! { "$match": { "owner": owner } }];
        pipeline.extend(like_stages(TargetKind::Web, Some(owner)));
        pipeline.extend(comment_count_stages());
        pipeline.push(strip_arrays(&["likes", "comments"]));
        pipeline.push(sort.stage());

        paginate(&self.collections.webs, pipeline, &request).await
    }

    /// Public webs a profile has liked, rooted on the reaction edges
    pub async fn liked_by(
        &self,
        profile: ObjectId,
        viewer: Option<ObjectId>,
        sort: Option<SortSpec>,
        request: PageRequest,
    ) -> Result<Page<WebItem>> {
        let sort = sort.unwrap_or_default();
        sort.validate_against(WEB_SORT_KEYS, "webs")?;

        let mut nested = vec![doc! { "$match": { "is_public": true } }];
        nested.extend(web_item_stages(viewer));

        let mut pipeline = vec![
            doc! { "$match": { "reacted_by": profile, "target.kind": "web" } },
            doc! {
                "$lookup": {
                    "from": WEB_COLLECTION,
                    "localField": "target.id",
                    "foreignField": "_id",
                    "as": "web",
                    "pipeline": nested,
                }
            },
        ];
        pipeline.extend(replace_with("web"));
        pipeline.push(sort.stage());

        paginate(&self.collections.reactions, pipeline, &request).await
    }

    /// Public webs owned by profiles the viewer follows.
    ///
    /// Following no one composes an empty page, not an error.
    pub async fn following(
        &self,
        viewer: ObjectId,
        sort: Option<SortSpec>,
        request: PageRequest,
    ) -> Result<Page<WebItem>> {
        let sort = sort.unwrap_or_else(|| SortSpec::desc(SortKey::Views));
        sort.validate_against(WEB_SORT_KEYS, "webs")?;

        let mut nested = vec![doc! { "$match": { "is_public": true } }];
        nested.extend(web_item_stages(Some(viewer)));

        let mut pipeline = vec![
            doc! { "$match": { "followed_by": viewer } },
            doc! {
                "$lookup": {
                    "from": WEB_COLLECTION,
                    "localField": "profile",
                    "foreignField": "owner",
                    "as": "webs",
                    "pipeline": nested,
                }
            },
            doc! { "$project": { "webs": 1 } },
        ];
        pipeline.extend(replace_with("webs"));
        pipeline.push(sort.stage());

        paginate(&self.collections.follows, pipeline, &request).await
    }

    /// Public webs ranked by impression score (views + likes + comments)
    pub async fn trending(
        &self,
        viewer: Option<ObjectId>,
        request: PageRequest,
    ) -> Result<Page<WebItem>> {
        let mut pipeline = vec![doc! { "$match": { "is_public": true } }];
        pipeline.extend(web_item_stages(viewer));
        pipeline.push(impression_stage());
        pipeline.push(trending_sort_stage());

        paginate(&self.collections.webs, pipeline, &request).await
    }

    /// Full-text search over public webs
    pub async fn search(
        &self,
        query: &str,
        viewer: Option<ObjectId>,
        request: PageRequest,
    ) -> Result<Page<WebItem>> {
        let query = require_query(query)?;

        // $text must live in the first stage of the pipeline
        let mut pipeline = vec![doc! {
            "$match": { "$text": { "$search": query }, "is_public": true }
        }];
        pipeline.extend(web_item_stages(viewer));
        pipeline.push(text_score_stage());
        pipeline.push(search_sort_stage());

        paginate(&self.collections.webs, pipeline, &request).await
    }

    /// Full-text search restricted to the viewer's own webs
    pub async fn search_own(
        &self,
        owner: ObjectId,
        query: &str,
        request: PageRequest,
    ) -> Result<Page<WebItem>> {
        let query = require_query(query)?;

        let mut pipeline = vec![doc! {
            "$match": { "$text": { "$search": query }, "owner": owner }
        }];
        pipeline.extend(like_stages(TargetKind::Web, Some(owner)));
        pipeline.extend(comment_count_stages());
        pipeline.push(text_score_stage());
        pipeline.push(strip_arrays(&["likes", "comments"]));
        pipeline.push(search_sort_stage());

        paginate(&self.collections.webs, pipeline, &request).await
    }

    /// Member webs of a collection, ordered by the requested sort
    pub async fn collection_members(
        &self,
        collection: ObjectId,
        viewer: Option<ObjectId>,
        sort: Option<SortSpec>,
        request: PageRequest,
    ) -> Result<Page<WebItem>> {
        let sort = sort.unwrap_or_else(|| SortSpec::desc(SortKey::Views));
        sort.validate_against(WEB_SORT_KEYS, "webs")?;

        let found = self
            .collections
            .collections
            .find_one(doc! { "_id": collection })
            .await?
            .ok_or_else(|| EngineError::not_found(format!("collection {}", collection)))?;

        let mut pipeline = vec![doc! {
            "$match": { "_id": { "$in": found.webs }, "is_public": true }
        }];
        pipeline.extend(web_item_stages(viewer));
        pipeline.push(sort.stage());

        paginate(&self.collections.webs, pipeline, &request).await
    }

    /// The viewer's pinned webs
    pub async fn pinned(&self, owner: ObjectId, request: PageRequest) -> Result<Page<WebItem>> {
        let profile = self
            .collections
            .profiles
            .find_one(doc! { "_id": owner })
            .await?
            .ok_or_else(|| EngineError::not_found(format!("profile {}", owner)))?;

        if profile.pinned.is_empty() {
            return Ok(Page::empty(&request));
        }

        let mut pipeline = vec![doc! { "$match": { "_id": { "$in": profile.pinned } } }];
        pipeline.extend(web_item_stages(Some(owner)));
        pipeline.push(SortSpec::default().stage());

        paginate(&self.collections.webs, pipeline, &request).await
    }
}

/// Shared projection suffix for web list feeds: owner identity, like and
/// comment projections, edge arrays stripped.
fn web_item_stages(viewer: Option<ObjectId>) -> Vec<Document> {
    let mut stages = vec![owner_identity_lookup()];
    stages.extend(like_stages(TargetKind::Web, viewer));
    stages.extend(comment_count_stages());
    stages.push(owner_unwrap());
    stages.push(strip_arrays(&["likes", "comments"]));
    stages
}

fn require_query(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(EngineError::invalid("search query is required"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_parse() {
        assert_eq!(WebScope::parse("forked").unwrap(), WebScope::Forked);
        assert!(WebScope::parse("drafts").is_err());
    }

    #[test]
    fn test_empty_search_query_rejected() {
        assert!(require_query("   ").is_err());
        assert_eq!(require_query(" solar ").unwrap(), "solar");
    }

    #[test]
    fn test_item_stages_join_owner_and_both_counts() {
        let stages = web_item_stages(None);
        let lookups: Vec<String> = stages
            .iter()
            .filter_map(|s| s.get_document("$lookup").ok())
            .map(|l| l.get_str("from").unwrap().to_string())
            .collect();
        assert_eq!(lookups, vec!["users", "reactions", "comments"]);
    }

    #[test]
    fn test_item_stages_strip_edge_arrays() {
        let last = web_item_stages(None).pop().unwrap();
        let projection = last.get_document("$project").unwrap();
        assert!(projection.contains_key("likes"));
        assert!(projection.contains_key("comments"));
    }
}
