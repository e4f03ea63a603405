//! Collection feeds
//!
//! List feeds attach a short public-member preview strip per collection;
//! the single read keeps the raw membership list so member webs can be paged
//! separately.

use bson::{doc, oid::ObjectId, Document};

use crate::db::schemas::{TargetKind, COLLECTION_COLLECTION, WEB_COLLECTION};
use crate::db::Collections;
use crate::feed::page::{paginate, Page, PageRequest};
use crate::feed::sort::{search_sort_stage, SortSpec, COLLECTION_SORT_KEYS};
use crate::feed::view::{CollectionItem, CollectionView};
use crate::projection::{
    like_stages, owner_identity_lookup, owner_profile_lookup, owner_unwrap, replace_with,
    save_stages, strip_arrays, text_score_stage,
};
use crate::types::{EngineError, Result};

/// How many member webs a list feed previews per collection
const PREVIEW_WEBS: i64 = 4;

/// Collection feed composer
#[derive(Clone)]
pub struct CollectionFeed {
    collections: Collections,
}

impl CollectionFeed {
    pub fn new(collections: Collections) -> Self {
        Self { collections }
    }

    /// Single collection with full owner projection and raw membership
    pub async fn by_id(
        &self,
        collection: ObjectId,
        viewer: Option<ObjectId>,
    ) -> Result<CollectionView> {
        let mut pipeline = vec![doc! { "$match": { "_id": collection } }];
        pipeline.push(doc! { "$addFields": { "webs_count": { "$size": "$webs" } } });
        pipeline.push(owner_profile_lookup(viewer));
        pipeline.push(owner_unwrap());
        pipeline.extend(like_stages(TargetKind::Collection, viewer));
        pipeline.extend(save_stages(viewer));
        pipeline.push(strip_arrays(&["likes", "saves"]));

        let mut results = self.collections.collections.aggregate(pipeline).await?;
        let found = results
            .pop()
            .ok_or_else(|| EngineError::not_found(format!("collection {}", collection)))?;

        bson::from_document(found)
            .map_err(|e| EngineError::unavailable(format!("failed to decode collection: {}", e)))
    }

    /// Collections owned by a profile.
    ///
    /// The owner sees private collections in their own listing; everyone
    /// else gets public ones only.
    pub async fn by_owner(
        &self,
        owner: ObjectId,
        viewer: Option<ObjectId>,
        sort: Option<SortSpec>,
        request: PageRequest,
    ) -> Result<Page<CollectionItem>> {
        let sort = sort.unwrap_or_default();
        sort.validate_against(COLLECTION_SORT_KEYS, "collections")?;

        let mut base = doc! { "owner": owner };
        if viewer != Some(owner) {
            base.insert("is_public", true);
        }

        let mut pipeline = vec![doc! { "$match": base }];
        pipeline.extend(collection_item_stages(viewer, owner_identity_lookup()));
        pipeline.push(sort.stage());

        paginate(&self.collections.collections, pipeline, &request).await
    }

    /// Collections the viewer has saved, rooted on the save edges
    pub async fn saved_by(
        &self,
        viewer: ObjectId,
        request: PageRequest,
    ) -> Result<Page<CollectionItem>> {
        let mut nested = vec![doc! { "$match": { "is_public": true } }];
        nested.extend(collection_item_stages(
            Some(viewer),
            owner_profile_lookup(Some(viewer)),
        ));

        let mut pipeline = vec![
            doc! { "$match": { "saved_by": viewer } },
            doc! {
                "$lookup": {
                    "from": COLLECTION_COLLECTION,
                    "localField": "collection",
                    "foreignField": "_id",
                    "as": "collection",
                    "pipeline": nested,
                }
            },
        ];
        pipeline.extend(replace_with("collection"));
        pipeline.push(SortSpec::default().stage());

        paginate(&self.collections.saves, pipeline, &request).await
    }

    /// Full-text search over public collection names
    pub async fn search(
        &self,
        query: &str,
        viewer: Option<ObjectId>,
        request: PageRequest,
    ) -> Result<Page<CollectionItem>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(EngineError::invalid("search query is required"));
        }

        let mut pipeline = vec![doc! {
            "$match": { "$text": { "$search": trimmed }, "is_public": true }
        }];
        pipeline.extend(collection_item_stages(viewer, owner_identity_lookup()));
        pipeline.push(text_score_stage());
        pipeline.push(search_sort_stage());

        paginate(&self.collections.collections, pipeline, &request).await
    }
}

/// Shared projection suffix for collection list feeds.
///
/// `webs_count` is taken from the raw membership list before the preview
/// lookup overwrites the field with a short strip of public members.
fn collection_item_stages(viewer: Option<ObjectId>, owner_lookup: Document) -> Vec<Document> {
    let mut stages = vec![
        doc! { "$addFields": { "webs_count": { "$size": "$webs" } } },
        doc! {
            "$lookup": {
                "from": WEB_COLLECTION,
                "localField": "webs",
                "foreignField": "_id",
                "as": "webs",
                "pipeline": [
                    { "$match": { "is_public": true } },
                    { "$sort": { "views": -1 } },
                    { "$limit": PREVIEW_WEBS },
                    { "$project": { "title": 1, "image": 1, "views": 1 } },
                ],
            }
        },
        owner_lookup,
        owner_unwrap(),
    ];
    stages.extend(like_stages(TargetKind::Collection, viewer));
    stages.extend(save_stages(viewer));
    stages.push(strip_arrays(&["likes", "saves"]));
    stages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_precedes_preview_overwrite() {
        let stages = collection_item_stages(None, owner_identity_lookup());
        // the $size runs against the raw membership ids
        let first = stages[0].get_document("$addFields").unwrap();
        assert!(first.get_document("webs_count").is_ok());
        let second = stages[1].get_document("$lookup").unwrap();
        assert_eq!(second.get_str("as").unwrap(), "webs");
    }

    #[test]
    fn test_preview_is_public_capped_and_slim() {
        let stages = collection_item_stages(None, owner_identity_lookup());
        let preview = stages[1]
            .get_document("$lookup")
            .unwrap()
            .get_array("pipeline")
            .unwrap();
        let match_stage = preview[0].as_document().unwrap().get_document("$match").unwrap();
        assert_eq!(match_stage.get_bool("is_public").unwrap(), true);
        let limit = preview[2].as_document().unwrap().get_i64("$limit").unwrap();
        assert_eq!(limit, PREVIEW_WEBS);
    }
}
