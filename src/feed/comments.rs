//! Comment feeds
//!
//! The per-web comment list and the single-comment thread read. Replies only
//! appear in the thread read, each with its own like projection.

use bson::{doc, oid::ObjectId};

use crate::db::schemas::{TargetKind, REPLY_COLLECTION};
use crate::db::Collections;
use crate::feed::page::{paginate, Page, PageRequest};
use crate::feed::sort::{SortSpec, COMMENT_SORT_KEYS};
use crate::feed::view::{CommentItem, CommentThread};
use crate::projection::{
    like_stages, likes_fields, likes_lookup, owner_identity_lookup, owner_unwrap,
    reply_count_stages, strip_arrays,
};
use crate::types::{EngineError, Result};

/// Comment feed composer
#[derive(Clone)]
pub struct CommentFeed {
    collections: Collections,
}

impl CommentFeed {
    pub fn new(collections: Collections) -> Self {
        Self { collections }
    }

    /// A web's comments with owner identity, like and reply counts
    pub async fn for_web(
        &self,
        web: ObjectId,
        viewer: Option<ObjectId>,
        sort: Option<SortSpec>,
        request: PageRequest,
    ) -> Result<Page<CommentItem>> {
        let sort = sort.unwrap_or_default();
        sort.validate_against(COMMENT_SORT_KEYS, "comments")?;

        let mut pipeline = vec![doc! { "$match": { "web": web } }];
        pipeline.push(owner_identity_lookup());
        pipeline.extend(like_stages(TargetKind::Comment, viewer));
        pipeline.extend(reply_count_stages());
        pipeline.push(owner_unwrap());
        pipeline.push(strip_arrays(&["likes", "replies"]));
        pipeline.push(sort.stage());

        paginate(&self.collections.comments, pipeline, &request).await
    }

    /// One comment with its full reply thread, newest reply first
    pub async fn thread(
        &self,
        comment: ObjectId,
        viewer: Option<ObjectId>,
    ) -> Result<CommentThread> {
        let reply_pipeline = vec![
            owner_identity_lookup(),
            likes_lookup(TargetKind::Reply),
            likes_fields(viewer),
            owner_unwrap(),
            strip_arrays(&["likes"]),
            doc! { "$sort": { "created_at": -1 } },
        ];

        let mut pipeline = vec![doc! { "$match": { "_id": comment } }];
        pipeline.push(owner_identity_lookup());
        pipeline.extend(like_stages(TargetKind::Comment, viewer));
        pipeline.push(doc! {
            "$lookup": {
                "from": REPLY_COLLECTION,
                "localField": "_id",
                "foreignField": "comment",
                "as": "replies",
                "pipeline": reply_pipeline,
            }
        });
        pipeline.push(doc! { "$addFields": { "replies_count": { "$size": "$replies" } } });
        pipeline.push(owner_unwrap());
        pipeline.push(strip_arrays(&["likes"]));

        let mut results = self.collections.comments.aggregate(pipeline).await?;
        let found = results
            .pop()
            .ok_or_else(|| EngineError::not_found(format!("comment {}", comment)))?;

        bson::from_document(found)
            .map_err(|e| EngineError::unavailable(format!("failed to decode comment: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::sort::SortKey;

    #[test]
    fn test_views_sort_rejected_for_comments() {
        let spec = SortSpec::desc(SortKey::Views);
        assert!(spec.validate_against(COMMENT_SORT_KEYS, "comments").is_err());
    }

    #[test]
    fn test_reply_likes_join_on_reply_tag() {
        let lookup = likes_lookup(TargetKind::Reply);
        let spec = lookup.get_document("$lookup").unwrap();
        let stage = spec.get_array("pipeline").unwrap()[0].as_document().unwrap();
        let clauses = stage
            .get_document("$match")
            .unwrap()
            .get_document("$expr")
            .unwrap()
            .get_array("$and")
            .unwrap();
        let tag = clauses[0].as_document().unwrap().get_array("$eq").unwrap();
        assert_eq!(tag[1].as_str().unwrap(), "reply");
    }
}
