//! Aggregation stage builders
//!
//! Every derived field the engine serves (counts, viewer flags, impression
//! and text scores) is composed from these builders inside one pipeline per
//! page. Nothing here is ever written back to storage.
//!
//! Viewer flags follow one rule: with a viewer, the flag is an `$in` over the
//! joined edge array; anonymous, it is the literal `false` and the edge array
//! is never consulted.

use bson::{doc, oid::ObjectId, Bson, Document};

use crate::db::schemas::{TargetKind, COMMENT_COLLECTION, FOLLOW_COLLECTION, PROFILE_COLLECTION,
    REACTION_COLLECTION, REPLY_COLLECTION, SAVE_COLLECTION, WEB_COLLECTION};

/// Membership flag expression: `$in` for a known viewer, literal `false`
/// for an anonymous one.
pub fn viewer_flag(viewer: Option<ObjectId>, edge_path: &str) -> Bson {
    match viewer {
        Some(id) => Bson::Document(doc! { "$in": [id, edge_path] }),
        None => Bson::Boolean(false),
    }
}

/// Join the reactions targeting each document of `kind` as a `likes` array.
///
/// Reactions key their target by tag pair, so this is the `let`/`$expr`
/// lookup form rather than a localField join.
pub fn likes_lookup(kind: TargetKind) -> Document {
    doc! {
        "$lookup": {
            "from": REACTION_COLLECTION,
            "let": { "target_id": "$_id" },
            "pipeline": [
                {
                    "$match": {
                        "$expr": {
                            "$and": [
                                { "$eq": ["$target.kind", kind.as_str()] },
                                { "$eq": ["$target.id", "$$target_id"] },
                            ]
                        }
                    }
                }
            ],
            "as": "likes",
        }
    }
}

/// `likes_count` + `is_liked_by_me` over a joined `likes` array
pub fn likes_fields(viewer: Option<ObjectId>) -> Document {
    doc! {
        "$addFields": {
            "likes_count": { "$size": "$likes" },
            "is_liked_by_me": viewer_flag(viewer, "$likes.reacted_by"),
        }
    }
}

/// Lookup + fields + cleanup for like projections on any content kind
pub fn like_stages(kind: TargetKind, viewer: Option<ObjectId>) -> Vec<Document> {
    vec![likes_lookup(kind), likes_fields(viewer)]
}

/// Join each web's comments and derive `comments_count`
pub fn comment_count_stages() -> Vec<Document> {
    vec![
        doc! {
            "$lookup": {
                "from": COMMENT_COLLECTION,
                "localField": "_id",
                "foreignField": "web",
                "as": "comments",
            }
        },
        doc! { "$addFields": { "comments_count": { "$size": "$comments" } } },
    ]
}

/// Join each comment's replies and derive `replies_count`
pub fn reply_count_stages() -> Vec<Document> {
    vec![
        doc! {
            "$lookup": {
                "from": REPLY_COLLECTION,
                "localField": "_id",
                "foreignField": "comment",
                "as": "replies",
            }
        },
        doc! { "$addFields": { "replies_count": { "$size": "$replies" } } },
    ]
}

/// Join each collection's saves and derive `saves_count` + `is_saved_by_me`
pub fn save_stages(viewer: Option<ObjectId>) -> Vec<Document> {
    vec![
        doc! {
            "$lookup": {
                "from": SAVE_COLLECTION,
                "localField": "_id",
                "foreignField": "collection",
                "as": "saves",
            }
        },
        doc! {
            "$addFields": {
                "saves_count": { "$size": "$saves" },
                "is_saved_by_me": viewer_flag(viewer, "$saves.saved_by"),
            }
        },
    ]
}

/// Join the owner profile carrying identity fields only
pub fn owner_identity_lookup() -> Document {
    doc! {
        "$lookup": {
            "from": PROFILE_COLLECTION,
            "localField": "owner",
            "foreignField": "_id",
            "as": "owner",
            "pipeline": [
                { "$project": { "username": 1, "full_name": 1, "avatar": 1 } }
            ],
        }
    }
}

/// Join the owner profile with follower projections for single-item reads.
///
/// One level deep only: the nested owner carries `followers_count` and
/// `is_followed_by_me` but never its own nested owner.
pub fn owner_profile_lookup(viewer: Option<ObjectId>) -> Document {
    doc! {
        "$lookup": {
            "from": PROFILE_COLLECTION,
            "localField": "owner",
            "foreignField": "_id",
            "as": "owner",
            "pipeline": [
                {
                    "$lookup": {
                        "from": FOLLOW_COLLECTION,
                        "localField": "_id",
                        "foreignField": "profile",
                        "as": "followers",
                    }
                },
                {
                    "$addFields": {
                        "followers_count": { "$size": "$followers" },
                        "is_followed_by_me": viewer_flag(viewer, "$followers.followed_by"),
                    }
                },
                {
                    "$project": {
                        "followers_count": 1,
                        "is_followed_by_me": 1,
                        "username": 1,
                        "full_name": 1,
                        "avatar": 1,
                    }
                },
            ],
        }
    }
}

/// Collapse the joined owner array to a single nested document
pub fn owner_unwrap() -> Document {
    doc! { "$addFields": { "owner": { "$first": "$owner" } } }
}

/// Join a profile's followers and derive count + viewer flag (profile feeds)
pub fn follower_stages(viewer: Option<ObjectId>) -> Vec<Document> {
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
            "$addFields": {
                "followers_count": { "$size": "$followers" },
                "is_followed_by_me": viewer_flag(viewer, "$followers.followed_by"),
            }
        },
    ]
}

/// Join a profile's owned webs and derive `webs_count`
pub fn webs_count_stages() -> Vec<Document> {
    vec![
        doc! {
            "$lookup": {
                "from": WEB_COLLECTION,
                "localField": "_id",
                "foreignField": "owner",
                "as": "webs",
            }
        },
        doc! { "$addFields": { "webs_count": { "$size": "$webs" } } },
    ]
}

/// Impression score for trending: live views plus both engagement counts.
///
/// Requires `likes_count`/`comments_count` to be present already.
pub fn impression_stage() -> Document {
    doc! {
        "$addFields": {
            "impression_score": { "$add": ["$views", "$likes_count", "$comments_count"] }
        }
    }
}

/// Full-text relevance score for `$text` matches
pub fn text_score_stage() -> Document {
    doc! { "$addFields": { "text_score": { "$meta": "textScore" } } }
}

/// Drop the joined edge arrays before returning documents
pub fn strip_arrays(arrays: &[&str]) -> Document {
    let mut projection = Document::new();
    for name in arrays {
        projection.insert(name.to_string(), 0);
    }
    doc! { "$project": projection }
}

/// Promote a single-element lookup array to the pipeline root.
///
/// `$unwind` drops rows whose lookup matched nothing, so an edge whose
/// target is mid-cascade silently vanishes instead of producing a null row.
pub fn replace_with(array: &str) -> Vec<Document> {
    vec![
        doc! { "$unwind": format!("${}", array) },
        doc! { "$replaceRoot": { "newRoot": format!("${}", array) } },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_flag_is_literal_false() {
        assert_eq!(viewer_flag(None, "$likes.reacted_by"), Bson::Boolean(false));
    }

    #[test]
    fn test_known_viewer_flag_scans_edge_array() {
        let viewer = ObjectId::new();
        let flag = viewer_flag(Some(viewer), "$likes.reacted_by");
        let doc = flag.as_document().unwrap();
        let operands = doc.get_array("$in").unwrap();
        assert_eq!(operands[0], Bson::ObjectId(viewer));
        assert_eq!(operands[1], Bson::String("$likes.reacted_by".into()));
    }

    #[test]
    fn test_likes_lookup_keys_on_target_tag() {
        let stage = likes_lookup(TargetKind::Comment);
        let lookup = stage.get_document("$lookup").unwrap();
        assert_eq!(lookup.get_str("from").unwrap(), "reactions");
        assert_eq!(lookup.get_str("as").unwrap(), "likes");

        let inner = lookup.get_array("pipeline").unwrap();
        let expr = inner[0]
            .as_document()
            .unwrap()
            .get_document("$match")
            .unwrap()
            .get_document("$expr")
            .unwrap();
        let and = expr.get_array("$and").unwrap();
        assert_eq!(
            and[0].as_document().unwrap().get_array("$eq").unwrap()[1],
            Bson::String("comment".into())
        );
    }

    #[test]
    fn test_anonymous_likes_fields_skip_edge_scan() {
        let stage = likes_fields(None);
        let fields = stage.get_document("$addFields").unwrap();
        assert_eq!(fields.get_bool("is_liked_by_me").unwrap(), false);
        // count is still derived; only the flag short-circuits
        assert!(fields.get_document("likes_count").is_ok());
    }

    #[test]
    fn test_owner_lookup_is_one_level_deep() {
        let stage = owner_profile_lookup(Some(ObjectId::new()));
        let nested = stage
            .get_document("$lookup")
            .unwrap()
            .get_array("pipeline")
            .unwrap();
        // follower join and projection only, no recursive owner lookup
        for inner in nested {
            let inner = inner.as_document().unwrap();
            if let Ok(lookup) = inner.get_document("$lookup") {
                assert_eq!(lookup.get_str("from").unwrap(), "follows");
            }
        }
    }

    #[test]
    fn test_impression_score_sums_all_three_signals() {
        let stage = impression_stage();
        let add = stage
            .get_document("$addFields")
            .unwrap()
            .get_document("impression_score")
            .unwrap()
            .get_array("$add")
            .unwrap();
        assert_eq!(add.len(), 3);
        assert!(add.contains(&Bson::String("$views".into())));
    }

    #[test]
    fn test_replace_with_unwinds_before_promoting() {
        let stages = replace_with("web");
        assert!(stages[0].contains_key("$unwind"));
        assert_eq!(
            stages[1].get_document("$replaceRoot").unwrap().get_str("newRoot").unwrap(),
            "$web"
        );
    }

    #[test]
    fn test_strip_arrays_excludes_each_named_field() {
        let stage = strip_arrays(&["likes", "comments"]);
        let projection = stage.get_document("$project").unwrap();
        assert_eq!(projection.get_i32("likes").unwrap(), 0);
        assert_eq!(projection.get_i32("comments").unwrap(), 0);
    }
}
