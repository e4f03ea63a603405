//! Feed sort taxonomy
//!
//! Each feed kind accepts a fixed set of sort keys; anything else is an
//! `InvalidArgument` before a pipeline is built. Search and trending impose
//! their own deterministic orderings and take no caller sort at all.

use bson::{doc, Document};

use crate::types::{EngineError, Result};

/// Fields a caller may sort a feed by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    Views,
    LikesCount,
    CommentsCount,
    WebsCount,
    FollowersCount,
}

impl SortKey {
    /// The pipeline field this key sorts on
    pub fn field(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::Views => "views",
            SortKey::LikesCount => "likes_count",
            SortKey::CommentsCount => "comments_count",
            SortKey::WebsCount => "webs_count",
            SortKey::FollowersCount => "followers_count",
        }
    }

    /// Parse a caller-supplied sort key
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "created_at" => Ok(SortKey::CreatedAt),
            "views" => Ok(SortKey::Views),
            "likes_count" => Ok(SortKey::LikesCount),
            "comments_count" => Ok(SortKey::CommentsCount),
            "webs_count" => Ok(SortKey::WebsCount),
            "followers_count" => Ok(SortKey::FollowersCount),
            other => Err(EngineError::invalid(format!("unknown sort key '{}'", other))),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn sign(&self) -> i32 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
}

/// A validated (key, direction) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            key: SortKey::CreatedAt,
            order: SortOrder::Desc,
        }
    }
}

impl SortSpec {
    pub fn new(key: SortKey, order: SortOrder) -> Self {
        Self { key, order }
    }

    pub fn desc(key: SortKey) -> Self {
        Self::new(key, SortOrder::Desc)
    }

    /// Reject keys foreign to the feed kind
    pub fn validate_against(&self, allowed: &[SortKey], kind: &str) -> Result<()> {
        if allowed.contains(&self.key) {
            Ok(())
        } else {
            Err(EngineError::invalid(format!(
                "sort key '{}' is not valid for {}",
                self.key.field(),
                kind
            )))
        }
    }

    /// The `$sort` stage for this spec
    pub fn stage(&self) -> Document {
        doc! { "$sort": { self.key.field(): self.order.sign() } }
    }
}

/// Sort keys valid for web feeds
pub const WEB_SORT_KEYS: &[SortKey] = &[
    SortKey::CreatedAt,
    SortKey::Views,
    SortKey::LikesCount,
    SortKey::CommentsCount,
];

/// Sort keys valid for collection feeds
pub const COLLECTION_SORT_KEYS: &[SortKey] = &[
    SortKey::CreatedAt,
    SortKey::Views,
    SortKey::LikesCount,
    SortKey::WebsCount,
];

/// Sort keys valid for profile feeds
pub const PROFILE_SORT_KEYS: &[SortKey] = &[
    SortKey::CreatedAt,
    SortKey::FollowersCount,
    SortKey::WebsCount,
];

/// Sort keys valid for comment threads
pub const COMMENT_SORT_KEYS: &[SortKey] = &[SortKey::CreatedAt, SortKey::LikesCount];

/// Deterministic search ordering: relevance, then popularity, then recency.
///
/// The fixed tie-break chain keeps repeated identical queries stable across
/// pages.
pub fn search_sort_stage() -> Document {
    doc! { "$sort": { "text_score": -1, "likes_count": -1, "created_at": -1 } }
}

/// Trending ordering: impression score with recency tie-break
pub fn trending_sort_stage() -> Document {
    doc! { "$sort": { "impression_score": -1, "created_at": -1 } }
}

/// Profile search ordering: relevance, then audience, then recency
pub fn profile_search_sort_stage() -> Document {
    doc! { "$sort": { "text_score": -1, "followers_count": -1, "created_at": -1 } }
}

/// Recommended-profiles ordering: reach, then audience, then output
pub fn recommended_sort_stage() -> Document {
    doc! { "$sort": { "followers_count": -1, "total_web_views": -1, "webs_count": -1 } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_sort_key_rejected() {
        let spec = SortSpec::desc(SortKey::FollowersCount);
        let err = spec.validate_against(WEB_SORT_KEYS, "webs").unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[test]
    fn test_valid_sort_key_accepted() {
        let spec = SortSpec::desc(SortKey::Views);
        assert!(spec.validate_against(WEB_SORT_KEYS, "webs").is_ok());
    }

    #[test]
    fn test_default_sort_is_created_at_desc() {
        let stage = SortSpec::default().stage();
        let sort = stage.get_document("$sort").unwrap();
        assert_eq!(sort.get_i32("created_at").unwrap(), -1);
    }

    #[test]
    fn test_parse_rejects_unknown_key() {
        assert!(SortKey::parse("trending").is_err());
        assert_eq!(SortKey::parse("views").unwrap(), SortKey::Views);
    }

    #[test]
    fn test_search_tie_breaks_are_ordered() {
        let stage = search_sort_stage();
        let sort = stage.get_document("$sort").unwrap();
        let keys: Vec<_> = sort.keys().collect();
        assert_eq!(keys, vec!["text_score", "likes_count", "created_at"]);
        assert!(sort.values().all(|v| v.as_i32() == Some(-1)));
    }

    #[test]
    fn test_trending_breaks_ties_by_recency() {
        let stage = trending_sort_stage();
        let sort = stage.get_document("$sort").unwrap();
        let keys: Vec<_> = sort.keys().collect();
        assert_eq!(keys, vec!["impression_score", "created_at"]);
    }
}
