//! Facet pagination
//!
//! Every feed runs count and slice in the same aggregation via `$facet`, so
//! `total_items` always describes the same snapshot the page was cut from.
//! Pages are 1-indexed; a page past the end is an empty page, not an error.

use bson::{doc, Document};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Stamped};
use crate::db::MongoCollection;
use crate::types::{EngineError, Result};

/// Default page sizes by feed family
pub const WEB_PAGE_SIZE: u32 = 4;
pub const RECOMMENDED_PAGE_SIZE: u32 = 8;
pub const FOLLOW_PAGE_SIZE: u32 = 20;
pub const COMMENT_PAGE_SIZE: u32 = 20;
pub const PINNED_PAGE_SIZE: u32 = 10;
pub const SAVED_PAGE_SIZE: u32 = 10;

/// Which slice of a feed to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Validated request; pages are 1-indexed and never empty-sized
    pub fn new(page: u32, page_size: u32) -> Result<Self> {
        if page == 0 {
            return Err(EngineError::invalid("page is 1-indexed"));
        }
        if page_size == 0 {
            return Err(EngineError::invalid("page_size must be at least 1"));
        }
        Ok(Self { page, page_size })
    }

    /// First page at the given size
    pub fn first(page_size: u32) -> Self {
        Self { page: 1, page_size }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    fn skip(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }

    /// Count-and-slice stage appended to every feed pipeline
    pub fn facet_stage(&self) -> Document {
        doc! {
            "$facet": {
                "items": [
                    { "$skip": self.skip() },
                    { "$limit": self.page_size as i64 },
                ],
                "total": [
                    { "$count": "count" },
                ],
            }
        }
    }
}

/// One page of a composed feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// The empty page for a filter that matched nothing
    pub fn empty(request: &PageRequest) -> Self {
        Self {
            items: Vec::new(),
            page: request.page,
            page_size: request.page_size,
            total_items: 0,
            total_pages: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: DeserializeOwned> Page<T> {
    /// Assemble a page from the `$facet` output document
    pub fn from_facet(facet: Document, request: &PageRequest) -> Result<Self> {
        // $count yields an int32 until the total outgrows it
        let total_items = facet
            .get_array("total")
            .ok()
            .and_then(|totals| totals.first())
            .and_then(|t| t.as_document())
            .and_then(|t| {
                t.get_i64("count")
                    .ok()
                    .or_else(|| t.get_i32("count").ok().map(i64::from))
            })
            .unwrap_or(0) as u64;

        let raw_items = facet
            .get_array("items")
            .map_err(|_| EngineError::unavailable("facet result missing items"))?;

        let mut items = Vec::with_capacity(raw_items.len());
        for raw in raw_items {
            let item_doc = raw
                .as_document()
                .ok_or_else(|| EngineError::unavailable("facet item is not a document"))?;
            let item = bson::from_document(item_doc.clone())
                .map_err(|e| EngineError::unavailable(format!("failed to decode feed item: {}", e)))?;
            items.push(item);
        }

        Ok(Self {
            items,
            page: request.page,
            page_size: request.page_size,
            total_items,
            total_pages: total_pages(total_items, request.page_size),
        })
    }
}

fn total_pages(total_items: u64, page_size: u32) -> u64 {
    total_items.div_ceil(page_size as u64)
}

/// Run a feed pipeline with the facet stage appended and decode one page
pub async fn paginate<R, T>(
    collection: &MongoCollection<R>,
    mut pipeline: Vec<Document>,
    request: &PageRequest,
) -> Result<Page<T>>
where
    R: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + Stamped,
    T: DeserializeOwned,
{
    pipeline.push(request.facet_stage());

    let mut results = collection.aggregate(pipeline).await?;
    let facet = results
        .pop()
        .ok_or_else(|| EngineError::unavailable("facet pipeline returned no document"))?;

    Page::from_facet(facet, request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_is_one_indexed() {
        assert!(PageRequest::new(0, 4).is_err());
        assert!(PageRequest::new(1, 4).is_ok());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(PageRequest::new(1, 0).is_err());
    }

    #[test]
    fn test_skip_grows_by_page_size() {
        let request = PageRequest::new(3, 4).unwrap();
        let facet = request.facet_stage();
        let items = facet.get_document("$facet").unwrap().get_array("items").unwrap();
        assert_eq!(items[0].as_document().unwrap().get_i64("$skip").unwrap(), 8);
        assert_eq!(items[1].as_document().unwrap().get_i64("$limit").unwrap(), 4);
    }

    #[test]
    fn test_facet_counts_in_same_pipeline() {
        let facet = PageRequest::first(10).facet_stage();
        let total = facet.get_document("$facet").unwrap().get_array("total").unwrap();
        assert_eq!(
            total[0].as_document().unwrap().get_str("$count").unwrap(),
            "count"
        );
    }

    #[test]
    fn test_page_beyond_end_is_empty_not_error() {
        let request = PageRequest::new(9, 4).unwrap();
        let facet = doc! { "items": [], "total": [{ "count": 5 }] };
        let page: Page<Document> = Page::from_facet(facet, &request).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total_items, 5);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn test_empty_feed_has_zero_totals() {
        let request = PageRequest::first(4);
        let facet = doc! { "items": [], "total": [] };
        let page: Page<Document> = Page::from_facet(facet, &request).unwrap();
        assert_eq!(page.total_items, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(5, 4), 2);
        assert_eq!(total_pages(8, 4), 2);
        assert_eq!(total_pages(9, 4), 3);
        assert_eq!(total_pages(0, 4), 0);
    }
}
