//! Asset lifecycle operations
//!
//! Asset binaries go straight to the media store before the engine is
//! involved; the document records only the resulting URL and handle.
//! Deletion is a cascade concern and lives with the coordinator.

use bson::{doc, oid::ObjectId};
use tracing::debug;

use crate::db::schemas::{AssetDoc, AssetKind, TargetKind};
use crate::db::Collections;
use crate::feed::view::AssetItem;
use crate::projection::{like_stages, strip_arrays};
use crate::types::{EngineError, Result};

/// Input for a new asset record
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub title: String,
    pub asset_type: AssetKind,
    pub url: String,
    pub public_id: String,
    pub is_public: bool,
}

impl Default for NewAsset {
    fn default() -> Self {
        Self {
            title: String::new(),
            asset_type: AssetKind::Image,
            url: String::new(),
            public_id: String::new(),
            is_public: true,
        }
    }
}

/// Asset store
#[derive(Clone)]
pub struct AssetStore {
    collections: Collections,
}

impl AssetStore {
    pub fn new(collections: Collections) -> Self {
        Self { collections }
    }

    /// Record an uploaded asset
    pub async fn create(&self, owner: ObjectId, input: NewAsset) -> Result<AssetDoc> {
        let title = input.title.trim();
        if title.is_empty() || input.url.trim().is_empty() || input.public_id.trim().is_empty() {
            return Err(EngineError::invalid(
                "title, url, and public_id are required",
            ));
        }

        let mut asset = AssetDoc::new(
            owner,
            title.to_string(),
            input.asset_type,
            input.url,
            input.public_id,
        );
        asset.is_public = input.is_public;

        let id = self.collections.assets.insert_one(asset).await?;
        debug!(asset = %id, %owner, "recorded asset");

        self.collections
            .assets
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| EngineError::unavailable("stored asset vanished before readback"))
    }

    /// A profile's assets, newest first, with like projections.
    ///
    /// The owner sees everything; anyone else sees only public assets.
    pub async fn list_for_owner(
        &self,
        owner: ObjectId,
        viewer: Option<ObjectId>,
    ) -> Result<Vec<AssetItem>> {
        let mut filter = doc! { "owner": owner };
        if viewer != Some(owner) {
            filter.insert("is_public", true);
        }

        let mut pipeline = vec![doc! { "$match": filter }];
        pipeline.extend(like_stages(TargetKind::Asset, viewer));
        pipeline.push(strip_arrays(&["likes"]));
        pipeline.push(doc! { "$sort": { "created_at": -1 } });

        let raw = self.collections.assets.aggregate(pipeline).await?;
        raw.into_iter()
            .map(|found| {
                bson::from_document(found)
                    .map_err(|e| EngineError::unavailable(format!("failed to decode asset: {}", e)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_asset_defaults_public() {
        let input = NewAsset {
            title: "brush pack".to_string(),
            url: "mem://media/1".to_string(),
            public_id: "mem-1".to_string(),
            ..NewAsset::default()
        };
        assert!(input.is_public);
        assert_eq!(input.asset_type, AssetKind::Image);
    }

    #[test]
    fn test_asset_item_decodes_from_projection_shape() {
        let raw = doc! {
            "_id": ObjectId::new(),
            "title": "brush pack",
            "asset_type": "image",
            "url": "mem://media/1",
            "public_id": "mem-1",
            "is_public": true,
            "likes_count": 3_i64,
            "is_liked_by_me": false,
        };
        let item: AssetItem = bson::from_document(raw).unwrap();
        assert_eq!(item.likes_count, 3);
        assert_eq!(item.asset_type, AssetKind::Image);
    }
}
