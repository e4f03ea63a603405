//! Media storage seam
//!
//! Content operations store preview images, avatars, and uploaded assets
//! through this trait rather than a concrete CDN client, so backends can be
//! swapped and tests can run against the in-memory store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::types::{EngineError, Result};

/// A stored media object: where it is served from and the backend handle
/// needed to delete it later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub url: String,
    pub public_id: String,
}

/// Trait for media storage (allows mocking in tests)
#[async_trait::async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload a local file and return its served location
    async fn upload(&self, local_path: &str) -> Result<StoredMedia>;

    /// Delete a stored object by its backend handle.
    ///
    /// Deleting an unknown handle is not an error; cascades retry nothing.
    async fn delete(&self, public_id: &str) -> Result<()>;
}

/// In-memory media store for tests and local development
pub struct InMemoryMediaStore {
    objects: RwLock<HashMap<String, StoredMedia>>,
    next_id: AtomicU64,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of objects currently stored
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Whether a handle is still stored
    pub async fn contains(&self, public_id: &str) -> bool {
        self.objects.read().await.contains_key(public_id)
    }
}

impl Default for InMemoryMediaStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn upload(&self, local_path: &str) -> Result<StoredMedia> {
        if local_path.is_empty() {
            return Err(EngineError::invalid("media path is required"));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let media = StoredMedia {
            url: format!("mem://media/{}", id),
            public_id: format!("mem-{}", id),
        };

        self.objects
            .write()
            .await
            .insert(media.public_id.clone(), media.clone());

        Ok(media)
    }

    async fn delete(&self, public_id: &str) -> Result<()> {
        self.objects.write().await.remove(public_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_then_delete() {
        let store = InMemoryMediaStore::new();

        let media = store.upload("/tmp/preview.png").await.unwrap();
        assert!(store.contains(&media.public_id).await);

        store.delete(&media.public_id).await.unwrap();
        assert!(!store.contains(&media.public_id).await);
    }

    #[tokio::test]
    async fn test_delete_unknown_handle_is_quiet() {
        let store = InMemoryMediaStore::new();
        assert!(store.delete("never-stored").await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_path_rejected() {
        let store = InMemoryMediaStore::new();
        assert!(store.upload("").await.is_err());
    }
}
