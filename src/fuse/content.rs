//! Document content cache
//!
//! Documents are fetched whole on first read and served out of memory
//! afterwards. Concurrent first reads of the same document coalesce onto
//! a single fetch; a failed fetch is returned to every waiter and caches
//! nothing, so the next read retries. Entries expire after a TTL and are
//! evicted under size pressure once total cached bytes pass the
//! configured ceiling.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::task;
use tracing::{debug, error};

use crate::api::{CatalogClient, CatalogError, NodeId};
use crate::config::CacheConfig;

use super::FsError;

pub struct ContentCache {
    client: Arc<dyn CatalogClient>,
    entries: Cache<NodeId, Arc<Vec<u8>>>,
}

impl ContentCache {
    pub fn new(client: Arc<dyn CatalogClient>, config: &CacheConfig) -> Self {
        let entries = Cache::builder()
            .time_to_live(Duration::from_secs(config.content_ttl_secs as u64))
            .weigher(|_id: &NodeId, data: &Arc<Vec<u8>>| {
                data.len().try_into().unwrap_or(u32::MAX)
            })
            .max_capacity(config.max_size_mb as u64 * 1024 * 1024)
            .build();

        Self { client, entries }
    }

    /// Read `size` bytes of a document starting at `offset`. The window
    /// is clipped to the document extent: reads past end-of-file return
    /// the remaining bytes, empty once `offset` reaches the size.
    pub async fn read(&self, id: &NodeId, offset: u64, size: u32) -> Result<Vec<u8>, FsError> {
        let data = self.fetch(id).await?;

        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let end = start.saturating_add(size as usize).min(data.len());
        Ok(data[start..end].to_vec())
    }

    async fn fetch(&self, id: &NodeId) -> Result<Arc<Vec<u8>>, FsError> {
        let init = {
            let client = self.client.clone();
            let id = id.clone();
            async move {
                // The download runs on its own task, so an interrupted
                // caller cannot abort it for the other waiters.
                let download = task::spawn(async move { client.fetch_content(&id).await });
                match download.await {
                    Ok(Ok(bytes)) => {
                        debug!(len = bytes.len(), "document content fetched");
                        Ok(Arc::new(bytes))
                    }
                    Ok(Err(err)) => {
                        error!(%err, "content fetch failed");
                        Err(err)
                    }
                    Err(_) => Err(CatalogError::Interrupted),
                }
            }
        };

        self.entries
            .try_get_with(id.clone(), init)
            .await
            .map_err(FsError::Io)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::api::ChildRecord;

    use super::*;

    struct OneDocCatalog {
        bytes: Vec<u8>,
        fetches: AtomicUsize,
        fail_next: Mutex<bool>,
    }

    impl OneDocCatalog {
        fn new(bytes: Vec<u8>) -> Arc<Self> {
            Arc::new(Self {
                bytes,
                fetches: AtomicUsize::new(0),
                fail_next: Mutex::new(false),
            })
        }
    }

    #[async_trait]
    impl CatalogClient for OneDocCatalog {
        async fn list_children(&self, node: &NodeId) -> Result<Vec<ChildRecord>, CatalogError> {
            Err(CatalogError::NotAFolder(node.clone()))
        }

        async fn fetch_content(&self, _node: &NodeId) -> Result<Vec<u8>, CatalogError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if std::mem::take(&mut *self.fail_next.lock()) {
                return Err(CatalogError::Malformed("injected failure".into()));
            }
            Ok(self.bytes.clone())
        }
    }

    fn cache_for(catalog: Arc<OneDocCatalog>) -> ContentCache {
        ContentCache::new(catalog, &CacheConfig::default())
    }

    const DOC: NodeId = NodeId::Document(1);

    #[tokio::test]
    async fn test_read_clips_window_to_extent() {
        let cache = cache_for(OneDocCatalog::new(b"hello world".to_vec()));

        assert_eq!(cache.read(&DOC, 0, 5).await.unwrap(), b"hello");
        assert_eq!(cache.read(&DOC, 6, 100).await.unwrap(), b"world");
        assert_eq!(cache.read(&DOC, 11, 10).await.unwrap(), b"");
        assert_eq!(cache.read(&DOC, 999, 10).await.unwrap(), b"");
    }

    #[tokio::test]
    async fn test_second_read_hits_cache() {
        let catalog = OneDocCatalog::new(vec![7u8; 64]);
        let cache = cache_for(catalog.clone());

        let first = cache.read(&DOC, 0, 64).await.unwrap();
        let second = cache.read(&DOC, 0, 64).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(catalog.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let catalog = OneDocCatalog::new(b"ok".to_vec());
        *catalog.fail_next.lock() = true;
        let cache = cache_for(catalog.clone());

        let err = cache.read(&DOC, 0, 2).await.unwrap_err();
        assert!(matches!(err, FsError::Io(_)));

        // Next read retries and succeeds.
        assert_eq!(cache.read(&DOC, 0, 2).await.unwrap(), b"ok");
        assert_eq!(catalog.fetches.load(Ordering::SeqCst), 2);
    }
}
