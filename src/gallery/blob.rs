use super::{insert_and_trim, GalleryEntry, GalleryItem, GalleryStore};
use crate::cdn::CdnService;
use crate::{Error, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

pub const INDEX_KEY: &str = "gallery/index.json";

fn blob_key(id: &str) -> String {
    format!("gallery/{}", id)
}

fn unavailable(error: Error) -> Error {
    match error {
        Error::Storage(message) => Error::StoreUnavailable(message),
        other => other,
    }
}

/// Gallery persisted as one blob per image plus a JSON index.
///
/// Appends are serialized by a store-level mutex so the index is always
/// rewritten from the latest copy. Only one process may write the index.
pub struct BlobGallery<C: CdnService> {
    cdn: C,
    capacity: usize,
    write_lock: Mutex<()>,
}

impl<C: CdnService> BlobGallery<C> {
    pub fn new(cdn: C, capacity: usize) -> Self {
        Self {
            cdn,
            capacity: capacity.max(1),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_index(&self) -> Result<Vec<GalleryEntry>> {
        let Some(bytes) = self.cdn.read_file(INDEX_KEY).await.map_err(unavailable)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_slice::<Vec<GalleryEntry>>(&bytes) {
            Ok(mut entries) => {
                entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok(entries)
            }
            Err(e) => {
                tracing::warn!("Gallery index is unreadable, starting fresh: {}", e);
                Ok(Vec::new())
            }
        }
    }

    async fn write_index(&self, entries: &[GalleryEntry]) -> Result<()> {
        let json = serde_json::to_vec_pretty(entries)?;
        self.cdn
            .upload_file(INDEX_KEY, &json, "application/json")
            .await
            .map_err(unavailable)
    }
}

#[async_trait]
impl<C: CdnService> GalleryStore for BlobGallery<C> {
    async fn append(&self, item: GalleryItem) -> Result<Vec<GalleryEntry>> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.read_index().await?;

        self.cdn
            .upload_file(&blob_key(&item.id), &item.image_bytes, &item.mime_type)
            .await
            .map_err(unavailable)?;

        let evicted = insert_and_trim(&mut entries, item.entry(), self.capacity, |e| {
            e.created_at
        });

        self.write_index(&entries).await?;

        for old in evicted {
            if let Err(e) = self.cdn.delete_file(&blob_key(&old.id)).await {
                tracing::warn!("Failed to delete evicted gallery image {}: {}", old.id, e);
            }
        }

        Ok(entries)
    }

    async fn list(&self) -> Result<Vec<GalleryEntry>> {
        self.read_index().await
    }

    async fn get(&self, id: &str) -> Result<GalleryItem> {
        let not_found = || Error::NotFound(format!("gallery item {}", id));

        let entries = self.read_index().await?;
        let entry = entries
            .into_iter()
            .find(|entry| entry.id == id)
            .ok_or_else(not_found)?;

        let image_bytes = self
            .cdn
            .read_file(&blob_key(id))
            .await
            .map_err(unavailable)?
            .ok_or_else(not_found)?;

        Ok(GalleryItem {
            id: entry.id,
            image_bytes,
            mime_type: entry.mime_type,
            caption: entry.caption,
            created_at: entry.created_at,
        })
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdn::MockCdnClient;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn item_at(offset_secs: i64, caption: &str) -> GalleryItem {
        GalleryItem::with_timestamp(
            format!("png-{}", caption).into_bytes(),
            "image/png",
            Some(caption.to_string()),
            Utc::now() + Duration::seconds(offset_secs),
        )
    }

    #[tokio::test]
    async fn test_append_writes_blob_and_index() {
        let cdn = MockCdnClient::new();
        let gallery = BlobGallery::new(cdn.clone(), 2);
        let item = item_at(0, "A");

        let entries = gallery.append(item.clone()).await.unwrap();

        assert_eq!(entries, vec![item.entry()]);
        let files = cdn.get_files();
        assert_eq!(files.get(&format!("gallery/{}", item.id)), Some(&b"png-A".to_vec()));
        let index: Vec<GalleryEntry> = serde_json::from_slice(&files[INDEX_KEY]).unwrap();
        assert_eq!(index, entries);
    }

    #[tokio::test]
    async fn test_full_store_evicts_oldest_blob() {
        let cdn = MockCdnClient::new();
        let gallery = BlobGallery::new(cdn.clone(), 2);
        let a = item_at(0, "A");
        let b = item_at(1, "B");
        let c = item_at(2, "C");
        gallery.append(a.clone()).await.unwrap();
        gallery.append(b.clone()).await.unwrap();

        let entries = gallery.append(c.clone()).await.unwrap();

        let ids: Vec<_> = entries.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec![c.id.clone(), b.id.clone()]);
        assert!(!cdn.get_files().contains_key(&format!("gallery/{}", a.id)));
        assert_eq!(cdn.get_delete_count(), 1);
        assert!(matches!(gallery.get(&a.id).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_round_trips_item() {
        let gallery = BlobGallery::new(MockCdnClient::new(), 3);
        let item = item_at(0, "fox");
        gallery.append(item.clone()).await.unwrap();

        assert_eq!(gallery.get(&item.id).await.unwrap(), item);
    }

    #[tokio::test]
    async fn test_missing_index_lists_empty() {
        let gallery = BlobGallery::new(MockCdnClient::new(), 3);
        assert!(gallery.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_index_starts_fresh() {
        let cdn = MockCdnClient::new().with_file(INDEX_KEY, b"not json".to_vec());
        let gallery = BlobGallery::new(cdn, 3);

        assert!(gallery.list().await.unwrap().is_empty());
        let entries = gallery.append(item_at(0, "new")).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_storage_failure_is_store_unavailable() {
        let gallery = BlobGallery::new(MockCdnClient::new().with_failing_reads(), 3);

        assert!(matches!(
            gallery.list().await,
            Err(Error::StoreUnavailable(_))
        ));
        assert!(matches!(
            gallery.append(item_at(0, "x")).await,
            Err(Error::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_eviction_delete_is_not_surfaced() {
        let cdn = MockCdnClient::new().with_failing_deletes();
        let gallery = BlobGallery::new(cdn.clone(), 1);
        gallery.append(item_at(0, "old")).await.unwrap();

        let entries = gallery.append(item_at(1, "new")).await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].caption.as_deref(), Some("new"));
        assert_eq!(cdn.get_delete_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_index_consistent() {
        let cdn = MockCdnClient::new();
        let gallery = Arc::new(BlobGallery::new(cdn.clone(), 3));

        let handles: Vec<_> = (0..10)
            .map(|n| {
                let gallery = gallery.clone();
                tokio::spawn(async move { gallery.append(item_at(n, &n.to_string())).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let entries = gallery.list().await.unwrap();
        assert_eq!(entries.len(), 3);
        // Index plus exactly one blob per surviving entry
        assert_eq!(cdn.get_files().len(), 4);
    }
}
