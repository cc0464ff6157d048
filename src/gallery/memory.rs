use super::{insert_and_trim, GalleryEntry, GalleryItem, GalleryStore};
use crate::{Error, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Process-local gallery. Contents are lost on restart.
pub struct MemoryGallery {
    items: Mutex<Vec<GalleryItem>>,
    capacity: usize,
}

impl MemoryGallery {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }
}

#[async_trait]
impl GalleryStore for MemoryGallery {
    async fn append(&self, item: GalleryItem) -> Result<Vec<GalleryEntry>> {
        let mut items = self.items.lock().await;
        let evicted = insert_and_trim(&mut *items, item, self.capacity, |i| i.created_at);
        for old in &evicted {
            tracing::debug!("Evicted gallery item {}", old.id);
        }
        Ok(items.iter().map(GalleryItem::entry).collect())
    }

    async fn list(&self) -> Result<Vec<GalleryEntry>> {
        let items = self.items.lock().await;
        Ok(items.iter().map(GalleryItem::entry).collect())
    }

    async fn get(&self, id: &str) -> Result<GalleryItem> {
        let items = self.items.lock().await;
        items
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("gallery item {}", id)))
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
