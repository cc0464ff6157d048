//! Bounded recent-items gallery
//!
//! Every image-producing request feeds its result here. The store never holds
//! more than its capacity; the oldest entries are evicted first and reads are
//! newest-first.

pub mod blob;
pub mod memory;

pub use blob::BlobGallery;
pub use memory::MemoryGallery;

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 7;

/// A stored image with its caption.
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryItem {
    pub id: String,
    pub image_bytes: Vec<u8>,
    pub mime_type: String,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GalleryItem {
    pub fn new(image_bytes: Vec<u8>, mime_type: impl Into<String>, caption: Option<String>) -> Self {
        Self::with_timestamp(image_bytes, mime_type, caption, Utc::now())
    }

    pub fn with_timestamp(
        image_bytes: Vec<u8>,
        mime_type: impl Into<String>,
        caption: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: generate_id(created_at),
            image_bytes,
            mime_type: mime_type.into(),
            caption: caption.filter(|c| !c.trim().is_empty()),
            created_at,
        }
    }

    pub fn entry(&self) -> GalleryEntry {
        GalleryEntry {
            id: self.id.clone(),
            mime_type: self.mime_type.clone(),
            caption: self.caption.clone(),
            created_at: self.created_at,
        }
    }
}

/// Listing view of a gallery item, without the image bytes.
///
/// This is also the on-disk shape of the blob backend's index file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryEntry {
    pub id: String,
    pub mime_type: String,
    #[serde(default)]
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// `img-{unix_millis}-{7 base36 chars}`
fn generate_id(created_at: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("img-{}-{}", created_at.timestamp_millis(), suffix)
}

/// Insert keeping newest-first order, then cut the list back to `capacity`.
///
/// Returns whatever fell off the end. Items with equal timestamps keep
/// insertion order, newest insert first.
pub(crate) fn insert_and_trim<T>(
    items: &mut Vec<T>,
    item: T,
    capacity: usize,
    created_at: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let stamp = created_at(&item);
    let position = items
        .iter()
        .position(|existing| created_at(existing) <= stamp)
        .unwrap_or(items.len());
    items.insert(position, item);

    if items.len() > capacity {
        items.split_off(capacity)
    } else {
        Vec::new()
    }
}

#[async_trait]
pub trait GalleryStore: Send + Sync {
    /// Store `item` and return the listing after eviction, newest-first.
    async fn append(&self, item: GalleryItem) -> Result<Vec<GalleryEntry>>;
    async fn list(&self) -> Result<Vec<GalleryEntry>>;
    async fn get(&self, id: &str) -> Result<GalleryItem>;
    fn capacity(&self) -> usize;
}
