//! Object storage for gallery persistence
//!
//! Keyed blob upload/read/delete against S3-compatible storage
//! (DigitalOcean Spaces), plus an in-memory mock.

pub mod client;
pub mod mock;

pub use client::CdnClient;
pub use mock::MockCdnClient;

use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CdnService: Send + Sync {
    async fn upload_file(&self, key: &str, data: &[u8], content_type: &str) -> Result<()>;
    /// Returns `None` when no object exists under `key`.
    async fn read_file(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn delete_file(&self, key: &str) -> Result<()>;
}
