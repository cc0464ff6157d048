use super::CdnService;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MockCdnClient {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    upload_count: Arc<Mutex<usize>>,
    read_count: Arc<Mutex<usize>>,
    delete_count: Arc<Mutex<usize>>,
    fail_uploads: bool,
    fail_reads: bool,
    fail_deletes: bool,
}

impl MockCdnClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, key: &str, content: Vec<u8>) -> Self {
        self.files.lock().unwrap().insert(key.to_string(), content);
        self
    }

    pub fn with_failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    pub fn with_failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn with_failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn get_upload_count(&self) -> usize {
        *self.upload_count.lock().unwrap()
    }

    pub fn get_read_count(&self) -> usize {
        *self.read_count.lock().unwrap()
    }

    pub fn get_delete_count(&self) -> usize {
        *self.delete_count.lock().unwrap()
    }

    pub fn get_files(&self) -> HashMap<String, Vec<u8>> {
        self.files.lock().unwrap().clone()
    }
}

#[async_trait]
impl CdnService for MockCdnClient {
    async fn upload_file(&self, key: &str, data: &[u8], _content_type: &str) -> Result<()> {
        *self.upload_count.lock().unwrap() += 1;

        if self.fail_uploads {
            return Err(Error::Storage(format!("Upload of {} refused", key)));
        }

        self.files
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn read_file(&self, key: &str) -> Result<Option<Vec<u8>>> {
        *self.read_count.lock().unwrap() += 1;

        if self.fail_reads {
            return Err(Error::Storage(format!("Read of {} refused", key)));
        }

        Ok(self.files.lock().unwrap().get(key).cloned())
    }

    async fn delete_file(&self, key: &str) -> Result<()> {
        *self.delete_count.lock().unwrap() += 1;

        if self.fail_deletes {
            return Err(Error::Storage(format!("Delete of {} refused", key)));
        }

        self.files.lock().unwrap().remove(key);
        Ok(())
    }
}
