use super::CdnService;
use crate::{Error, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{config::Region, Client as S3Client};

pub struct CdnClient {
    client: S3Client,
    bucket: String,
}

impl CdnClient {
    pub async fn new(
        access_key_id: String,
        secret_access_key: String,
        endpoint: String,
        bucket: String,
    ) -> Result<Self> {
        let credentials = aws_sdk_s3::config::Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "digital-ocean-spaces",
        );

        // Spaces ignores the region but the SDK requires one
        let config = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new("us-east-1"))
            .endpoint_url(endpoint)
            .load()
            .await;

        let client = S3Client::new(&config);

        tracing::info!("Gallery storage bucket: {}", bucket);

        Ok(Self { client, bucket })
    }
}

#[async_trait]
impl CdnService for CdnClient {
    async fn upload_file(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        let body = ByteStream::from(data.to_vec());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Failed to upload {}: {}", key, e)))?;

        tracing::debug!("Uploaded {} ({} bytes)", key, data.len());
        Ok(())
    }

    async fn read_file(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }
                return Err(Error::Storage(format!(
                    "Failed to read {}: {}",
                    key, service_error
                )));
            }
        };

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Storage(format!("Failed to read body of {}: {}", key, e)))?;

        Ok(Some(bytes.to_vec()))
    }

    async fn delete_file(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Failed to delete {}: {}", key, e)))?;

        Ok(())
    }
}
