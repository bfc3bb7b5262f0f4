use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::CollaboratorError;
use crate::model::Category;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Durable home for proof images. Returns a retrievable URL. Failures here
/// never undo a verification; the caller keeps the task verified and warns
/// that the proof was not saved.
#[async_trait]
pub trait ProofStorage: Send + Sync {
    async fn store(
        &self,
        user_id: Uuid,
        category: Category,
        filename: &str,
        bytes: &[u8],
        mime: &str,
    ) -> Result<String, CollaboratorError>;
}

/// Object-storage bucket over HTTP (Supabase storage API shape).
pub struct BucketStorage {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl BucketStorage {
    pub fn new(settings: &Settings) -> Result<Self, CollaboratorError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: settings.supabase_url.trim_end_matches('/').to_string(),
            api_key: settings.supabase_key.clone(),
            bucket: settings.storage_bucket.clone(),
        })
    }

    fn object_path(&self, user_id: Uuid, category: Category, filename: &str) -> String {
        format!("{}/{}/{}", user_id, category.slug(), filename)
    }
}

#[async_trait]
impl ProofStorage for BucketStorage {
    async fn store(
        &self,
        user_id: Uuid,
        category: Category,
        filename: &str,
        bytes: &[u8],
        mime: &str,
    ) -> Result<String, CollaboratorError> {
        let path = self.object_path(user_id, category, filename);
        let upload_url = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path);

        self.http
            .post(&upload_url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", mime.to_string())
            .body(bytes.to_vec())
            .send()
            .await?
            .error_for_status()?;

        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        ))
    }
}

/// Degraded mode when no bucket is configured: the "URL" is the file itself,
/// data-encoded inline. Nothing leaves the machine.
pub struct InlineStorage;

#[async_trait]
impl ProofStorage for InlineStorage {
    async fn store(
        &self,
        _user_id: Uuid,
        _category: Category,
        _filename: &str,
        bytes: &[u8],
        mime: &str,
    ) -> Result<String, CollaboratorError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(format!("data:{};base64,{}", mime, encoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inline_storage_encodes_data_url() {
        let url = InlineStorage
            .store(Uuid::new_v4(), Category::Study, "proof.png", b"abc", "image/png")
            .await
            .unwrap();
        assert_eq!(url, "data:image/png;base64,YWJj");
    }
}
