/// Media host client
///
/// Avatar and cover images are stored on an external media host; the user
/// record only keeps the returned URL.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::configuration::MediaSettings;
use crate::error::AppError;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UploadedMedia {
    /// Absent when the host accepted the request but stored nothing
    pub url: Option<String>,
}

#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, data: Vec<u8>, content_type: &str) -> Result<UploadedMedia, AppError>;
}

#[derive(Clone)]
pub struct HttpMediaUploader {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpMediaUploader {
    pub fn new(settings: &MediaSettings) -> Result<Self, AppError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_milliseconds))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build media client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }
}

#[async_trait]
impl MediaUploader for HttpMediaUploader {
    async fn upload(&self, data: Vec<u8>, content_type: &str) -> Result<UploadedMedia, AppError> {
        let url = format!("{}/upload", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to reach media host: {}", e);
                AppError::Internal(format!("Media upload failed: {}", e))
            })?
            .error_for_status()
            .map_err(|e| {
                tracing::error!("Media host returned error: {}", e);
                AppError::Internal(format!("Media host error: {}", e))
            })?;

        response
            .json::<UploadedMedia>()
            .await
            .map_err(|e| AppError::Internal(format!("Invalid media host response: {}", e)))
    }
}
