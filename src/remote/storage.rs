//! Remote object-storage collaborator.
//!
//! The endpoint is opaque to the pipeline: it accepts a binary plus a target
//! container name and answers with a success flag and a public URL, or an
//! error message. No retries are performed here; retry is a user action on
//! the queue entry.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` in `container` and return the public URL.
    async fn put_object(&self, container: &str, file_name: &str, bytes: &[u8])
    -> Result<String>;
}

#[async_trait]
impl<T: ObjectStorage> ObjectStorage for Arc<T> {
    async fn put_object(
        &self,
        container: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String> {
        (**self).put_object(container, file_name, bytes).await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageResponse {
    success: bool,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP implementation posting a multipart form to the upload endpoint.
#[derive(Debug, Clone)]
pub struct HttpObjectStorage {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpObjectStorage {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn put_object(
        &self,
        container: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")
            .context("failed to build multipart file part")?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("container", container.to_string());

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .context("failed to reach storage endpoint")?;

        let status = response.status();
        if !status.is_success() {
            bail!("storage endpoint returned {status}");
        }

        let body: StorageResponse = response
            .json()
            .await
            .context("failed to parse storage endpoint response")?;

        match (body.success, body.url) {
            (true, Some(url)) => Ok(url),
            _ => Err(anyhow!(
                body.error
                    .unwrap_or_else(|| "storage endpoint reported failure".to_string())
            )),
        }
    }
}
