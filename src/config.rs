//! Environment-driven configuration.
//!
//! Values are read from a `.env` file (if present) and the process
//! environment, prefixed with `LISTING_` (e.g. `LISTING_STORAGE_ENDPOINT`).

use crate::common::{
    COMPRESS_BYPASS_BYTES, DEFAULT_COMPRESSION_BUDGET, DEFAULT_JPEG_QUALITY,
    DEFAULT_MAX_DIMENSION, MAX_IMAGES_PER_LISTING,
};
use crate::operations::compression::CompressionSettings;
use crate::queue::QueueSettings;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// URL of the external object-storage upload endpoint.
    pub storage_endpoint: String,

    #[serde(default = "default_container")]
    pub storage_container: String,

    /// Bearer token of the acting user; uploads refuse to start without one.
    #[serde(default)]
    pub session_token: Option<String>,

    #[serde(default = "default_preview_dir")]
    pub preview_dir: PathBuf,

    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    #[serde(default = "default_compression_budget_secs")]
    pub compression_budget_secs: u64,
}

fn default_container() -> String {
    "listing-images".to_string()
}

fn default_preview_dir() -> PathBuf {
    PathBuf::from("./preview")
}

fn default_max_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_compression_budget_secs() -> u64 {
    DEFAULT_COMPRESSION_BUDGET.as_secs()
}

impl IngestConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        envy::prefixed("LISTING_")
            .from_env()
            .context("failed to read LISTING_* configuration from environment")
    }

    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings {
            container: self.storage_container.clone(),
            preview_dir: self.preview_dir.clone(),
            compression: CompressionSettings {
                max_dimension: self.max_dimension,
                jpeg_quality: self.jpeg_quality,
                bypass_below_bytes: COMPRESS_BYPASS_BYTES,
                budget: Duration::from_secs(self.compression_budget_secs),
            },
            max_images: MAX_IMAGES_PER_LISTING,
        }
    }
}
