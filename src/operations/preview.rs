//! File-backed previews for queued images.
//!
//! Each entry gets a small JPEG thumbnail on disk so the form can display it
//! while the upload is pending. Previews are released the moment the entry is
//! removed so repeated add/remove cycles leave nothing behind.

use crate::common::PREVIEW_MAX_DIMENSION;
use crate::operations::compression::fit_within;
use anyhow::{Context, Result};
use image::ImageFormat;
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug)]
pub struct PreviewHandle {
    path: PathBuf,
}

impl PreviewHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the preview file. Failure is logged, not propagated; a stale
    /// preview must never block removing the entry itself.
    pub fn release(self) {
        if let Err(error) = fs::remove_file(&self.path) {
            warn!("failed to delete preview {:?}: {error}", self.path);
        }
    }
}

/// Decode `bytes` and persist a thumbnail under `preview_dir`, named by the
/// entry id.
pub fn generate_preview(bytes: &[u8], preview_dir: &Path, id: Uuid) -> Result<PreviewHandle> {
    let decoded = image::load_from_memory(bytes).context("failed to decode image for preview")?;

    let (width, height) = fit_within(decoded.width(), decoded.height(), PREVIEW_MAX_DIMENSION);
    let thumbnail = decoded.thumbnail_exact(width, height).to_rgb8();

    fs::create_dir_all(preview_dir)
        .context(format!("failed to create preview directory {:?}", preview_dir))?;

    let path = preview_dir.join(format!("{id}.jpg"));
    thumbnail
        .save_with_format(&path, ImageFormat::Jpeg)
        .context(format!("failed to save preview to {:?}", path))?;

    Ok(PreviewHandle { path })
}
