//! Compression step - bounds image size before upload
//!
//! Includes:
//! - Sub-threshold bypass (small inputs are returned unchanged)
//! - Proportional downscale so neither dimension exceeds the maximum
//! - Quality-bounded JPEG re-encode
//! - Fallback to the original bytes on any failure or exceeded time budget
//!
//! Compression is an optimization, never a correctness requirement: no
//! failure here is surfaced to the caller beyond a log line.

use crate::common::{
    COMPRESS_BYPASS_BYTES, DEFAULT_COMPRESSION_BUDGET, DEFAULT_JPEG_QUALITY,
    DEFAULT_MAX_DIMENSION,
};
use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::spawn_blocking;
use tokio::time::timeout;

#[derive(Debug, Clone)]
pub struct CompressionSettings {
    pub max_dimension: u32,
    pub jpeg_quality: u8,
    pub bypass_below_bytes: usize,
    pub budget: Duration,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            bypass_below_bytes: COMPRESS_BYPASS_BYTES,
            budget: DEFAULT_COMPRESSION_BUDGET,
        }
    }
}

/// Which path the compression step took; the bytes are usable either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionOutcome {
    /// Input was below the bypass threshold and returned unchanged.
    Bypassed,
    /// Input was re-encoded and the result is strictly smaller.
    Compressed,
    /// Decode/encode failed, the budget was exceeded, or the re-encode was
    /// not smaller; the original bytes were kept.
    KeptOriginal,
}

// ────────────────────────────────────────────────────────────────
// Public API
// ────────────────────────────────────────────────────────────────

/// Produce an image no larger in byte size than `source`.
///
/// This never fails: every failure mode resolves to returning the original
/// bytes so a slow or corrupt compression cannot block the upload pipeline.
pub async fn compress_image(
    source: Arc<Vec<u8>>,
    settings: &CompressionSettings,
) -> (Arc<Vec<u8>>, CompressionOutcome) {
    if source.len() < settings.bypass_below_bytes {
        return (source, CompressionOutcome::Bypassed);
    }

    let input = Arc::clone(&source);
    let max_dimension = settings.max_dimension;
    let quality = settings.jpeg_quality;
    let job = spawn_blocking(move || encode_bounded_jpeg(&input, max_dimension, quality));

    match timeout(settings.budget, job).await {
        Ok(Ok(Ok(encoded))) if encoded.len() < source.len() => {
            debug!(
                "compressed {} bytes down to {}",
                source.len(),
                encoded.len()
            );
            (Arc::new(encoded), CompressionOutcome::Compressed)
        }
        Ok(Ok(Ok(encoded))) => {
            debug!(
                "re-encode produced {} bytes for a {}-byte input, keeping original",
                encoded.len(),
                source.len()
            );
            (source, CompressionOutcome::KeptOriginal)
        }
        Ok(Ok(Err(error))) => {
            warn!("compression failed, keeping original: {error:#}");
            (source, CompressionOutcome::KeptOriginal)
        }
        Ok(Err(join_error)) => {
            warn!("compression task aborted, keeping original: {join_error}");
            (source, CompressionOutcome::KeptOriginal)
        }
        Err(_) => {
            warn!(
                "compression exceeded the {:?} budget, keeping original",
                settings.budget
            );
            (source, CompressionOutcome::KeptOriginal)
        }
    }
}

// ────────────────────────────────────────────────────────────────
// Encoding
// ────────────────────────────────────────────────────────────────

fn encode_bounded_jpeg(bytes: &[u8], max_dimension: u32, quality: u8) -> Result<Vec<u8>> {
    let decoded =
        image::load_from_memory(bytes).context("failed to decode image from memory")?;

    let (width, height) = (decoded.width(), decoded.height());
    let (target_width, target_height) = fit_within(width, height, max_dimension);

    let rgb = if (target_width, target_height) == (width, height) {
        decoded.to_rgb8()
    } else {
        decoded.thumbnail_exact(target_width, target_height).to_rgb8()
    };

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    rgb.write_with_encoder(encoder)
        .context("failed to encode JPEG")?;
    Ok(out)
}

// ────────────────────────────────────────────────────────────────
// Helper Functions
// ────────────────────────────────────────────────────────────────

/// Resize dimensions so the longer side is clamped to `max_dimension`,
/// preserving aspect ratio. Dimensions already within bounds are unchanged.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width.max(height) <= max_dimension {
        return (width, height);
    }
    if width >= height {
        let scaled = (height as u64 * max_dimension as u64 / width as u64).max(1);
        (max_dimension, scaled as u32)
    } else {
        let scaled = (width as u64 * max_dimension as u64 / height as u64).max(1);
        (scaled as u32, max_dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use rand::Rng;
    use std::io::Cursor;

    fn png_bytes(image: RgbImage) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn jpeg_bytes(image: RgbImage, quality: u8) -> Vec<u8> {
        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut out, quality);
        image.write_with_encoder(encoder).unwrap();
        out
    }

    /// Noise compresses poorly, which keeps the encoded file comfortably
    /// above the bypass threshold.
    fn noise_image(width: u32, height: u32) -> RgbImage {
        let mut rng = rand::rng();
        RgbImage::from_fn(width, height, |_, _| {
            Rgb([rng.random(), rng.random(), rng.random()])
        })
    }

    fn noise_png(width: u32, height: u32) -> Vec<u8> {
        png_bytes(noise_image(width, height))
    }

    #[tokio::test]
    async fn small_input_bypasses_compression_unchanged() {
        let source = Arc::new(png_bytes(RgbImage::from_pixel(16, 16, Rgb([10, 20, 30]))));
        assert!(source.len() < COMPRESS_BYPASS_BYTES);

        let (out, outcome) = compress_image(Arc::clone(&source), &CompressionSettings::default()).await;

        assert_eq!(outcome, CompressionOutcome::Bypassed);
        assert_eq!(*out, *source);
    }

    #[tokio::test]
    async fn large_input_is_resized_and_smaller() {
        let source = Arc::new(noise_png(2600, 1400));
        assert!(source.len() >= COMPRESS_BYPASS_BYTES);

        let settings = CompressionSettings::default();
        let (out, outcome) = compress_image(Arc::clone(&source), &settings).await;

        assert_eq!(outcome, CompressionOutcome::Compressed);
        assert!(out.len() < source.len());

        let decoded = image::load_from_memory(&out).unwrap();
        let expected = fit_within(2600, 1400, settings.max_dimension);
        assert_eq!((decoded.width(), decoded.height()), expected);
        assert!(decoded.width().max(decoded.height()) <= settings.max_dimension);
    }

    #[tokio::test]
    async fn re_encode_that_is_not_smaller_keeps_original() {
        // A quality-80 JPEG already within the dimension bound; re-encoding
        // it at quality 100 can only grow it, so the original must win.
        let source = Arc::new(jpeg_bytes(noise_image(1800, 1500), 80));
        assert!(source.len() >= COMPRESS_BYPASS_BYTES);

        let settings = CompressionSettings {
            jpeg_quality: 100,
            ..CompressionSettings::default()
        };
        let (out, outcome) = compress_image(Arc::clone(&source), &settings).await;

        assert_eq!(outcome, CompressionOutcome::KeptOriginal);
        assert_eq!(*out, *source);
    }

    #[tokio::test]
    async fn undecodable_input_keeps_original() {
        let mut rng = rand::rng();
        let garbage: Vec<u8> = (0..600 * 1024).map(|_| rng.random()).collect();
        let source = Arc::new(garbage);

        let (out, outcome) = compress_image(Arc::clone(&source), &CompressionSettings::default()).await;

        assert_eq!(outcome, CompressionOutcome::KeptOriginal);
        assert_eq!(*out, *source);
    }

    #[tokio::test]
    async fn exceeded_budget_keeps_original() {
        let source = Arc::new(noise_png(2600, 1400));
        let settings = CompressionSettings {
            budget: Duration::ZERO,
            ..CompressionSettings::default()
        };

        let (out, outcome) = compress_image(Arc::clone(&source), &settings).await;

        assert_eq!(outcome, CompressionOutcome::KeptOriginal);
        assert_eq!(*out, *source);
    }

    #[test]
    fn fit_within_clamps_longer_side() {
        assert_eq!(fit_within(800, 600, 1920), (800, 600));
        assert_eq!(fit_within(3840, 2160, 1920), (1920, 1080));
        assert_eq!(fit_within(2160, 3840, 1920), (1080, 1920));
        assert_eq!(fit_within(4000, 1, 1920), (1920, 1));
    }
}
