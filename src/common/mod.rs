use std::path::Path;
use std::time::Duration;

/// Inputs below this byte size bypass compression entirely.
pub const COMPRESS_BYPASS_BYTES: usize = 500 * 1024;

/// Neither dimension of a compressed image exceeds this.
pub const DEFAULT_MAX_DIMENSION: u32 = 1920;

pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Wall-clock budget for one compression attempt.
pub const DEFAULT_COMPRESSION_BUDGET: Duration = Duration::from_secs(10);

/// Longest side of the on-disk preview thumbnail.
pub const PREVIEW_MAX_DIMENSION: u32 = 320;

pub const MAX_IMAGES_PER_LISTING: usize = 10;

pub const VALID_IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "jfif", "jpe", "png", "tif", "tiff", "webp", "bmp",
];

/// Whether `file_name` carries an accepted image extension. The comparison is
/// case-insensitive; a name without an extension is rejected.
pub fn is_accepted_image(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            VALID_IMAGE_EXTENSIONS
                .iter()
                .any(|accepted| accepted.eq_ignore_ascii_case(extension))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_extensions_case_insensitively() {
        assert!(is_accepted_image("photo.jpg"));
        assert!(is_accepted_image("photo.JPG"));
        assert!(is_accepted_image("scan.WebP"));
        assert!(is_accepted_image("archive.tar.png"));
    }

    #[test]
    fn rejects_other_files() {
        assert!(!is_accepted_image("manual.pdf"));
        assert!(!is_accepted_image("no-extension"));
        assert!(!is_accepted_image("trailing-dot."));
        assert!(!is_accepted_image(""));
    }
}
