use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_IMAGE_PIXELS};
use crate::error::{ImageLoadError, Result, SecurityError, ValidationError};

/// Resource ceilings applied to every run. Read-only once a run starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityLimits {
    pub max_file_size_bytes: u64,
    pub max_image_pixels: u64,
    pub max_file_count: usize,
}

impl Default for SecurityLimits {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
            max_image_pixels: DEFAULT_MAX_IMAGE_PIXELS,
            max_file_count: DEFAULT_MAX_FILES,
        }
    }
}

/// Reject a file whose on-disk size exceeds the limit.
pub fn validate_file_size(
    path: &Path,
    size: u64,
    limits: &SecurityLimits,
) -> std::result::Result<(), ImageLoadError> {
    if size > limits.max_file_size_bytes {
        return Err(ImageLoadError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            limit: limits.max_file_size_bytes,
        });
    }
    debug!(path = %path.display(), size, "File size validated");
    Ok(())
}

/// Reject a decoded image whose pixel count exceeds the limit.
pub fn validate_image_dimensions(
    path: &Path,
    width: u32,
    height: u32,
    limits: &SecurityLimits,
) -> std::result::Result<(), ImageLoadError> {
    let pixels = u64::from(width) * u64::from(height);
    if pixels > limits.max_image_pixels {
        return Err(ImageLoadError::DimensionsTooLarge {
            path: path.to_path_buf(),
            width,
            height,
            limit: limits.max_image_pixels,
        });
    }
    Ok(())
}

/// Reject a candidate set larger than the configured count limit.
pub fn validate_file_count(
    count: usize,
    limits: &SecurityLimits,
) -> std::result::Result<(), SecurityError> {
    if count > limits.max_file_count {
        return Err(SecurityError::FileCountExceeded {
            count,
            limit: limits.max_file_count,
        });
    }
    debug!(count, "File count validated");
    Ok(())
}

/// Ensure a resolved candidate path stays inside the canonical input directory.
///
/// `resolved` is the candidate with symlinks followed, so a link whose target
/// lives outside `base` is rejected.
pub fn validate_path_security(
    path: &Path,
    resolved: &Path,
    base: &Path,
) -> std::result::Result<(), SecurityError> {
    if !resolved.is_absolute() || !resolved.starts_with(base) {
        return Err(SecurityError::PathTraversal {
            path: path.to_path_buf(),
            base: base.to_path_buf(),
        });
    }
    debug!(path = %path.display(), resolved = %resolved.display(), "Path security validated");
    Ok(())
}

/// Check that the input exists and is a directory, then return its canonical form.
pub fn validate_input_dir(dir: &Path) -> Result<PathBuf> {
    if !dir.exists() {
        return Err(ValidationError::MissingInput(dir.to_path_buf()).into());
    }
    if !dir.is_dir() {
        return Err(ValidationError::NotADirectory(dir.to_path_buf()).into());
    }
    let canonical = dir
        .canonicalize()
        .map_err(|source| SecurityError::InvalidPath {
            path: dir.to_path_buf(),
            source,
        })?;
    Ok(canonical)
}
