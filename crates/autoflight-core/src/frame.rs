use std::fmt;
use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::consts::SUPPORTED_EXTENSIONS;

/// Format tag inferred from a candidate's extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormatTag {
    Jpeg,
    Png,
    Tiff,
}

impl ImageFormatTag {
    /// Infer the tag from a path's extension (case-insensitive).
    /// Returns `None` for anything outside the supported set.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return None;
        }
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }
}

impl fmt::Display for ImageFormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg => write!(f, "JPEG"),
            Self::Png => write!(f, "PNG"),
            Self::Tiff => write!(f, "TIFF"),
        }
    }
}

/// A file discovered by the validation gate, before decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageCandidate {
    /// Path as listed in the input directory.
    pub path: PathBuf,
    /// Canonical path, guaranteed to live inside the canonical input directory.
    pub resolved: PathBuf,
    pub format: ImageFormatTag,
    /// On-disk size at scan time, in bytes.
    pub size_bytes: u64,
}

impl ImageCandidate {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A decoded 8-bit RGB image owned by a single run.
#[derive(Clone, Debug)]
pub struct LoadedImage {
    pub path: PathBuf,
    pub pixels: RgbImage,
}

impl LoadedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Decoded images are always normalized to three channels.
    pub fn channels(&self) -> u8 {
        3
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }
}

/// Why a candidate was dropped from the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    FileTooLarge { size: u64, limit: u64 },
    DimensionsTooLarge { width: u32, height: u32, limit: u64 },
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileTooLarge { size, limit } => {
                write!(f, "file size {size} bytes exceeds {limit}")
            }
            Self::DimensionsTooLarge {
                width,
                height,
                limit,
            } => write!(f, "{width}x{height} exceeds {limit} pixels"),
            Self::Unreadable(msg) => write!(f, "unreadable: {msg}"),
        }
    }
}

/// A candidate that was excluded without failing the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}
