use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutoflightError {
    #[error("Security check failed: {0}")]
    Security(#[from] SecurityError),

    #[error("Image load failed: {0}")]
    ImageLoad(#[from] ImageLoadError),

    #[error("Stitching failed: {0}")]
    Stitching(#[from] StitchingError),

    #[error("Output failed: {0}")]
    Output(#[from] OutputError),

    #[error("Invalid options: {0}")]
    Validation(#[from] ValidationError),
}

/// Fatal conditions raised by the validation gate.
#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("Path traversal detected: {path} resolves outside of {base}")]
    PathTraversal { path: PathBuf, base: PathBuf },

    #[error("Invalid path {path}: {source}")]
    InvalidPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File count ({count}) exceeds limit ({limit})")]
    FileCountExceeded { count: usize, limit: usize },
}

#[derive(Error, Debug)]
pub enum ImageLoadError {
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File size ({size} bytes) exceeds limit ({limit} bytes): {path}")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("Image dimensions ({width}x{height}) exceed limit ({limit} pixels): {path}")]
    DimensionsTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        limit: u64,
    },

    #[error("Insufficient images: {found} valid, at least {required} required")]
    InsufficientImages { found: usize, required: usize },
}

impl ImageLoadError {
    /// Path of the offending file, for per-file failures.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Decode { path, .. }
            | Self::Io { path, .. }
            | Self::FileTooLarge { path, .. }
            | Self::DimensionsTooLarge { path, .. } => Some(path),
            Self::InsufficientImages { .. } => None,
        }
    }
}

/// Classified failure of the stitching engine. The category is preserved
/// from the engine's status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StitchingError {
    #[error("Need more images with sufficient overlap")]
    NeedMoreImages,

    #[error("Homography estimation failed - images may not overlap sufficiently")]
    HomographyEstimationFailed,

    #[error("Camera parameter adjustment failed")]
    CameraParamsAdjustFailed,

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Stitching produced no output")]
    EmptyOutput,

    #[error("No images provided for stitching")]
    NoImages,
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Unsupported output format {extension:?}: {path}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot save an empty image")]
    EmptyImage,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("JPEG quality must be 1-100, got {0}")]
    QualityOutOfRange(i64),

    #[error("PNG compression must be 0-9, got {0}")]
    PngLevelOutOfRange(i64),

    #[error("Invalid stitching mode: {0}. Use 'panorama' or 'scans'")]
    UnknownMode(String),

    #[error("max_workers must be at least 1")]
    ZeroWorkers,

    #[error("Input directory does not exist: {0}")]
    MissingInput(PathBuf),

    #[error("Input path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Invalid value {value:?} for {var}")]
    InvalidEnv { var: String, value: String },
}

pub type Result<T> = std::result::Result<T, AutoflightError>;
