pub mod phase_correlation;

use std::fmt;
use std::str::FromStr;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{StitchingError, ValidationError};
use crate::frame::LoadedImage;
use crate::pipeline::{PipelineStage, Progress};

pub use phase_correlation::PhaseCorrelationStitcher;

/// Alignment model requested from the stitching engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StitchMode {
    /// Perspective overlap, as in aerial surveys.
    #[default]
    Panorama,
    /// Roughly planar captures such as flat scans.
    Scans,
}

impl fmt::Display for StitchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Panorama => write!(f, "panorama"),
            Self::Scans => write!(f, "scans"),
        }
    }
}

impl FromStr for StitchMode {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "panorama" => Ok(Self::Panorama),
            "scans" => Ok(Self::Scans),
            other => Err(ValidationError::UnknownMode(other.to_string())),
        }
    }
}

/// Status reported by a stitching engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StitchStatus {
    Ok,
    NeedMoreImages,
    HomographyEstimationFailed,
    CameraParamsAdjustFailed,
    Failed(String),
}

/// Raw result of one engine invocation.
#[derive(Clone, Debug)]
pub struct StitchOutcome {
    pub status: StitchStatus,
    pub image: Option<RgbImage>,
}

impl StitchOutcome {
    pub fn success(image: RgbImage) -> Self {
        Self {
            status: StitchStatus::Ok,
            image: Some(image),
        }
    }

    pub fn failure(status: StitchStatus) -> Self {
        Self {
            status,
            image: None,
        }
    }
}

/// An external image stitching engine.
///
/// Invoked at most once per run, synchronously, with the images in lexical
/// filename order. Implementations report failure through the status rather
/// than panicking.
pub trait StitchEngine: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    fn stitch(&self, images: &[&RgbImage], mode: StitchMode) -> StitchOutcome;
}

/// Assembled mosaic plus metadata.
#[derive(Clone, Debug)]
pub struct StitchResult {
    pub image: RgbImage,
    /// Number of images handed to the engine (or 1 for a pass-through).
    pub image_count: usize,
    /// True when a single input was returned unchanged without stitching.
    pub passthrough: bool,
}

impl StitchResult {
    /// (width, height) of the assembled image.
    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Map an engine outcome onto the error taxonomy.
pub fn classify_outcome(outcome: StitchOutcome) -> Result<RgbImage, StitchingError> {
    match outcome.status {
        StitchStatus::Ok => match outcome.image {
            Some(image) if image.width() > 0 && image.height() > 0 => Ok(image),
            _ => Err(StitchingError::EmptyOutput),
        },
        StitchStatus::NeedMoreImages => Err(StitchingError::NeedMoreImages),
        StitchStatus::HomographyEstimationFailed => Err(StitchingError::HomographyEstimationFailed),
        StitchStatus::CameraParamsAdjustFailed => Err(StitchingError::CameraParamsAdjustFailed),
        StitchStatus::Failed(detail) => Err(StitchingError::Engine(detail)),
    }
}

/// Stitch the loaded images into one mosaic.
///
/// A single image is returned unchanged and the engine is not called.
/// Otherwise the engine runs exactly once; its failure is terminal.
pub fn stitch_images(
    images: Vec<LoadedImage>,
    mode: StitchMode,
    engine: &dyn StitchEngine,
    progress: &Progress,
) -> Result<StitchResult, StitchingError> {
    let count = images.len();
    if count == 0 {
        return Err(StitchingError::NoImages);
    }

    if count == 1 {
        warn!("Only one image provided, returning without stitching");
        progress.finish(PipelineStage::Stitching, || {
            "Single image - no stitching needed".to_string()
        });
        let image = images
            .into_iter()
            .next()
            .map(|loaded| loaded.pixels)
            .ok_or(StitchingError::NoImages)?;
        return Ok(StitchResult {
            image,
            image_count: 1,
            passthrough: true,
        });
    }

    info!(count, %mode, engine = engine.name(), "Stitching images");
    progress.begin(PipelineStage::Stitching, || {
        format!("Stitching {count} images ({mode})")
    });

    let buffers: Vec<&RgbImage> = images.iter().map(|loaded| &loaded.pixels).collect();
    let outcome = engine.stitch(&buffers, mode);

    match classify_outcome(outcome) {
        Ok(image) => {
            let (width, height) = image.dimensions();
            info!(width, height, "Stitching complete");
            progress.finish(PipelineStage::Stitching, || {
                format!("Stitched {width}x{height} mosaic")
            });
            Ok(StitchResult {
                image,
                image_count: count,
                passthrough: false,
            })
        }
        Err(err) => {
            progress.finish(PipelineStage::Stitching, || format!("Stitching failed: {err}"));
            Err(err)
        }
    }
}
