use std::sync::{mpsc, Mutex, PoisonError};

use image::ImageReader;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{ImageLoadError, Result};
use crate::frame::{ImageCandidate, LoadedImage, SkipReason, SkippedFile};
use crate::pipeline::config::RunConfig;
use crate::pipeline::{PipelineStage, Progress};
use crate::security::{validate_file_size, validate_image_dimensions, SecurityLimits};

use super::ensure_enough_images;
use super::scan::GateReport;

/// Images that survived intake, in lexical filename order.
#[derive(Clone, Debug)]
pub struct IntakeReport {
    pub images: Vec<LoadedImage>,
    pub skipped: Vec<SkippedFile>,
}

/// Load and check a single candidate.
///
/// The on-disk size is re-checked at load time, and the header dimensions are
/// checked before any pixel data is decoded. Output is always 8-bit RGB.
pub fn load_single_image(
    candidate: &ImageCandidate,
    limits: &SecurityLimits,
) -> std::result::Result<LoadedImage, ImageLoadError> {
    let path = &candidate.resolved;
    let io_err = |source| ImageLoadError::Io {
        path: candidate.path.clone(),
        source,
    };
    let decode_err = |source| ImageLoadError::Decode {
        path: candidate.path.clone(),
        source,
    };

    let size = std::fs::metadata(path).map_err(io_err)?.len();
    validate_file_size(&candidate.path, size, limits)?;

    let (width, height) = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(io_err)?
        .into_dimensions()
        .map_err(decode_err)?;
    validate_image_dimensions(&candidate.path, width, height, limits)?;

    debug!(path = %candidate.path.display(), width, height, "Decoding image");
    let decoded = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(io_err)?
        .decode()
        .map_err(decode_err)?;

    // Header and pixel data can disagree on malformed files.
    validate_image_dimensions(&candidate.path, decoded.width(), decoded.height(), limits)?;

    Ok(LoadedImage {
        path: candidate.path.clone(),
        pixels: decoded.into_rgb8(),
    })
}

/// Load every candidate accepted by the gate.
///
/// With `config.parallel` and more than one candidate, loads run on a
/// dedicated pool of `config.max_workers` threads. Results are collected as
/// they complete, then re-sorted into candidate order.
pub fn load_images(
    gate: &GateReport,
    config: &RunConfig,
    limits: &SecurityLimits,
    progress: &Progress,
) -> Result<IntakeReport> {
    let candidates = &gate.candidates;
    let total = candidates.len();
    progress.begin(PipelineStage::Loading, || format!("Loading {total} images"));

    let results = if config.parallel && total > 1 {
        load_parallel(candidates, config.max_workers, limits, progress)
    } else {
        debug!("Loading images sequentially");
        load_sequential(candidates, limits, progress)
    };

    let mut images = Vec::with_capacity(total);
    let mut skipped = Vec::new();
    for result in results {
        match result {
            Ok(image) => images.push(image),
            Err(err) if config.strict => return Err(err.into()),
            Err(err) => {
                warn!("Skipping {}", err);
                skipped.push(skipped_file(err));
            }
        }
    }

    ensure_enough_images(images.len(), gate.discovered)?;
    info!(
        loaded = images.len(),
        skipped = skipped.len(),
        "Loaded images"
    );

    Ok(IntakeReport { images, skipped })
}

fn load_sequential(
    candidates: &[ImageCandidate],
    limits: &SecurityLimits,
    progress: &Progress,
) -> Vec<std::result::Result<LoadedImage, ImageLoadError>> {
    let total = candidates.len();
    candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            let result = load_single_image(candidate, limits);
            report_loaded(progress, candidate, i + 1, total);
            result
        })
        .collect()
}

fn load_parallel(
    candidates: &[ImageCandidate],
    max_workers: usize,
    limits: &SecurityLimits,
    progress: &Progress,
) -> Vec<std::result::Result<LoadedImage, ImageLoadError>> {
    let workers = max_workers.clamp(1, candidates.len());
    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("autoflight-load-{i}"))
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            warn!(error = %e, "Could not build loader pool, loading sequentially");
            return load_sequential(candidates, limits, progress);
        }
    };
    debug!(workers, "Loading images in parallel");

    let total = candidates.len();
    // Counting and reporting share the lock so the count never goes backwards.
    let completed = Mutex::new(0usize);
    let (tx, rx) = mpsc::channel();
    pool.install(|| {
        candidates
            .par_iter()
            .enumerate()
            .for_each_with(tx, |tx, (idx, candidate)| {
                let result = load_single_image(candidate, limits);
                {
                    let mut done = completed.lock().unwrap_or_else(PoisonError::into_inner);
                    *done += 1;
                    report_loaded(progress, candidate, *done, total);
                }
                // The receiver outlives the pool.
                let _ = tx.send((idx, result));
            });
    });

    let mut collected: Vec<_> = rx.into_iter().collect();
    collected.sort_unstable_by_key(|(idx, _)| *idx);
    collected.into_iter().map(|(_, result)| result).collect()
}

fn report_loaded(progress: &Progress, candidate: &ImageCandidate, done: usize, total: usize) {
    progress.emit(PipelineStage::Loading, done as f32 / total as f32, || {
        format!("Loaded {} ({done}/{total})", candidate.file_name())
    });
}

fn skipped_file(err: ImageLoadError) -> SkippedFile {
    let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
    let reason = match err {
        ImageLoadError::FileTooLarge { size, limit, .. } => SkipReason::FileTooLarge { size, limit },
        ImageLoadError::DimensionsTooLarge {
            width,
            height,
            limit,
            ..
        } => SkipReason::DimensionsTooLarge {
            width,
            height,
            limit,
        },
        other => SkipReason::Unreadable(other.to_string()),
    };
    SkippedFile { path, reason }
}
