use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Result;
use crate::io::loader::load_images;
use crate::io::output::{save_image, OutputFormat};
use crate::io::scan::{scan_candidates, DirectoryScanner, FsScanner};
use crate::security::SecurityLimits;
use crate::stitch::{stitch_images, PhaseCorrelationStitcher, StitchEngine};

use super::config::{EnvOverrides, RunConfig, RunOptions};
use super::types::{DryRunReport, OrthomosaicResult, PipelineStage, Progress, RunOutcome};

/// Where a run reads from and writes to.
#[derive(Clone, Debug)]
pub struct RunRequest {
    pub input_dir: PathBuf,
    pub output_path: PathBuf,
    pub dry_run: bool,
}

/// Build an orthomosaic from every supported image in `input_dir`.
///
/// Configuration is resolved once from `options`, the `AUTOFLIGHT_*`
/// environment and the defaults, in that order of precedence. Without an
/// engine override the built-in [`PhaseCorrelationStitcher`] is used, with
/// its canvas capped at the per-image pixel limit.
pub fn create_orthomosaic(
    input_dir: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    options: RunOptions,
) -> Result<RunOutcome> {
    let env = EnvOverrides::from_env()?;
    let config = RunConfig::resolve(&options, &env)?;
    let limits = options.limits.clone().unwrap_or_default();
    let engine: Arc<dyn StitchEngine> = options
        .engine
        .clone()
        .unwrap_or_else(|| Arc::new(PhaseCorrelationStitcher::with_limits(&limits)));
    let progress = Progress::from(options.progress.clone());

    let request = RunRequest {
        input_dir: input_dir.as_ref().to_path_buf(),
        output_path: output_path.as_ref().to_path_buf(),
        dry_run: options.dry_run,
    };
    run_pipeline(&request, &config, &limits, engine.as_ref(), &progress)
}

/// Run the gate, intake, stitching and output stages with an already
/// resolved configuration.
pub fn run_pipeline(
    request: &RunRequest,
    config: &RunConfig,
    limits: &SecurityLimits,
    engine: &dyn StitchEngine,
    progress: &Progress,
) -> Result<RunOutcome> {
    run_pipeline_with_scanner(request, config, limits, engine, &FsScanner, progress)
}

/// [`run_pipeline`] over a custom directory listing.
pub fn run_pipeline_with_scanner(
    request: &RunRequest,
    config: &RunConfig,
    limits: &SecurityLimits,
    engine: &dyn StitchEngine,
    scanner: &dyn DirectoryScanner,
    progress: &Progress,
) -> Result<RunOutcome> {
    config.validate()?;
    // Reject an unwritable format before any image is read.
    let format = OutputFormat::from_path(&request.output_path)?;
    debug!(?config, ?limits, %format, "Resolved run configuration");

    progress.begin(PipelineStage::Validating, || {
        format!("Scanning {}", request.input_dir.display())
    });
    let gate = scan_candidates(&request.input_dir, limits, config.strict, scanner)?;
    let found = gate.candidates.len();
    progress.finish(PipelineStage::Validating, || format!("Found {found} images"));

    if request.dry_run {
        info!(
            images = found,
            bytes = gate.total_bytes(),
            "Dry run complete, nothing loaded"
        );
        return Ok(RunOutcome::DryRun(DryRunReport {
            input_dir: gate.base.clone(),
            output_path: request.output_path.clone(),
            image_count: found,
            total_bytes: gate.total_bytes(),
            skipped: gate.skipped,
        }));
    }

    let intake = load_images(&gate, config, limits, progress)?;
    let mut skipped = gate.skipped;
    skipped.extend(intake.skipped);
    if config.verbose {
        for file in &skipped {
            info!(path = %file.path.display(), reason = %file.reason, "Skipped input");
        }
    }

    let mosaic = stitch_images(intake.images, config.mode, engine, progress)?;

    let output_path = request.output_path.clone();
    progress.begin(PipelineStage::Writing, || {
        format!("Saving to {}", output_path.display())
    });
    save_image(&mosaic.image, &output_path, &config.output_settings())?;
    progress.finish(PipelineStage::Writing, || {
        format!("Saved {}", output_path.display())
    });

    let (width, height) = mosaic.size();
    info!(
        images = mosaic.image_count,
        skipped = skipped.len(),
        width,
        height,
        output = %output_path.display(),
        "Orthomosaic complete"
    );

    Ok(RunOutcome::Completed(OrthomosaicResult {
        output_path,
        mosaic,
        skipped,
    }))
}
