use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use autoflight_core::pipeline::{
    create_orthomosaic, PipelineStage, ProgressEvent, ProgressReporter, RunOptions, RunOutcome,
};
use autoflight_core::StitchMode;
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use super::config::ConfigFile;
use super::{GlobalArgs, LimitArgs};
use crate::summary;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    /// Perspective overlap (aerial surveys)
    Panorama,
    /// Flat, planar captures
    Scans,
}

impl From<ModeArg> for StitchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Panorama => StitchMode::Panorama,
            ModeArg::Scans => StitchMode::Scans,
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Directory containing the survey images
    pub input: PathBuf,

    /// Output file (.jpg, .png, .tif or .html)
    pub output: PathBuf,

    /// Stitching mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Load images on a single thread
    #[arg(long)]
    pub no_parallel: bool,

    /// Number of image loading workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// JPEG quality (1-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// PNG compression level (0-9)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=9))]
    pub png_compression: Option<u8>,

    /// Fail on any unreadable or oversized file instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Validate inputs and report what would be stitched, without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Show a progress bar
    #[arg(long)]
    pub progress: bool,

    /// Config file (TOML) used in place of the built-in defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub limits: LimitArgs,
}

/// Progress sink that drives an indicatif bar over the whole run.
struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    /// Share of the bar given to each stage, as (start, width) in percent.
    fn stage_span(stage: PipelineStage) -> (f32, f32) {
        match stage {
            PipelineStage::Validating => (0.0, 5.0),
            PipelineStage::Loading => (5.0, 55.0),
            PipelineStage::Stitching => (60.0, 30.0),
            PipelineStage::Writing => (90.0, 10.0),
        }
    }
}

impl ProgressReporter for BarReporter {
    fn report(&self, event: &ProgressEvent) {
        let (start, width) = Self::stage_span(event.stage);
        self.bar.set_message(event.message.clone());
        self.bar
            .set_position((start + width * event.fraction).round() as u64);
    }
}

pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let file = ConfigFile::load_optional(args.config.as_deref())?;
    let base_limits = file.as_ref().map(|f| f.limits.clone()).unwrap_or_default();

    let mut options = RunOptions {
        parallel: args.no_parallel.then_some(false),
        max_workers: args.workers,
        quality: args.quality,
        png_level: args.png_compression,
        mode: args.mode.map(StitchMode::from),
        verbose: global.verbose.then_some(true),
        strict: args.strict.then_some(true),
        dry_run: args.dry_run,
        base: file.map(|f| f.run),
        limits: Some(args.limits.apply(base_limits)),
        ..Default::default()
    };

    let bar = if args.progress && !global.quiet {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg:40} [{bar:40}] {pos}%")?
                .progress_chars("=> "),
        );
        options = options.with_progress(Arc::new(BarReporter { bar: pb.clone() }));
        Some(pb)
    } else {
        None
    };

    debug!(?options, "Run options");
    let outcome = create_orthomosaic(&args.input, &args.output, options);

    if let Some(pb) = bar {
        match &outcome {
            Ok(_) => pb.finish_with_message("Done"),
            Err(_) => pb.abandon_with_message("Failed"),
        }
    }

    let outcome = outcome.with_context(|| {
        format!("Failed to build orthomosaic from {}", args.input.display())
    })?;

    if !global.quiet {
        match outcome {
            RunOutcome::Completed(ref result) => summary::print_run_summary(result),
            RunOutcome::DryRun(ref report) => summary::print_dry_run(report),
        }
    }

    Ok(())
}
