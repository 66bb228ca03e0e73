use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::frame::SkippedFile;
use crate::stitch::StitchResult;

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Validating,
    Loading,
    Stitching,
    Writing,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validating => write!(f, "Validating inputs"),
            Self::Loading => write!(f, "Loading images"),
            Self::Stitching => write!(f, "Stitching"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// A normalized progress update. `fraction` is the completed share of the
/// current stage, in [0, 1].
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    pub fraction: f32,
    pub stage: PipelineStage,
    pub message: String,
}

/// Thread-safe sink for progress events.
///
/// Intake workers report from pool threads, so implementors must be
/// `Send + Sync`. Closures `Fn(&ProgressEvent)` implement it directly.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: &ProgressEvent);
}

impl<F> ProgressReporter for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn report(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Optional progress sink threaded through every stage.
///
/// Messages are built lazily, so a run without a sink never formats them.
#[derive(Clone, Default)]
pub struct Progress {
    sink: Option<Arc<dyn ProgressReporter>>,
}

impl Progress {
    pub fn new(sink: Arc<dyn ProgressReporter>) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn emit<M>(&self, stage: PipelineStage, fraction: f32, message: M)
    where
        M: FnOnce() -> String,
    {
        if let Some(sink) = &self.sink {
            let fraction = if fraction.is_nan() {
                0.0
            } else {
                fraction.clamp(0.0, 1.0)
            };
            sink.report(&ProgressEvent {
                fraction,
                stage,
                message: message(),
            });
        }
    }

    pub fn begin<M: FnOnce() -> String>(&self, stage: PipelineStage, message: M) {
        self.emit(stage, 0.0, message);
    }

    pub fn finish<M: FnOnce() -> String>(&self, stage: PipelineStage, message: M) {
        self.emit(stage, 1.0, message);
    }
}

impl From<Option<Arc<dyn ProgressReporter>>> for Progress {
    fn from(sink: Option<Arc<dyn ProgressReporter>>) -> Self {
        Self { sink }
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// A completed run: the written file and the mosaic it holds.
#[derive(Clone, Debug)]
pub struct OrthomosaicResult {
    pub output_path: PathBuf,
    pub mosaic: StitchResult,
    /// Candidates dropped without failing the run.
    pub skipped: Vec<SkippedFile>,
}

impl OrthomosaicResult {
    pub fn image_count(&self) -> usize {
        self.mosaic.image_count
    }

    pub fn size(&self) -> (u32, u32) {
        self.mosaic.size()
    }
}

/// What a dry run found without loading anything.
#[derive(Clone, Debug)]
pub struct DryRunReport {
    pub input_dir: PathBuf,
    pub output_path: PathBuf,
    pub image_count: usize,
    pub total_bytes: u64,
    pub skipped: Vec<SkippedFile>,
}

/// Result of the pipeline: either a written mosaic or a dry-run report.
#[derive(Clone, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum RunOutcome {
    Completed(OrthomosaicResult),
    DryRun(DryRunReport),
}

impl RunOutcome {
    pub fn completed(self) -> Option<OrthomosaicResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::DryRun(_) => None,
        }
    }
}
