pub mod config;
mod orchestrator;
mod types;

pub use config::{EnvOverrides, RunConfig, RunOptions};
pub use orchestrator::{create_orthomosaic, run_pipeline, run_pipeline_with_scanner, RunRequest};
pub use types::{
    DryRunReport, OrthomosaicResult, PipelineStage, Progress, ProgressEvent, ProgressReporter,
    RunOutcome,
};
