use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_JPEG_QUALITY, DEFAULT_PNG_LEVEL, ENV_JPEG_QUALITY, ENV_MAX_WORKERS, ENV_MODE,
    ENV_PARALLEL, ENV_PNG_COMPRESSION, ENV_VERBOSE, MAX_DEFAULT_WORKERS,
};
use crate::error::ValidationError;
use crate::io::output::OutputSettings;
use crate::security::SecurityLimits;
use crate::stitch::{StitchEngine, StitchMode};

use super::types::ProgressReporter;

/// Immutable settings snapshot for one run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Load images on a worker pool.
    pub parallel: bool,
    pub max_workers: usize,
    /// JPEG output quality (1-100).
    pub jpeg_quality: u8,
    /// PNG compression level (0-9).
    pub png_level: u8,
    pub mode: StitchMode,
    pub verbose: bool,
    /// Fail the run on any skipped file instead of warning.
    pub strict: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_workers: default_workers(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            png_level: DEFAULT_PNG_LEVEL,
            mode: StitchMode::default(),
            verbose: false,
            strict: false,
        }
    }
}

/// Available parallelism, capped.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(MAX_DEFAULT_WORKERS)
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_quality(i64::from(self.jpeg_quality))?;
        check_png_level(i64::from(self.png_level))?;
        if self.max_workers == 0 {
            return Err(ValidationError::ZeroWorkers);
        }
        Ok(())
    }

    /// Resolve the run configuration.
    ///
    /// Layers, lowest first: `options.base` (or the built-in defaults), the
    /// environment overrides, then the explicit per-call options.
    pub fn resolve(options: &RunOptions, env: &EnvOverrides) -> Result<Self, ValidationError> {
        let mut config = options.base.clone().unwrap_or_default();

        if let Some(v) = env.parallel {
            config.parallel = v;
        }
        if let Some(v) = env.max_workers {
            config.max_workers = v;
        }
        if let Some(v) = env.jpeg_quality {
            config.jpeg_quality = v;
        }
        if let Some(v) = env.png_level {
            config.png_level = v;
        }
        if let Some(v) = env.mode {
            config.mode = v;
        }
        if let Some(v) = env.verbose {
            config.verbose = v;
        }

        if let Some(v) = options.parallel {
            config.parallel = v;
        }
        if let Some(v) = options.max_workers {
            config.max_workers = v;
        }
        if let Some(v) = options.quality {
            config.jpeg_quality = v;
        }
        if let Some(v) = options.png_level {
            config.png_level = v;
        }
        if let Some(v) = options.mode {
            config.mode = v;
        }
        if let Some(v) = options.verbose {
            config.verbose = v;
        }
        if let Some(v) = options.strict {
            config.strict = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn output_settings(&self) -> OutputSettings {
        OutputSettings {
            jpeg_quality: self.jpeg_quality,
            png_level: self.png_level,
        }
    }
}

fn check_quality(value: i64) -> Result<u8, ValidationError> {
    match u8::try_from(value) {
        Ok(q @ 1..=100) => Ok(q),
        _ => Err(ValidationError::QualityOutOfRange(value)),
    }
}

fn check_png_level(value: i64) -> Result<u8, ValidationError> {
    match u8::try_from(value) {
        Ok(level @ 0..=9) => Ok(level),
        _ => Err(ValidationError::PngLevelOutOfRange(value)),
    }
}

/// Overrides read from `AUTOFLIGHT_*` environment variables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub parallel: Option<bool>,
    pub max_workers: Option<usize>,
    pub jpeg_quality: Option<u8>,
    pub png_level: Option<u8>,
    pub mode: Option<StitchMode>,
    pub verbose: Option<bool>,
}

impl EnvOverrides {
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build overrides from an arbitrary key lookup. Unset keys leave the
    /// corresponding setting alone; set but unparsable keys are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut overrides = Self::default();

        if let Some(raw) = lookup(ENV_PARALLEL) {
            overrides.parallel = Some(parse_flag(ENV_PARALLEL, &raw)?);
        }
        if let Some(raw) = lookup(ENV_MAX_WORKERS) {
            overrides.max_workers = Some(parse_number(ENV_MAX_WORKERS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_JPEG_QUALITY) {
            overrides.jpeg_quality = Some(check_quality(parse_number(ENV_JPEG_QUALITY, &raw)?)?);
        }
        if let Some(raw) = lookup(ENV_PNG_COMPRESSION) {
            overrides.png_level = Some(check_png_level(parse_number(ENV_PNG_COMPRESSION, &raw)?)?);
        }
        if let Some(raw) = lookup(ENV_MODE) {
            overrides.mode = Some(raw.parse()?);
        }
        if let Some(raw) = lookup(ENV_VERBOSE) {
            overrides.verbose = Some(parse_flag(ENV_VERBOSE, &raw)?);
        }

        Ok(overrides)
    }
}

fn invalid_env(var: &str, value: &str) -> ValidationError {
    ValidationError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    }
}

fn parse_flag(var: &str, raw: &str) -> Result<bool, ValidationError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid_env(var, raw)),
    }
}

fn parse_number<T: std::str::FromStr>(var: &str, raw: &str) -> Result<T, ValidationError> {
    raw.trim().parse().map_err(|_| invalid_env(var, raw))
}

/// Per-call options for [`create_orthomosaic`](super::create_orthomosaic).
///
/// `None` fields fall through to the environment, then to the defaults.
#[derive(Clone, Default)]
pub struct RunOptions {
    pub parallel: Option<bool>,
    pub max_workers: Option<usize>,
    /// JPEG output quality (1-100).
    pub quality: Option<u8>,
    pub png_level: Option<u8>,
    pub mode: Option<StitchMode>,
    pub verbose: Option<bool>,
    pub strict: Option<bool>,
    /// Validate and count images only; nothing is decoded or written.
    pub dry_run: bool,
    pub progress: Option<Arc<dyn ProgressReporter>>,
    /// Base layer in place of the built-in defaults, e.g. from a config file.
    pub base: Option<RunConfig>,
    pub limits: Option<SecurityLimits>,
    /// Stitching engine; the phase-correlation stitcher when unset.
    pub engine: Option<Arc<dyn StitchEngine>>,
}

impl RunOptions {
    pub fn with_progress(mut self, sink: Arc<dyn ProgressReporter>) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn StitchEngine>) -> Self {
        self.engine = Some(engine);
        self
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("parallel", &self.parallel)
            .field("max_workers", &self.max_workers)
            .field("quality", &self.quality)
            .field("png_level", &self.png_level)
            .field("mode", &self.mode)
            .field("verbose", &self.verbose)
            .field("strict", &self.strict)
            .field("dry_run", &self.dry_run)
            .field("progress", &self.progress.is_some())
            .field("base", &self.base)
            .field("limits", &self.limits)
            .field("engine", &self.engine.as_ref().map(|e| e.name().to_string()))
            .finish()
    }
}
