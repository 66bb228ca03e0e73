pub mod config;
pub mod run;
pub mod scan;

use autoflight_core::security::SecurityLimits;
use clap::Args;

/// Flags shared by every subcommand.
pub struct GlobalArgs {
    pub verbose: bool,
    pub quiet: bool,
}

/// Security limit overrides accepted by `run` and `scan`.
#[derive(Args, Clone, Debug, Default)]
pub struct LimitArgs {
    /// Maximum size of a single input file in bytes
    #[arg(long, value_name = "BYTES")]
    pub max_file_size: Option<u64>,

    /// Maximum pixel count (width x height) of a single input image
    #[arg(long, value_name = "PIXELS")]
    pub max_pixels: Option<u64>,

    /// Maximum number of images in the input directory
    #[arg(long, value_name = "N")]
    pub max_files: Option<usize>,
}

impl LimitArgs {
    pub fn apply(&self, mut limits: SecurityLimits) -> SecurityLimits {
        if let Some(v) = self.max_file_size {
            limits.max_file_size_bytes = v;
        }
        if let Some(v) = self.max_pixels {
            limits.max_image_pixels = v;
        }
        if let Some(v) = self.max_files {
            limits.max_file_count = v;
        }
        limits
    }
}

/// Human readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
