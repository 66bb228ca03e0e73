use std::path::PathBuf;

use anyhow::{Context, Result};
use autoflight_core::io::scan::scan_directory;
use autoflight_core::security::SecurityLimits;
use clap::Args;

use super::config::ConfigFile;
use super::{GlobalArgs, LimitArgs};
use crate::summary;

#[derive(Args)]
pub struct ScanArgs {
    /// Directory containing the survey images
    pub input: PathBuf,

    /// Fail on oversized files instead of skipping them
    #[arg(long)]
    pub strict: bool,

    /// Config file (TOML) used in place of the built-in defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub limits: LimitArgs,
}

impl ScanArgs {
    /// Limits and strictness layered the same way `run` layers them:
    /// flags over the config file over the defaults.
    fn resolve(&self) -> Result<(SecurityLimits, bool)> {
        let file = ConfigFile::load_optional(self.config.as_deref())?;
        let strict = self.strict || file.as_ref().is_some_and(|f| f.run.strict);
        let base = file.map(|f| f.limits).unwrap_or_default();
        Ok((self.limits.apply(base), strict))
    }
}

pub fn run(args: &ScanArgs, global: &GlobalArgs) -> Result<()> {
    let (limits, strict) = args.resolve()?;
    let gate = scan_directory(&args.input, &limits, strict)
        .with_context(|| format!("Validation failed for {}", args.input.display()))?;

    if !global.quiet {
        summary::print_scan(&gate);
    }
    Ok(())
}
