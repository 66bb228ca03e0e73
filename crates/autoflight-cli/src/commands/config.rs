use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use autoflight_core::pipeline::RunConfig;
use autoflight_core::security::SecurityLimits;
use clap::Args;
use serde::{Deserialize, Serialize};

#[derive(Args)]
pub struct ConfigArgs {
    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// On-disk configuration: run settings plus security limits.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub run: RunConfig,
    pub limits: SecurityLimits,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn load_optional(path: Option<&Path>) -> Result<Option<Self>> {
        path.map(Self::load).transpose()
    }
}

/// Print or save the default configuration as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let toml_str = toml::to_string_pretty(&ConfigFile::default())?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
