mod commands;
mod summary;

use anyhow::{Context, Result};
use autoflight_core::pipeline::EnvOverrides;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "autoflight", about = "Assemble drone survey images into an orthomosaic")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stitch a directory of images into one orthomosaic
    Run(commands::run::RunArgs),
    /// Validate a directory and list the images a run would use
    Scan(commands::scan::ScanArgs),
    /// Print or save the default configuration as TOML
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let env = EnvOverrides::from_env().context("Invalid AUTOFLIGHT_* environment")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level(&cli, &env)))
        .with_writer(std::io::stderr)
        .init();

    let global = commands::GlobalArgs {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match &cli.command {
        Commands::Run(args) => commands::run::run(args, &global),
        Commands::Scan(args) => commands::scan::run(args, &global),
        Commands::Config(args) => commands::config::run(args),
    }
}

/// Command-line flags win over `AUTOFLIGHT_VERBOSE`, so `-q` silences an
/// environment that asks for verbose output.
fn log_level(cli: &Cli, env: &EnvOverrides) -> &'static str {
    if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if env.verbose == Some(true) {
        "debug"
    } else {
        "warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&'static str, &'static str)]) -> EnvOverrides {
        let pairs = pairs.to_vec();
        EnvOverrides::from_lookup(move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("autoflight").chain(args.iter().copied()))
    }

    #[test]
    fn test_env_verbose_raises_log_level() {
        let env = env(&[("AUTOFLIGHT_VERBOSE", "1")]);
        assert_eq!(log_level(&cli(&["scan", "photos"]), &env), "debug");
    }

    #[test]
    fn test_default_log_level_is_warn() {
        let unset = env(&[]);
        assert_eq!(log_level(&cli(&["scan", "photos"]), &unset), "warn");

        let off = env(&[("AUTOFLIGHT_VERBOSE", "off")]);
        assert_eq!(log_level(&cli(&["scan", "photos"]), &off), "warn");
    }

    #[test]
    fn test_flags_override_env_verbosity() {
        let env = env(&[("AUTOFLIGHT_VERBOSE", "true")]);
        assert_eq!(log_level(&cli(&["-q", "scan", "photos"]), &env), "error");
        assert_eq!(log_level(&cli(&["-v", "scan", "photos"]), &env), "debug");
    }
}
