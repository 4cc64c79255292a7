use crate::cli::Cli;
use crate::config::Config;
use crate::host::HostEngine;
use crate::output::{print_report, InspectionReport};
use crate::plugin::{PluginLoader, PluginLocations};
use crate::policy::EnablementPolicy;
use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the stderr log subscriber. `RUST_LOG` wins over `verbose`.
///
/// Later calls are no-ops, so embedding hosts and tests may call this freely.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "rulegate=debug" } else { "rulegate=warn" })
    });
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Runs the inspection tool with the given arguments.
///
/// # Errors
///
/// Returns an error if writing the report fails.
pub fn run_with_args(args: Vec<String>) -> Result<i32> {
    run_with_args_to(args, &mut std::io::stdout())
}

/// Run rulegate with the given arguments, writing output to the specified writer.
///
/// This is the testable version of `run_with_args` that allows output capture.
///
/// # Errors
///
/// Returns an error if writing the report fails.
pub fn run_with_args_to<W: std::io::Write>(args: Vec<String>, writer: &mut W) -> Result<i32> {
    let mut program_args = vec!["rulegate".to_owned()];
    program_args.extend(args);
    let cli_var = match Cli::try_parse_from(program_args) {
        Ok(c) => c,
        Err(e) => match e.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                write!(writer, "{e}")?;
                writer.flush()?;
                return Ok(0);
            }
            _ => {
                eprint!("{e}");
                return Ok(1);
            }
        },
    };

    init_tracing(cli_var.output.verbose);

    let config = match &cli_var.config {
        Some(path) => match Config::load_file(path) {
            Ok(config) => config,
            Err(error) => {
                eprintln!("Error: {error}");
                return Ok(1);
            }
        },
        None => Config::load_from_path(Path::new(".")),
    };
    if let Some(path) = &config.config_file_path {
        tracing::debug!(config = %path.display(), "loaded configuration");
    }

    let policy = Arc::new(EnablementPolicy::new());
    let locations = PluginLocations::new();
    config.apply(&policy, &locations);
    locations.extend(cli_var.plugins);
    policy.disable_ids(cli_var.disable);
    for family in cli_var.disable_families {
        policy.disable_family(family);
    }

    let host = HostEngine::new(
        PluginLoader::with_default_loader(locations),
        Arc::clone(&policy),
    );
    let report = InspectionReport::collect(&host);

    if cli_var.output.json {
        serde_json::to_writer_pretty(&mut *writer, &report)?;
        writeln!(writer)?;
    } else {
        print_report(writer, &report)?;
    }
    writer.flush()?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_goes_to_writer() {
        let mut out = Vec::new();
        let code = run_with_args_to(vec!["--help".to_owned()], &mut out).unwrap();
        assert_eq!(code, 0);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("--plugin"));
        assert!(text.contains(".rulegate.toml"));
    }

    #[test]
    fn test_unknown_flag_fails() {
        let mut out = Vec::new();
        let code = run_with_args_to(vec!["--bogus".to_owned()], &mut out).unwrap();
        assert_eq!(code, 1);
        assert!(out.is_empty());
    }

    #[test]
    fn test_missing_config_file_fails() {
        let mut out = Vec::new();
        let code = run_with_args_to(
            vec!["--config".to_owned(), "/nonexistent/.rulegate.toml".to_owned()],
            &mut out,
        )
        .unwrap();
        assert_eq!(code, 1);
    }
}
