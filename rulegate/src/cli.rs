use clap::{Args, Parser};
use std::path::PathBuf;

/// Help text for configuration file options, shown at the bottom of --help.
const CONFIG_HELP: &str = "\
CONFIGURATION FILE (.rulegate.toml):
  Searched from the current directory upward unless --config is given.

  [rulegate]
  plugin_paths = [\"plugins/libextra_rules.so\"]  # Relative to the config file
  disabled_families = []                       # Rule families off at startup
  disabled_diagnostics = [\"CC0001\"]            # Diagnostic ids off at startup

  [rulegate.toggle]
  interval_secs = 10                           # Flip period
  families = [\"rulegate::host::HostEngine\"]    # Families flipped together
  diagnostics = []                             # Ids flipped with them
";

/// Options for output formatting and verbosity.
#[derive(Args, Debug, Default, Clone)]
pub struct OutputOptions {
    /// Output raw JSON.
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging on stderr (RUST_LOG overrides).
    #[arg(short, long)]
    pub verbose: bool,
}

/// Command line arguments of the inspection tool.
#[derive(Parser, Debug)]
#[command(
    name = "rulegate",
    version,
    about = "Inspect the analyzer plugins folded into the rule gate",
    after_help = CONFIG_HELP
)]
pub struct Cli {
    /// Configuration file to use instead of searching for .rulegate.toml.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Plugin module location, added to the configured ones. Repeatable.
    #[arg(short, long = "plugin", value_name = "PATH")]
    pub plugins: Vec<PathBuf>,

    /// Diagnostic id to disable. Repeatable.
    #[arg(short, long = "disable", value_name = "ID")]
    pub disable: Vec<String>,

    /// Rule family to disable. Repeatable.
    #[arg(long = "disable-family", value_name = "FAMILY")]
    pub disable_families: Vec<String>,

    /// Output formatting options.
    #[command(flatten)]
    pub output: OutputOptions,
}
