//! Core library of the rulegate analyzer host.
//!
//! This library lets a static analysis engine host externally loaded
//! analyzer plugins as if they were one native analyzer, while controlling
//! which of their diagnostics may surface at runtime.

#![allow(
    clippy::type_complexity,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

/// Version of this crate. Embedded into plugin declarations and checked on load.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Module defining the `Analyzer` trait implemented by native analyzers and plugins.
pub mod analyzer;

/// Module defining the command-line interface arguments and structs.
pub mod cli;

/// Module for loading configuration.
pub mod config;

/// Module containing shared constants.
pub mod constants;

/// Module containing the registration API: registrars, action and start
/// contexts, and registration decorators.
pub mod context;

/// Module defining descriptors, diagnostics and sinks.
pub mod diagnostic;

/// Module containing the in-process analysis driver.
pub mod driver;

/// Module defining the entry point logic shared by the binaries.
pub mod entry_point;

/// Module containing the host engine that composes native analyzers and plugins.
pub mod host;

/// Module containing plugin registration interception and report gating.
pub mod interception;

/// Module defining the compilation model analyzers run over.
pub mod model;

/// Module for rich CLI output formatting with tables and colored text.
pub mod output;

/// Module containing plugin module discovery, loading and construction.
pub mod plugin;

/// Module containing the runtime enablement policy.
pub mod policy;

/// Module containing the periodic enablement toggler.
pub mod scheduler;

/// Module containing test utilities.
/// Sample compilations, scripted analyzers and in-process plugin modules.
pub mod test_utils;

/// Module containing utility functions.
pub mod utils;
