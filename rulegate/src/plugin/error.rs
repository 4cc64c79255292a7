use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading plugin modules or constructing analyzers.
///
/// None of these abort a load: the loader records them per location or per
/// type in its [`super::LoadReport`] and moves on.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The location does not exist.
    #[error("plugin module not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The location exists but no module loader handles it.
    #[error("unsupported plugin module: {}", .0.display())]
    Unsupported(PathBuf),

    /// The module could not be loaded.
    #[error("failed to load {}: {message}", path.display())]
    Load {
        /// Module location.
        path: PathBuf,
        /// Loader error text.
        message: String,
    },

    /// The module loaded but exports no plugin declaration.
    #[error("{} does not export a plugin declaration", .0.display())]
    MissingDeclaration(PathBuf),

    /// The module was built against another plugin API.
    #[error("{} was built for {found}, expected {expected}", path.display())]
    IncompatibleVersion {
        /// Module location.
        path: PathBuf,
        /// Version this host accepts.
        expected: String,
        /// Version found in the module.
        found: String,
    },

    /// The analyzer type exposes no parameterless constructor.
    #[error("{0} has no parameterless constructor")]
    NoParameterlessConstructor(String),

    /// The constructor returned an error.
    #[error("constructing {type_name} failed: {message}")]
    ConstructionFailed {
        /// Exported type name.
        type_name: String,
        /// Constructor error text.
        message: String,
    },

    /// The constructor panicked.
    #[error("constructing {type_name} panicked: {message}")]
    ConstructionPanicked {
        /// Exported type name.
        type_name: String,
        /// Panic payload, when it was a string.
        message: String,
    },
}
