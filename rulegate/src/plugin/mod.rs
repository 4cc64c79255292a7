//! Plugin discovery and instantiation.
//!
//! A plugin module publishes an export table: one [`ExportedType`] per public
//! type, saying whether the type is an analyzer, whether it is abstract and
//! how to construct it without arguments. The [`PluginLoader`] opens every
//! configured location through a [`ModuleLoader`], walks the tables and
//! constructs each concrete analyzer exactly once.
//!
//! Native plugin crates export their table with [`crate::declare_plugin!`]:
//!
//! ```ignore
//! fn exports() -> Vec<rulegate::plugin::ExportedType> {
//!     vec![rulegate::plugin::ExportedType::analyzer::<MyAnalyzer>()]
//! }
//! rulegate::declare_plugin!(exports);
//! ```

#[cfg(feature = "dylib")]
pub mod dylib;
mod error;
mod loader;
mod module;

pub use error::PluginError;
pub use loader::{LoadReport, PluginLoader, PluginLocations, SkippedEntry};
pub use module::{DefaultModuleLoader, ModuleLoader, ModuleRegistry, PluginModule, StaticModule};

use crate::analyzer::Analyzer;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What kind of type an export table entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// A concrete analyzer.
    Analyzer,
    /// An analyzer base meant to be extended; never constructed.
    AbstractAnalyzer,
    /// Any other public type.
    Other,
}

/// A parameterless constructor.
#[derive(Debug, Clone, Copy)]
pub enum Constructor {
    /// Infallible construction.
    Default(fn() -> Box<dyn Analyzer>),
    /// Construction that may fail.
    Fallible(fn() -> anyhow::Result<Box<dyn Analyzer>>),
}

impl Constructor {
    /// Runs the constructor.
    pub fn invoke(self) -> anyhow::Result<Box<dyn Analyzer>> {
        match self {
            Self::Default(construct) => Ok(construct()),
            Self::Fallible(construct) => construct(),
        }
    }
}

/// One entry of a module's export table.
#[derive(Debug, Clone)]
pub struct ExportedType {
    /// Fully qualified type name.
    pub name: &'static str,
    /// What the type is.
    pub kind: TypeKind,
    /// Parameterless constructor, if the type has one.
    pub constructor: Option<Constructor>,
}

fn construct_default<T: Analyzer + Default + 'static>() -> Box<dyn Analyzer> {
    Box::new(T::default())
}

impl ExportedType {
    /// A concrete analyzer constructed through `Default`.
    #[must_use]
    pub fn analyzer<T: Analyzer + Default + 'static>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            kind: TypeKind::Analyzer,
            constructor: Some(Constructor::Default(construct_default::<T>)),
        }
    }

    /// A concrete analyzer with a fallible constructor.
    #[must_use]
    pub fn fallible(
        name: &'static str,
        constructor: fn() -> anyhow::Result<Box<dyn Analyzer>>,
    ) -> Self {
        Self {
            name,
            kind: TypeKind::Analyzer,
            constructor: Some(Constructor::Fallible(constructor)),
        }
    }

    /// A concrete analyzer that can only be built with arguments.
    #[must_use]
    pub fn parameterized(name: &'static str) -> Self {
        Self {
            name,
            kind: TypeKind::Analyzer,
            constructor: None,
        }
    }

    /// An abstract analyzer base.
    #[must_use]
    pub fn abstract_analyzer(name: &'static str) -> Self {
        Self {
            name,
            kind: TypeKind::AbstractAnalyzer,
            constructor: None,
        }
    }

    /// A public type that is not an analyzer.
    #[must_use]
    pub fn other(name: &'static str) -> Self {
        Self {
            name,
            kind: TypeKind::Other,
            constructor: None,
        }
    }
}

/// Static exported by every native plugin module under
/// [`crate::constants::PLUGIN_DECLARATION_SYMBOL`].
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct PluginDeclaration {
    /// [`crate::constants::PLUGIN_API_VERSION`] the module was built with.
    pub api_version: u32,
    /// `rulegate` version the module was built against.
    pub core_version: &'static str,
    /// Returns the module's export table.
    pub exports: fn() -> Vec<ExportedType>,
}

/// Exports a plugin declaration from a native plugin crate.
///
/// Takes the path of a `fn() -> Vec<ExportedType>`.
#[macro_export]
macro_rules! declare_plugin {
    ($exports:path) => {
        #[allow(unsafe_code)]
        #[no_mangle]
        pub static RULEGATE_PLUGIN_DECLARATION: $crate::plugin::PluginDeclaration =
            $crate::plugin::PluginDeclaration {
                api_version: $crate::constants::PLUGIN_API_VERSION,
                core_version: $crate::VERSION,
                exports: $exports,
            };
    };
}

/// A constructed plugin together with the module it came from.
pub struct LoadedPlugin {
    // Dropped before `module`.
    analyzer: Box<dyn Analyzer>,
    type_name: String,
    family: String,
    location: PathBuf,
    module: Arc<dyn PluginModule>,
}

impl LoadedPlugin {
    /// Wraps an analyzer constructed from `module`.
    pub fn new(
        analyzer: Box<dyn Analyzer>,
        type_name: impl Into<String>,
        location: impl Into<PathBuf>,
        module: Arc<dyn PluginModule>,
    ) -> Self {
        let family = analyzer.family().to_owned();
        Self {
            analyzer,
            type_name: type_name.into(),
            family,
            location: location.into(),
            module,
        }
    }

    /// The plugin analyzer.
    #[must_use]
    pub fn analyzer(&self) -> &dyn Analyzer {
        &*self.analyzer
    }

    /// Exported type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Rule family of the analyzer.
    #[must_use]
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Location the module was loaded from.
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Name of the module.
    #[must_use]
    pub fn module_name(&self) -> &str {
        self.module.name()
    }
}

impl std::fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("type_name", &self.type_name)
            .field("family", &self.family)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}
