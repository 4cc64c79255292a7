//! Modules and the loaders that open them.

use super::{ExportedType, PluginError};
use crate::constants::SHARED_LIBRARY_EXTENSIONS;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A loaded binary module exposing an export table.
///
/// The module must stay alive for as long as anything constructed from its
/// exports does; [`super::LoadedPlugin`] keeps an `Arc` to it for that reason.
pub trait PluginModule: Send + Sync {
    /// Display name (usually the file name).
    fn name(&self) -> &str;

    /// Every public type the module exports.
    fn exported_types(&self) -> Vec<ExportedType>;
}

/// Opens the module stored at a location.
pub trait ModuleLoader: Send + Sync {
    /// Loads the module at `path`.
    fn load(&self, path: &Path) -> Result<Arc<dyn PluginModule>, PluginError>;
}

/// A module linked into the host at build time.
#[derive(Debug, Clone)]
pub struct StaticModule {
    name: String,
    types: Vec<ExportedType>,
}

impl StaticModule {
    /// Creates a module with the given export table.
    pub fn new(name: impl Into<String>, types: Vec<ExportedType>) -> Self {
        Self {
            name: name.into(),
            types,
        }
    }
}

impl PluginModule for StaticModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn exported_types(&self) -> Vec<ExportedType> {
        self.types.clone()
    }
}

/// Build-time registry mapping artifact locations to statically linked modules.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: FxHashMap<PathBuf, Arc<StaticModule>>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style method registering `types` under `path`.
    #[must_use]
    pub fn with_module(mut self, path: impl Into<PathBuf>, types: Vec<ExportedType>) -> Self {
        self.register(path, types);
        self
    }

    /// Registers `types` under `path`, replacing any previous module there.
    pub fn register(&mut self, path: impl Into<PathBuf>, types: Vec<ExportedType>) {
        let path = path.into();
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        self.modules
            .insert(path, Arc::new(StaticModule::new(name, types)));
    }

    /// Returns true if a module is registered under `path`.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.modules.contains_key(path)
    }
}

impl ModuleLoader for ModuleRegistry {
    fn load(&self, path: &Path) -> Result<Arc<dyn PluginModule>, PluginError> {
        match self.modules.get(path) {
            Some(module) => Ok(Arc::clone(module) as Arc<dyn PluginModule>),
            None => Err(PluginError::NotFound(path.to_path_buf())),
        }
    }
}

/// Registry first, then shared libraries by extension.
#[derive(Debug, Clone, Default)]
pub struct DefaultModuleLoader {
    registry: ModuleRegistry,
}

impl DefaultModuleLoader {
    /// Creates a loader consulting `registry` before the file system.
    #[must_use]
    pub fn new(registry: ModuleRegistry) -> Self {
        Self { registry }
    }
}

impl ModuleLoader for DefaultModuleLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn PluginModule>, PluginError> {
        if self.registry.contains(path) {
            return self.registry.load(path);
        }
        if !path.exists() {
            return Err(PluginError::NotFound(path.to_path_buf()));
        }
        let is_shared_library = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SHARED_LIBRARY_EXTENSIONS().contains(ext));
        if !is_shared_library {
            return Err(PluginError::Unsupported(path.to_path_buf()));
        }
        load_shared_library(path)
    }
}

#[cfg(feature = "dylib")]
fn load_shared_library(path: &Path) -> Result<Arc<dyn PluginModule>, PluginError> {
    super::dylib::DylibLoader.load(path)
}

#[cfg(not(feature = "dylib"))]
fn load_shared_library(path: &Path) -> Result<Arc<dyn PluginModule>, PluginError> {
    Err(PluginError::Unsupported(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = ModuleRegistry::new().with_module("plugins/a.so", Vec::new());
        let module = registry.load(Path::new("plugins/a.so")).unwrap();
        assert_eq!(module.name(), "a.so");
        assert!(matches!(
            registry.load(Path::new("plugins/b.so")),
            Err(PluginError::NotFound(_))
        ));
    }

    #[test]
    fn test_default_loader_rejects_unknown_files() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("notes.txt");
        std::fs::write(&text, "not a module").unwrap();

        let loader = DefaultModuleLoader::default();
        assert!(matches!(loader.load(&text), Err(PluginError::Unsupported(_))));
        assert!(matches!(
            loader.load(&dir.path().join("missing.so")),
            Err(PluginError::NotFound(_))
        ));
    }
}
