//! Shared-library plugin modules.
//!
//! A plugin crate is built as a `cdylib`/`dylib` against the same `rulegate`
//! version as the host and exports its table with [`crate::declare_plugin!`].
//! Trait objects cross the boundary, so host and plugin must also be built
//! with the same compiler.
#![allow(unsafe_code)]

use super::{ExportedType, ModuleLoader, PluginDeclaration, PluginError, PluginModule};
use crate::constants::{PLUGIN_API_VERSION, PLUGIN_DECLARATION_SYMBOL};
use libloading::{Library, Symbol};
use std::path::Path;
use std::sync::Arc;

/// Loads shared libraries exporting a [`PluginDeclaration`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DylibLoader;

/// A module backed by an open shared library.
pub struct DylibModule {
    name: String,
    exports: fn() -> Vec<ExportedType>,
    // Declared last: dropped after everything above.
    _library: Library,
}

impl PluginModule for DylibModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn exported_types(&self) -> Vec<ExportedType> {
        (self.exports)()
    }
}

impl std::fmt::Debug for DylibModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DylibModule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn expected_version() -> String {
    format!("plugin api {PLUGIN_API_VERSION} (rulegate {})", crate::VERSION)
}

impl ModuleLoader for DylibLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn PluginModule>, PluginError> {
        if !path.exists() {
            return Err(PluginError::NotFound(path.to_path_buf()));
        }

        // SAFETY: loading runs the library's initializers; plugin locations
        // are trusted configuration.
        let library = unsafe { Library::new(path) }.map_err(|e| PluginError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        // SAFETY: `declare_plugin!` exports the symbol as a `PluginDeclaration`
        // static; the pointer is only read while `library` is open.
        let declaration: PluginDeclaration = unsafe {
            let symbol: Symbol<'_, *const PluginDeclaration> = library
                .get(PLUGIN_DECLARATION_SYMBOL)
                .map_err(|_| PluginError::MissingDeclaration(path.to_path_buf()))?;
            let pointer: *const PluginDeclaration = *symbol;
            if pointer.is_null() {
                return Err(PluginError::MissingDeclaration(path.to_path_buf()));
            }
            *pointer
        };

        if declaration.api_version != PLUGIN_API_VERSION || declaration.core_version != crate::VERSION
        {
            return Err(PluginError::IncompatibleVersion {
                path: path.to_path_buf(),
                expected: expected_version(),
                found: format!(
                    "plugin api {} (rulegate {})",
                    declaration.api_version, declaration.core_version
                ),
            });
        }

        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        tracing::debug!(module = %name, "opened plugin library");

        Ok(Arc::new(DylibModule {
            name,
            exports: declaration.exports,
            _library: library,
        }))
    }
}
