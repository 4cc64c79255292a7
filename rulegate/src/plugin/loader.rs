use super::{Constructor, DefaultModuleLoader, LoadedPlugin, ModuleLoader, PluginError, TypeKind};
use dashmap::DashSet;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared set of plugin artifact locations.
///
/// Populated by the embedding host (usually from configuration) before the
/// first load. Locations added after a loader has consumed the set are kept
/// but have no effect on that loader.
#[derive(Debug, Clone, Default)]
pub struct PluginLocations {
    paths: Arc<DashSet<PathBuf>>,
    consumed: Arc<AtomicBool>,
}

impl PluginLocations {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one location.
    pub fn add(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.consumed.load(Ordering::Acquire) {
            tracing::debug!(
                path = %path.display(),
                "plugin location added after loading; ignored by existing loaders"
            );
        }
        self.paths.insert(path);
    }

    /// Adds every location in `paths`.
    pub fn extend<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for path in paths {
            self.add(path);
        }
    }

    /// Number of locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns true if no location was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Locations in sorted order, which is the load order.
    #[must_use]
    pub fn sorted(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.paths.iter().map(|p| p.key().clone()).collect();
        paths.sort();
        paths
    }

    fn consume(&self) -> Vec<PathBuf> {
        self.consumed.store(true, Ordering::Release);
        self.sorted()
    }
}

/// A location or exported type that produced no plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    /// Module location.
    pub location: PathBuf,
    /// Exported type, `None` when the whole module failed.
    pub type_name: Option<String>,
    /// Why it was skipped.
    pub reason: String,
}

/// Outcome of one load.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    /// Locations that were opened successfully.
    pub modules_loaded: usize,
    /// Analyzers constructed.
    pub plugins_constructed: usize,
    /// Everything that was skipped, in load order.
    pub skipped: Vec<SkippedEntry>,
}

impl LoadReport {
    fn skip(&mut self, location: &Path, type_name: Option<&str>, error: &PluginError) {
        tracing::warn!(
            location = %location.display(),
            type_name = type_name.unwrap_or("-"),
            "skipping plugin: {error}"
        );
        self.skipped.push(SkippedEntry {
            location: location.to_path_buf(),
            type_name: type_name.map(str::to_owned),
            reason: error.to_string(),
        });
    }
}

struct LoadedSet {
    plugins: Vec<LoadedPlugin>,
    report: LoadReport,
}

/// Discovers and constructs plugins, at most once per loader.
pub struct PluginLoader {
    locations: PluginLocations,
    modules: Box<dyn ModuleLoader>,
    loaded: OnceLock<LoadedSet>,
}

impl PluginLoader {
    /// Creates a loader over `locations` opening modules with `modules`.
    pub fn new(locations: PluginLocations, modules: impl ModuleLoader + 'static) -> Self {
        Self {
            locations,
            modules: Box::new(modules),
            loaded: OnceLock::new(),
        }
    }

    /// Creates a loader using [`DefaultModuleLoader`] with an empty registry.
    #[must_use]
    pub fn with_default_loader(locations: PluginLocations) -> Self {
        Self::new(locations, DefaultModuleLoader::default())
    }

    /// The constructed plugins, in load order. Loads on first call.
    pub fn plugins(&self) -> &[LoadedPlugin] {
        &self.load().plugins
    }

    /// What the load did. Loads on first call.
    pub fn report(&self) -> &LoadReport {
        &self.load().report
    }

    fn load(&self) -> &LoadedSet {
        self.loaded.get_or_init(|| self.load_all())
    }

    fn load_all(&self) -> LoadedSet {
        let mut plugins = Vec::new();
        let mut report = LoadReport::default();

        for location in self.locations.consume() {
            let module = match self.modules.load(&location) {
                Ok(module) => module,
                Err(error) => {
                    report.skip(&location, None, &error);
                    continue;
                }
            };
            report.modules_loaded += 1;

            for exported in module.exported_types() {
                match exported.kind {
                    TypeKind::Analyzer => {}
                    TypeKind::AbstractAnalyzer | TypeKind::Other => continue,
                }
                let result = exported
                    .constructor
                    .ok_or_else(|| PluginError::NoParameterlessConstructor(exported.name.to_owned()))
                    .and_then(|constructor| construct(exported.name, constructor));
                match result {
                    Ok(analyzer) => plugins.push(LoadedPlugin::new(
                        analyzer,
                        exported.name,
                        location.clone(),
                        Arc::clone(&module),
                    )),
                    Err(error) => report.skip(&location, Some(exported.name), &error),
                }
            }
        }

        report.plugins_constructed = plugins.len();
        tracing::info!(
            modules = report.modules_loaded,
            plugins = report.plugins_constructed,
            skipped = report.skipped.len(),
            "plugin loading finished"
        );
        LoadedSet { plugins, report }
    }
}

impl std::fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLoader")
            .field("locations", &self.locations.len())
            .field("loaded", &self.loaded.get().is_some())
            .finish_non_exhaustive()
    }
}

fn construct(
    type_name: &str,
    constructor: Constructor,
) -> Result<Box<dyn crate::analyzer::Analyzer>, PluginError> {
    match panic::catch_unwind(AssertUnwindSafe(|| constructor.invoke())) {
        Ok(Ok(analyzer)) => Ok(analyzer),
        Ok(Err(error)) => Err(PluginError::ConstructionFailed {
            type_name: type_name.to_owned(),
            message: format!("{error:#}"),
        }),
        Err(payload) => Err(PluginError::ConstructionPanicked {
            type_name: type_name.to_owned(),
            message: panic_message(&*payload),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locations_are_sorted_and_deduplicated() {
        let locations = PluginLocations::new();
        locations.extend(["b.so", "a.so", "b.so"]);
        assert_eq!(
            locations.sorted(),
            vec![PathBuf::from("a.so"), PathBuf::from("b.so")]
        );
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload = panic::catch_unwind(|| std::panic::panic_any("boom")).unwrap_err();
        assert_eq!(panic_message(&*payload), "boom");
        let payload = panic::catch_unwind(|| std::panic::panic_any(7_u8)).unwrap_err();
        assert_eq!(panic_message(&*payload), "non-string panic payload");
    }
}
