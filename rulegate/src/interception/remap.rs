//! Host-owned copies of plugin descriptors.

use crate::constants::NOT_CONFIGURABLE_TAG;
use crate::diagnostic::DiagnosticDescriptor;
use crate::plugin::LoadedPlugin;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Derives the host-owned descriptor for a plugin-declared one.
///
/// Enabled-by-default is forced on and the [`NOT_CONFIGURABLE_TAG`] tag is
/// added (once), so only the enablement policy can silence the diagnostic.
/// Every other field is copied verbatim.
#[must_use]
pub fn remap(declared: &DiagnosticDescriptor) -> DiagnosticDescriptor {
    let mut remapped = declared.clone();
    remapped.is_enabled_by_default = true;
    if !remapped.has_tag(NOT_CONFIGURABLE_TAG) {
        remapped.custom_tags.push(NOT_CONFIGURABLE_TAG.to_owned());
    }
    remapped
}

/// A remapped descriptor together with the plugin that owns it.
#[derive(Debug, Clone)]
pub struct DescriptorEntry {
    descriptor: Arc<DiagnosticDescriptor>,
    plugin: usize,
    owner: Arc<str>,
}

impl DescriptorEntry {
    /// The remapped descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &Arc<DiagnosticDescriptor> {
        &self.descriptor
    }

    /// Load position of the owning plugin.
    #[must_use]
    pub fn plugin(&self) -> usize {
        self.plugin
    }

    /// Family of the owning plugin.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }
}

/// Two plugins declared the same diagnostic id; the later one was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorConflict {
    /// The contested diagnostic id.
    pub id: String,
    /// Family that keeps the id.
    pub owner: String,
    /// Location of the plugin that keeps the id.
    pub owner_location: PathBuf,
    /// Family whose declaration was rejected.
    pub rejected: String,
    /// Location of the rejected plugin.
    pub rejected_location: PathBuf,
}

impl DescriptorConflict {
    /// True when both declarations come from the same analyzer family, e.g.
    /// two versions of one plugin on the search path.
    #[must_use]
    pub fn is_duplicate_analyzer(&self) -> bool {
        self.owner == self.rejected
    }
}

/// Read-only map from plugin-declared id to remapped descriptor and owner.
///
/// Built once when plugin loading completes; lookups need no synchronization.
#[derive(Debug, Default)]
pub struct DescriptorMap {
    entries: FxHashMap<String, DescriptorEntry>,
}

impl DescriptorMap {
    /// Builds the map in plugin load order.
    ///
    /// The first plugin to declare an id owns it. Any later plugin declaring
    /// the same id, whatever its family, is recorded as a conflict and its
    /// diagnostics with that id will be dropped by the report gate. Ownership
    /// is keyed on the plugin's position in `plugins`.
    pub fn build(plugins: &[LoadedPlugin]) -> (Self, Vec<DescriptorConflict>) {
        let mut entries: FxHashMap<String, DescriptorEntry> = FxHashMap::default();
        let mut conflicts = Vec::new();

        for (index, plugin) in plugins.iter().enumerate() {
            let family: Arc<str> = Arc::from(plugin.family());
            for declared in plugin.analyzer().supported_diagnostics() {
                match entries.get(&declared.id) {
                    // A plugin listing one id twice.
                    Some(existing) if existing.plugin == index => {}
                    Some(existing) => {
                        let conflict = DescriptorConflict {
                            id: declared.id.clone(),
                            owner: existing.owner.to_string(),
                            owner_location: plugins[existing.plugin].location().to_path_buf(),
                            rejected: family.to_string(),
                            rejected_location: plugin.location().to_path_buf(),
                        };
                        if conflict.is_duplicate_analyzer() {
                            tracing::warn!(
                                id = %conflict.id,
                                family = %family,
                                kept = %conflict.owner_location.display(),
                                rejected = %conflict.rejected_location.display(),
                                "analyzer loaded from more than one location; keeping the first"
                            );
                        } else {
                            tracing::warn!(
                                id = %conflict.id,
                                owner = %conflict.owner,
                                rejected = %conflict.rejected,
                                "diagnostic id declared by more than one plugin; keeping the first"
                            );
                        }
                        conflicts.push(conflict);
                    }
                    None => {
                        entries.insert(
                            declared.id.clone(),
                            DescriptorEntry {
                                descriptor: Arc::new(remap(&declared)),
                                plugin: index,
                                owner: Arc::clone(&family),
                            },
                        );
                    }
                }
            }
        }

        (Self { entries }, conflicts)
    }

    /// Entry for `id`, whoever owns it.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&DescriptorEntry> {
        self.entries.get(id)
    }

    /// Remapped descriptor for `id` if the plugin loaded at `plugin` owns it.
    #[must_use]
    pub fn resolve(&self, id: &str, plugin: usize) -> Option<&Arc<DiagnosticDescriptor>> {
        self.entries
            .get(id)
            .filter(|entry| entry.plugin == plugin)
            .map(DescriptorEntry::descriptor)
    }

    /// Number of mapped ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no plugin declared anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All remapped descriptors, sorted by id.
    #[must_use]
    pub fn descriptors(&self) -> Vec<Arc<DiagnosticDescriptor>> {
        let mut all: Vec<_> = self
            .entries
            .values()
            .map(|entry| Arc::clone(&entry.descriptor))
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;

    #[test]
    fn test_remap_forces_enabled_and_tags_once() {
        let declared = DiagnosticDescriptor::new("A001", "t", "m {0}", "Style", Severity::Info)
            .enabled_by_default(false)
            .with_help_link("https://example.invalid/A001")
            .with_tag("Custom");
        let remapped = remap(&declared);
        assert!(remapped.is_enabled_by_default);
        assert_eq!(remapped.custom_tags, vec!["Custom", NOT_CONFIGURABLE_TAG]);
        assert_eq!(remapped.id, declared.id);
        assert_eq!(remapped.message_format, declared.message_format);
        assert_eq!(remapped.default_severity, Severity::Info);
        assert_eq!(remapped.help_link, declared.help_link);

        let twice = remap(&remapped);
        assert_eq!(twice.custom_tags.len(), 2);
    }
}
