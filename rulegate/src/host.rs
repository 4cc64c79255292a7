//! The host engine: native analyzers plus every loaded plugin, behind one
//! [`Analyzer`] facade.

use crate::analyzer::Analyzer;
use crate::constants::PLUGIN_HOST_FAMILY;
use crate::context::family::FamilyGate;
use crate::context::{DecoratingRegistrar, Registrar};
use crate::diagnostic::DiagnosticDescriptor;
use crate::interception::{intercept, DescriptorConflict, DescriptorMap, ReportGate};
use crate::plugin::{LoadReport, LoadedPlugin, PluginLoader};
use crate::policy::EnablementPolicy;
use std::sync::Arc;

/// Primary analyzer hosting native analyzers and external plugins.
///
/// Plugins are loaded and their descriptors remapped once, in [`HostEngine::new`].
/// During [`Analyzer::initialize`] each native analyzer registers through a
/// family gate for its own family; each plugin registers through a family
/// gate for [`PLUGIN_HOST_FAMILY`] and an intercepting registrar bound to its
/// own report gate.
pub struct HostEngine {
    natives: Vec<Arc<dyn Analyzer>>,
    gates: Vec<Arc<ReportGate>>,
    descriptors: Arc<DescriptorMap>,
    conflicts: Vec<DescriptorConflict>,
    policy: Arc<EnablementPolicy>,
    // Owns the plugins and their modules; dropped last.
    loader: PluginLoader,
}

impl HostEngine {
    /// Loads every plugin of `loader` and builds the descriptor map.
    pub fn new(loader: PluginLoader, policy: Arc<EnablementPolicy>) -> Self {
        let plugins = loader.plugins();
        let (descriptors, conflicts) = DescriptorMap::build(plugins);
        let descriptors = Arc::new(descriptors);
        let gates = plugins
            .iter()
            .enumerate()
            .map(|(index, plugin)| {
                Arc::new(ReportGate::new(
                    Arc::clone(&descriptors),
                    Arc::clone(&policy),
                    index,
                    plugin.family(),
                ))
            })
            .collect();
        tracing::debug!(
            plugins = plugins.len(),
            descriptors = descriptors.len(),
            conflicts = conflicts.len(),
            "host engine ready"
        );

        Self {
            natives: Vec::new(),
            gates,
            descriptors,
            conflicts,
            policy,
            loader,
        }
    }

    /// Builder-style method adding a native analyzer, gated by its family.
    #[must_use]
    pub fn with_native_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.natives.push(analyzer);
        self
    }

    /// The loaded plugins, in load order.
    pub fn plugins(&self) -> &[LoadedPlugin] {
        self.loader.plugins()
    }

    /// Number of loaded plugins.
    pub fn plugin_count(&self) -> usize {
        self.plugins().len()
    }

    /// What plugin loading did.
    pub fn load_report(&self) -> &LoadReport {
        self.loader.report()
    }

    /// Ids declared by more than one plugin.
    pub fn conflicts(&self) -> &[DescriptorConflict] {
        &self.conflicts
    }

    /// The remapped plugin descriptors.
    pub fn descriptor_map(&self) -> &DescriptorMap {
        &self.descriptors
    }

    /// Family whose gate governs `id`: the owning plugin's family for plugin
    /// descriptors, the declaring native's family otherwise.
    pub fn owning_family(&self, id: &str) -> Option<&str> {
        if let Some(entry) = self.descriptors.get(id) {
            return Some(entry.owner());
        }
        self.natives
            .iter()
            .find(|native| native.supported_diagnostics().iter().any(|d| d.id == id))
            .map(|native| native.family())
    }

    /// Whether a diagnostic with `id` would currently reach the output.
    ///
    /// Plugin descriptors are also off while [`PLUGIN_HOST_FAMILY`] is disabled.
    pub fn is_descriptor_enabled(&self, id: &str) -> bool {
        if self.policy.is_diagnostic_disabled(id) {
            return false;
        }
        let is_plugin = self.descriptors.get(id).is_some();
        if is_plugin && self.policy.is_family_disabled(PLUGIN_HOST_FAMILY) {
            return false;
        }
        self.owning_family(id)
            .is_none_or(|family| !self.policy.is_family_disabled(family))
    }

    /// The shared enablement policy.
    pub fn policy(&self) -> &Arc<EnablementPolicy> {
        &self.policy
    }
}

impl Analyzer for HostEngine {
    /// Native descriptors as declared plus remapped plugin descriptors, sorted by id.
    fn supported_diagnostics(&self) -> Vec<Arc<DiagnosticDescriptor>> {
        let mut all: Vec<Arc<DiagnosticDescriptor>> = self
            .natives
            .iter()
            .flat_map(|native| native.supported_diagnostics())
            .chain(self.descriptors.descriptors())
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    fn initialize(&self, registrar: &mut dyn Registrar) {
        for native in &self.natives {
            let gate = FamilyGate::new(native.family(), Arc::clone(&self.policy));
            let mut gated = DecoratingRegistrar::new(&mut *registrar, gate);
            native.initialize(&mut gated);
        }

        for (plugin, gate) in self.loader.plugins().iter().zip(&self.gates) {
            let host_gate = FamilyGate::new(PLUGIN_HOST_FAMILY, Arc::clone(&self.policy));
            let mut gated = DecoratingRegistrar::new(&mut *registrar, host_gate);
            let mut intercepting = intercept(&mut gated, Arc::clone(gate));
            plugin.analyzer().initialize(&mut intercepting);
        }
    }

    fn family(&self) -> &str {
        PLUGIN_HOST_FAMILY
    }
}

impl std::fmt::Debug for HostEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostEngine")
            .field("natives", &self.natives.len())
            .field("plugins", &self.gates.len())
            .field("descriptors", &self.descriptors.len())
            .field("conflicts", &self.conflicts)
            .finish_non_exhaustive()
    }
}
