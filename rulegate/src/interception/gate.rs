//! The single choke point every plugin diagnostic passes through.

use super::remap::DescriptorMap;
use crate::diagnostic::{Diagnostic, DiagnosticSink};
use crate::policy::EnablementPolicy;
use serde::Serialize;
use std::sync::Arc;

/// What the gate did with one diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    /// Rewritten with the host-owned descriptor and forwarded.
    Forwarded,
    /// The id is disabled.
    DroppedDisabledId,
    /// The reporting plugin's family is disabled.
    DroppedDisabledFamily,
    /// The id is unknown or owned by another plugin instance.
    DroppedUnknown,
}

/// Per-plugin gate: the shared descriptor map, the shared policy, and the
/// load position and family of the plugin whose diagnostics go through it.
#[derive(Debug, Clone)]
pub struct ReportGate {
    descriptors: Arc<DescriptorMap>,
    policy: Arc<EnablementPolicy>,
    plugin: usize,
    family: Arc<str>,
}

impl ReportGate {
    /// Creates a gate for the plugin loaded at position `plugin`, of family `family`.
    pub fn new(
        descriptors: Arc<DescriptorMap>,
        policy: Arc<EnablementPolicy>,
        plugin: usize,
        family: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            descriptors,
            policy,
            plugin,
            family: family.into(),
        }
    }

    /// Load position of the plugin this gate belongs to.
    #[must_use]
    pub fn plugin(&self) -> usize {
        self.plugin
    }

    /// Family of the plugin this gate belongs to.
    #[must_use]
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Forwards `diagnostic` to `sink` under the host-owned descriptor, or
    /// drops it.
    ///
    /// Safe to call from any number of analysis threads; the only shared
    /// state read is the policy's concurrent sets.
    pub fn report_if_enabled(
        &self,
        sink: &dyn DiagnosticSink,
        diagnostic: Diagnostic,
    ) -> GateDecision {
        if self.policy.is_diagnostic_disabled(diagnostic.id()) {
            return GateDecision::DroppedDisabledId;
        }
        if self.policy.is_family_disabled(&self.family) {
            return GateDecision::DroppedDisabledFamily;
        }
        let Some(descriptor) = self.descriptors.resolve(diagnostic.id(), self.plugin) else {
            return GateDecision::DroppedUnknown;
        };

        sink.report(Diagnostic {
            descriptor: Arc::clone(descriptor),
            location: diagnostic.location,
            additional_locations: diagnostic.additional_locations,
            properties: diagnostic.properties,
            message_args: diagnostic.message_args,
            severity: diagnostic.severity,
        });
        GateDecision::Forwarded
    }
}

/// A sink that routes every report through a [`ReportGate`] into `inner`.
pub struct GatedSink<'g> {
    gate: &'g ReportGate,
    inner: &'g dyn DiagnosticSink,
}

impl<'g> GatedSink<'g> {
    /// Creates a gated view of `inner`.
    pub fn new(gate: &'g ReportGate, inner: &'g dyn DiagnosticSink) -> Self {
        Self { gate, inner }
    }
}

impl DiagnosticSink for GatedSink<'_> {
    fn report(&self, diagnostic: Diagnostic) {
        self.gate.report_if_enabled(self.inner, diagnostic);
    }
}
