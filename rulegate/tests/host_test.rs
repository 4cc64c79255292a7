//! Tests for the host engine: composition of natives and plugins, family
//! gating and descriptor collisions.
#![allow(clippy::unwrap_used)]

use rulegate::analyzer::Analyzer;
use rulegate::constants::{NOT_CONFIGURABLE_TAG, PLUGIN_HOST_FAMILY};
use rulegate::diagnostic::Diagnostic;
use rulegate::driver::AnalysisDriver;
use rulegate::host::HostEngine;
use rulegate::model::{AnalyzerOptions, CancellationToken};
use rulegate::plugin::ExportedType;
use rulegate::policy::EnablementPolicy;
use rulegate::test_utils::{
    registry_loader, sample_compilation, CallRule, IdentRule, NodeReporter, ShadowRule, CALL,
};
use std::path::Path;
use std::sync::Arc;

fn count(diagnostics: &[Diagnostic], id: &str) -> usize {
    diagnostics.iter().filter(|d| d.id() == id).count()
}

fn composed(policy: &Arc<EnablementPolicy>) -> Arc<HostEngine> {
    let loader = registry_loader(vec![
        ("plugins/a.so", vec![ExportedType::analyzer::<CallRule>()]),
        ("plugins/b.so", vec![ExportedType::analyzer::<IdentRule>()]),
    ]);
    Arc::new(
        HostEngine::new(loader, Arc::clone(policy))
            .with_native_analyzer(Arc::new(NodeReporter::new("X100", CALL).with_family("natives"))),
    )
}

#[test]
fn test_supported_diagnostics_merge_natives_and_plugins() {
    let policy = Arc::new(EnablementPolicy::new());
    let host = composed(&policy);
    let supported = host.supported_diagnostics();
    let ids: Vec<&str> = supported.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["A001", "B002", "X100"]);

    // Natives are reported as declared; only plugin descriptors are remapped.
    assert!(supported[0].has_tag(NOT_CONFIGURABLE_TAG));
    assert!(!supported[2].has_tag(NOT_CONFIGURABLE_TAG));
    assert_eq!(host.family(), PLUGIN_HOST_FAMILY);
}

#[test]
fn test_host_family_silences_every_plugin() {
    let policy = Arc::new(EnablementPolicy::new());
    let driver = AnalysisDriver::new(AnalyzerOptions::default()).with_analyzer(composed(&policy));
    let compilation = sample_compilation();

    policy.disable_family(PLUGIN_HOST_FAMILY);
    let run = driver.run(&compilation, &CancellationToken::new()).unwrap();
    assert_eq!(count(&run.diagnostics, "A001"), 0);
    assert_eq!(count(&run.diagnostics, "B002"), 0);
    assert_eq!(count(&run.diagnostics, "X100"), 3);

    assert!(policy.enable_family(PLUGIN_HOST_FAMILY));
    let run = driver.run(&compilation, &CancellationToken::new()).unwrap();
    assert_eq!(count(&run.diagnostics, "A001"), 3);
    assert_eq!(count(&run.diagnostics, "B002"), 3);
}

#[test]
fn test_plugin_and_native_families_are_independent() {
    let policy = Arc::new(EnablementPolicy::new());
    let host = composed(&policy);
    let call_family = host.plugins()[0].family().to_owned();
    let driver = AnalysisDriver::new(AnalyzerOptions::default()).with_analyzer(host);
    let compilation = sample_compilation();

    policy.disable_family(call_family);
    policy.disable_family("natives");
    let run = driver.run(&compilation, &CancellationToken::new()).unwrap();
    assert_eq!(count(&run.diagnostics, "A001"), 0);
    assert_eq!(count(&run.diagnostics, "X100"), 0);
    assert_eq!(count(&run.diagnostics, "B002"), 3);
}

#[test]
fn test_descriptor_collision_keeps_first_plugin() {
    let policy = Arc::new(EnablementPolicy::new());
    let loader = registry_loader(vec![
        ("plugins/a.so", vec![ExportedType::analyzer::<IdentRule>()]),
        ("plugins/b.so", vec![ExportedType::analyzer::<ShadowRule>()]),
    ]);
    let host = Arc::new(HostEngine::new(loader, Arc::clone(&policy)));

    assert_eq!(host.plugin_count(), 2);
    assert_eq!(host.conflicts().len(), 1);
    let conflict = &host.conflicts()[0];
    assert_eq!(conflict.id, "B002");
    assert_eq!(conflict.owner, host.plugins()[0].family());
    assert_eq!(conflict.rejected, host.plugins()[1].family());
    assert_eq!(conflict.rejected_location, host.plugins()[1].location());
    assert!(!conflict.is_duplicate_analyzer());
    assert_eq!(host.supported_diagnostics().len(), 1);

    let run = AnalysisDriver::new(AnalyzerOptions::default())
        .with_analyzer(host)
        .run(&sample_compilation(), &CancellationToken::new())
        .unwrap();
    // Only the owner's identifiers are reported, never the shadow's calls.
    assert_eq!(count(&run.diagnostics, "B002"), 3);
    assert!(run
        .diagnostics
        .iter()
        .all(|d| d.message() != "call(x) flagged"));
}

#[test]
fn test_same_analyzer_from_two_locations_reports_once() {
    let policy = Arc::new(EnablementPolicy::new());
    let loader = registry_loader(vec![
        ("plugins/v1/rules.so", vec![ExportedType::analyzer::<CallRule>()]),
        ("plugins/v2/rules.so", vec![ExportedType::analyzer::<CallRule>()]),
    ]);
    let host = Arc::new(HostEngine::new(loader, Arc::clone(&policy)));

    assert_eq!(host.plugin_count(), 2);
    assert_eq!(host.conflicts().len(), 1);
    let conflict = &host.conflicts()[0];
    assert_eq!(conflict.id, "A001");
    assert!(conflict.is_duplicate_analyzer());
    assert_eq!(conflict.owner_location, Path::new("plugins/v1/rules.so"));
    assert_eq!(conflict.rejected_location, Path::new("plugins/v2/rules.so"));
    assert_eq!(host.descriptor_map().get("A001").unwrap().plugin(), 0);

    let run = AnalysisDriver::new(AnalyzerOptions::default())
        .with_analyzer(host)
        .run(&sample_compilation(), &CancellationToken::new())
        .unwrap();
    assert_eq!(count(&run.diagnostics, "A001"), 3);
}

#[test]
fn test_load_report_is_exposed() {
    let policy = Arc::new(EnablementPolicy::new());
    let host = composed(&policy);
    let report = host.load_report();
    assert_eq!(report.modules_loaded, 2);
    assert_eq!(report.plugins_constructed, 2);
    assert!(report.skipped.is_empty());
    assert_eq!(host.plugins()[0].module_name(), "a.so");
}
