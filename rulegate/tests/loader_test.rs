//! Tests for plugin discovery and construction.
#![allow(clippy::unwrap_used)]

use rulegate::plugin::{
    DefaultModuleLoader, ExportedType, ModuleRegistry, PluginLoader, PluginLocations,
};
use rulegate::test_utils::{mixed_module, panicking_constructor, registry_loader, CallRule};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_only_constructible_analyzers_load() {
    let loader = registry_loader(vec![("plugins/mixed.so", mixed_module())]);
    let names: Vec<&str> = loader.plugins().iter().map(|p| p.type_name()).collect();
    assert_eq!(names.len(), 2);
    assert!(names[0].ends_with("CallRule"));
    assert!(names[1].ends_with("IdentRule"));

    let report = loader.report();
    assert_eq!(report.modules_loaded, 1);
    assert_eq!(report.plugins_constructed, 2);
    // Abstract bases and non-analyzer types are ignored silently.
    let skipped: Vec<_> = report
        .skipped
        .iter()
        .map(|s| s.type_name.as_deref().unwrap())
        .collect();
    assert_eq!(skipped, vec!["sample::ConfiguredRule", "sample::LicensedRule"]);
    assert!(report.skipped[0].reason.contains("no parameterless constructor"));
    assert!(report.skipped[1].reason.contains("missing license key"));
}

#[test]
fn test_constructor_panic_is_contained() {
    let loader = registry_loader(vec![(
        "plugins/fragile.so",
        vec![
            ExportedType::fallible("sample::Exploding", panicking_constructor),
            ExportedType::analyzer::<CallRule>(),
        ],
    )]);
    assert_eq!(loader.plugins().len(), 1);
    let skipped = &loader.report().skipped;
    assert_eq!(skipped.len(), 1);
    assert!(skipped[0].reason.contains("panicked"));
    assert!(skipped[0].reason.contains("constructor exploded"));
}

#[test]
fn test_bad_locations_are_skipped() {
    let dir = TempDir::new().unwrap();
    let notes = dir.path().join("notes.txt");
    fs::write(&notes, "not a module").unwrap();
    let garbage = dir.path().join("garbage.so");
    fs::write(&garbage, b"\x00\x01\x02").unwrap();

    let locations = PluginLocations::new();
    locations.extend([
        notes.clone(),
        garbage.clone(),
        dir.path().join("missing.so"),
    ]);
    locations.add("plugins/good.so");
    let registry = ModuleRegistry::new()
        .with_module("plugins/good.so", vec![ExportedType::analyzer::<CallRule>()]);
    let loader = PluginLoader::new(locations, DefaultModuleLoader::new(registry));

    assert_eq!(loader.plugins().len(), 1);
    let report = loader.report();
    assert_eq!(report.modules_loaded, 1);
    assert_eq!(report.skipped.len(), 3);
    assert!(report.skipped.iter().all(|s| s.type_name.is_none()));
    let reason_for = |path: &std::path::Path| {
        report
            .skipped
            .iter()
            .find(|s| s.location == path)
            .map(|s| s.reason.clone())
            .unwrap()
    };
    assert!(reason_for(&notes).contains("unsupported"));
    assert!(reason_for(&dir.path().join("missing.so")).contains("not found"));
    assert!(!reason_for(&garbage).is_empty());
}

#[test]
fn test_load_happens_once() {
    let locations = PluginLocations::new();
    locations.add("plugins/a.so");
    let registry = ModuleRegistry::new()
        .with_module("plugins/a.so", vec![ExportedType::analyzer::<CallRule>()])
        .with_module("plugins/late.so", vec![ExportedType::analyzer::<CallRule>()]);
    let loader = PluginLoader::new(locations.clone(), DefaultModuleLoader::new(registry));

    let first = loader.plugins().as_ptr();
    locations.add("plugins/late.so");
    assert_eq!(loader.plugins().as_ptr(), first);
    assert_eq!(loader.plugins().len(), 1);
    assert_eq!(locations.len(), 2);
}

#[test]
fn test_locations_load_in_sorted_order() {
    let loader = registry_loader(vec![
        ("plugins/b.so", vec![ExportedType::analyzer::<CallRule>()]),
        ("plugins/a.so", vec![ExportedType::analyzer::<CallRule>()]),
    ]);
    let locations: Vec<_> = loader
        .plugins()
        .iter()
        .map(|p| p.location().to_path_buf())
        .collect();
    assert_eq!(
        locations,
        vec![
            std::path::PathBuf::from("plugins/a.so"),
            std::path::PathBuf::from("plugins/b.so")
        ]
    );
}
