//! Tests for runtime enablement: policy snapshots and the toggle scheduler
//! driving a live host.
#![allow(clippy::unwrap_used)]

use rulegate::constants::PLUGIN_HOST_FAMILY;
use rulegate::driver::AnalysisDriver;
use rulegate::host::HostEngine;
use rulegate::model::{AnalyzerOptions, CancellationToken};
use rulegate::plugin::ExportedType;
use rulegate::policy::EnablementPolicy;
use rulegate::scheduler::{ToggleSchedule, ToggleScheduler, ToggleState};
use rulegate::test_utils::{registry_loader, sample_compilation, CallRule};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_snapshots_are_sorted() {
    let policy = EnablementPolicy::new();
    policy.disable_ids(["Z1", "A1", "M1"]);
    assert!(policy.disable_family("zeta"));
    assert!(policy.disable_family("alpha"));
    assert!(!policy.disable_family("alpha"));

    assert_eq!(policy.disabled_ids(), vec!["A1", "M1", "Z1"]);
    assert_eq!(policy.disabled_families(), vec!["alpha", "zeta"]);

    policy.enable_ids(["M1"]);
    assert!(!policy.is_diagnostic_disabled("M1"));
    assert!(!policy.enable_family("missing"));
}

#[test]
fn test_scheduler_flips_host_between_runs() {
    let policy = Arc::new(EnablementPolicy::new());
    let loader = registry_loader(vec![(
        "plugins/a.so",
        vec![ExportedType::analyzer::<CallRule>()],
    )]);
    let host = Arc::new(HostEngine::new(loader, Arc::clone(&policy)));
    let driver = AnalysisDriver::new(AnalyzerOptions::default()).with_analyzer(host);
    let compilation = sample_compilation();

    let flips = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&flips);
    let scheduler = ToggleScheduler::new(
        Arc::clone(&policy),
        ToggleSchedule {
            interval: Duration::from_secs(3600),
            families: vec![PLUGIN_HOST_FAMILY.to_owned()],
            diagnostics: Vec::new(),
        },
    )
    .with_listener(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let run = |driver: &AnalysisDriver| {
        driver
            .run(&compilation, &CancellationToken::new())
            .unwrap()
            .diagnostics
            .len()
    };

    assert_eq!(run(&driver), 3);
    assert_eq!(scheduler.toggle_now(), ToggleState::Disabled);
    assert_eq!(run(&driver), 0);
    assert_eq!(scheduler.toggle_now(), ToggleState::Enabled);
    assert_eq!(run(&driver), 3);
    assert_eq!(flips.load(Ordering::SeqCst), 2);
}

#[test]
fn test_stopping_scheduler_leaves_policy_as_is() {
    let policy = Arc::new(EnablementPolicy::new());
    let handle = ToggleScheduler::new(
        Arc::clone(&policy),
        ToggleSchedule {
            interval: Duration::from_secs(3600),
            families: vec!["never".to_owned()],
            diagnostics: Vec::new(),
        },
    )
    .spawn()
    .unwrap();
    handle.stop();
    assert!(policy.disabled_families().is_empty());
}
