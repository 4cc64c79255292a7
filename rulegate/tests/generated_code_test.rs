//! Tests for the non-generated registration helpers, run natively and
//! through the plugin host.
#![allow(clippy::unwrap_used)]

use rulegate::analyzer::Analyzer;
use rulegate::context::generated::{
    register_code_block_start_action_in_non_generated,
    register_syntax_node_action_in_non_generated, register_syntax_tree_action_in_non_generated,
    GeneratedCodeCache,
};
use rulegate::context::{Registrar, RegistrarExt, StartContext};
use rulegate::diagnostic::{Diagnostic, DiagnosticDescriptor, Location};
use rulegate::driver::AnalysisDriver;
use rulegate::model::{AnalyzerOptions, CancellationToken, CodeBlock};
use rulegate::test_utils::{descriptor, is_generated_header, sample_compilation, CALL, IDENT};
use std::sync::Arc;

struct SkipsGenerated {
    cache: Arc<GeneratedCodeCache>,
}

impl SkipsGenerated {
    fn new() -> Self {
        Self {
            cache: Arc::new(GeneratedCodeCache::new(is_generated_header)),
        }
    }
}

impl Analyzer for SkipsGenerated {
    fn supported_diagnostics(&self) -> Vec<Arc<DiagnosticDescriptor>> {
        ["G001", "G002", "G003", "G004"]
            .into_iter()
            .map(descriptor)
            .collect()
    }

    fn initialize(&self, registrar: &mut dyn Registrar) {
        let on_call = descriptor("G001");
        register_syntax_node_action_in_non_generated(
            registrar,
            &self.cache,
            move |ctx| {
                ctx.report_diagnostic(Diagnostic::create(
                    Arc::clone(&on_call),
                    ctx.node_location(),
                    Vec::new(),
                ));
            },
            &[CALL],
        );

        let per_tree = descriptor("G002");
        register_syntax_tree_action_in_non_generated(registrar, &self.cache, move |ctx| {
            ctx.report_diagnostic(Diagnostic::create(
                Arc::clone(&per_tree),
                ctx.source_tree().location((0..1).into()),
                Vec::new(),
            ));
        });

        let per_block = descriptor("G003");
        register_code_block_start_action_in_non_generated(
            registrar,
            &self.cache,
            move |start: &mut StartContext<'_, CodeBlock>| {
                let per_block = Arc::clone(&per_block);
                start.register_code_block_end_action(move |ctx| {
                    ctx.report_diagnostic(Diagnostic::create(
                        Arc::clone(&per_block),
                        Location::none(),
                        Vec::new(),
                    ));
                });
            },
        );

        // Plain registration; filtering happens at report time.
        let cache = Arc::clone(&self.cache);
        let on_ident = descriptor("G004");
        registrar.register_syntax_node_action(
            move |ctx| {
                cache.report_if_non_generated(
                    ctx,
                    Diagnostic::create(Arc::clone(&on_ident), ctx.node_location(), Vec::new()),
                );
            },
            &[IDENT],
        );
    }
}

fn count(diagnostics: &[Diagnostic], id: &str) -> usize {
    diagnostics.iter().filter(|d| d.id() == id).count()
}

#[test]
fn test_generated_tree_is_skipped() {
    let analyzer = Arc::new(SkipsGenerated::new());
    let cache = Arc::clone(&analyzer.cache);
    let driver = AnalysisDriver::new(AnalyzerOptions::default()).with_analyzer(analyzer);
    let compilation = sample_compilation();
    let run = driver.run(&compilation, &CancellationToken::new()).unwrap();

    assert!(run.registration_errors.is_empty());
    assert_eq!(count(&run.diagnostics, "G001"), 2);
    assert_eq!(count(&run.diagnostics, "G002"), 1);
    assert_eq!(count(&run.diagnostics, "G003"), 1);
    assert_eq!(count(&run.diagnostics, "G004"), 2);
    assert!(run
        .diagnostics
        .iter()
        .filter_map(|d| d.location.file.as_deref())
        .all(|file| file.ends_with("lib.rs")));
    assert_eq!(cache.cached_compilations(), 1);

    drop(run);
    drop(compilation);
    cache.purge();
    assert_eq!(cache.cached_compilations(), 0);
}

#[test]
fn test_helpers_compose_with_host_interception() {
    use rulegate::host::HostEngine;
    use rulegate::plugin::{
        DefaultModuleLoader, ExportedType, ModuleRegistry, PluginLoader, PluginLocations,
    };
    use rulegate::policy::EnablementPolicy;

    fn build() -> anyhow::Result<Box<dyn Analyzer>> {
        Ok(Box::new(SkipsGenerated::new()))
    }

    let locations = PluginLocations::new();
    locations.add("plugins/gen.so");
    let registry = ModuleRegistry::new()
        .with_module("plugins/gen.so", vec![ExportedType::fallible("tests::SkipsGenerated", build)]);
    let loader = PluginLoader::new(locations, DefaultModuleLoader::new(registry));
    let policy = Arc::new(EnablementPolicy::new());
    policy.disable_ids(["G004"]);
    let host = Arc::new(HostEngine::new(loader, policy));

    let run = AnalysisDriver::new(AnalyzerOptions::default())
        .with_analyzer(host)
        .run(&sample_compilation(), &CancellationToken::new())
        .unwrap();
    assert_eq!(count(&run.diagnostics, "G001"), 2);
    assert_eq!(count(&run.diagnostics, "G002"), 1);
    assert_eq!(count(&run.diagnostics, "G003"), 1);
    assert_eq!(count(&run.diagnostics, "G004"), 0);
}
