//! Fixtures shared by unit and integration tests: a small two-file
//! compilation and a handful of scripted analyzers and plugin modules.

use crate::analyzer::Analyzer;
use crate::context::{ActionContext, Registrar, RegistrarExt, StartContext};
use crate::diagnostic::{Diagnostic, DiagnosticDescriptor, Location, Severity};
use crate::model::{
    CodeBlock, Compilation, SourceTree, SymbolKind, SyntaxKind, SyntaxNode, TextRange, TreeId,
};
use crate::plugin::{DefaultModuleLoader, ExportedType, ModuleRegistry, PluginLoader, PluginLocations};
use std::path::PathBuf;
use std::sync::Arc;

/// Call expression nodes.
pub const CALL: SyntaxKind = SyntaxKind::new("CallExpression");
/// Identifier nodes.
pub const IDENT: SyntaxKind = SyntaxKind::new("Identifier");

/// Header marking a tree as generated in [`sample_compilation`].
pub const GENERATED_HEADER: &str = "// @generated";

/// Recognizer matching [`GENERATED_HEADER`].
pub fn is_generated_header(tree: &SourceTree) -> bool {
    tree.text().starts_with(GENERATED_HEADER)
}

/// Two trees: `src/lib.rs` with two calls, and a generated `src/gen.rs` with
/// one. Each tree has one method symbol owning one code block.
#[must_use]
pub fn sample_compilation() -> Arc<Compilation> {
    let lib = SourceTree::new("src/lib.rs", "fn main() { call(x); call(y); }")
        .with_node(CALL, 12..19)
        .with_node(IDENT, 17..18)
        .with_node(CALL, 21..28)
        .with_node(IDENT, 26..27);
    let generated = SourceTree::new("src/gen.rs", "// @generated\nfn gen() { call(z); }")
        .with_node(CALL, 25..32)
        .with_node(IDENT, 30..31);

    Compilation::builder("sample")
        .tree(lib)
        .tree(generated)
        .symbol("main", SymbolKind::Method, TreeId(0), 3..7)
        .symbol("gen", SymbolKind::Method, TreeId(1), 17..20)
        .code_block(crate::model::SymbolId(0), TreeId(0), 10..31)
        .code_block(crate::model::SymbolId(1), TreeId(1), 23..35)
        .build()
}

/// A warning descriptor with the given id.
#[must_use]
pub fn descriptor(id: &str) -> Arc<DiagnosticDescriptor> {
    Arc::new(DiagnosticDescriptor::new(
        id,
        format!("Rule {id}"),
        "{0} flagged",
        "Testing",
        Severity::Warning,
    ))
}

fn report_at(ctx: &ActionContext<'_, SyntaxNode>, descriptor: &Arc<DiagnosticDescriptor>) {
    let text = ctx
        .tree()
        .and_then(|tree| tree.slice(ctx.node().range()))
        .unwrap_or_default()
        .to_owned();
    ctx.report_diagnostic(Diagnostic::create(
        Arc::clone(descriptor),
        ctx.node_location(),
        vec![text],
    ));
}

/// Reports one diagnostic per node of a kind, with a configurable family.
#[derive(Debug, Clone)]
pub struct NodeReporter {
    descriptor: Arc<DiagnosticDescriptor>,
    kind: SyntaxKind,
    family: String,
}

impl NodeReporter {
    /// Reports `id` on every node of `kind`. The family defaults to the id.
    #[must_use]
    pub fn new(id: &str, kind: SyntaxKind) -> Self {
        Self {
            descriptor: descriptor(id),
            kind,
            family: id.to_owned(),
        }
    }

    /// Builder-style method overriding the family.
    #[must_use]
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = family.into();
        self
    }
}

impl Analyzer for NodeReporter {
    fn supported_diagnostics(&self) -> Vec<Arc<DiagnosticDescriptor>> {
        vec![Arc::clone(&self.descriptor)]
    }

    fn initialize(&self, registrar: &mut dyn Registrar) {
        let descriptor = Arc::clone(&self.descriptor);
        registrar.register_syntax_node_action(move |ctx| report_at(ctx, &descriptor), &[self.kind]);
    }

    fn family(&self) -> &str {
        &self.family
    }
}

/// Plugin reporting `A001` on every call.
#[derive(Debug, Clone)]
pub struct CallRule(NodeReporter);

impl Default for CallRule {
    fn default() -> Self {
        Self(NodeReporter::new("A001", CALL))
    }
}

impl Analyzer for CallRule {
    fn supported_diagnostics(&self) -> Vec<Arc<DiagnosticDescriptor>> {
        self.0.supported_diagnostics()
    }

    fn initialize(&self, registrar: &mut dyn Registrar) {
        self.0.initialize(registrar);
    }
}

/// Plugin reporting `B002` on every identifier.
#[derive(Debug, Clone)]
pub struct IdentRule(NodeReporter);

impl Default for IdentRule {
    fn default() -> Self {
        Self(NodeReporter::new("B002", IDENT))
    }
}

impl Analyzer for IdentRule {
    fn supported_diagnostics(&self) -> Vec<Arc<DiagnosticDescriptor>> {
        self.0.supported_diagnostics()
    }

    fn initialize(&self, registrar: &mut dyn Registrar) {
        self.0.initialize(registrar);
    }
}

/// Plugin that also claims `B002`, reporting it on every call.
#[derive(Debug, Clone)]
pub struct ShadowRule(NodeReporter);

impl Default for ShadowRule {
    fn default() -> Self {
        Self(NodeReporter::new("B002", CALL))
    }
}

impl Analyzer for ShadowRule {
    fn supported_diagnostics(&self) -> Vec<Arc<DiagnosticDescriptor>> {
        self.0.supported_diagnostics()
    }

    fn initialize(&self, registrar: &mut dyn Registrar) {
        self.0.initialize(registrar);
    }
}

/// Plugin that declares `R001` but reports the undeclared `R999`.
#[derive(Debug, Clone, Default)]
pub struct RogueRule;

impl Analyzer for RogueRule {
    fn supported_diagnostics(&self) -> Vec<Arc<DiagnosticDescriptor>> {
        vec![descriptor("R001")]
    }

    fn initialize(&self, registrar: &mut dyn Registrar) {
        let undeclared = descriptor("R999");
        registrar.register_syntax_node_action(move |ctx| report_at(ctx, &undeclared), &[CALL]);
    }
}

/// Plugin that only registers from nested scopes.
///
/// * `N001` on every call, from a compilation-start scope;
/// * `N002` once per compilation, from a compilation-end action;
/// * `N003` once per code block, from a code-block-end action.
#[derive(Debug, Clone, Default)]
pub struct NestedRule;

impl Analyzer for NestedRule {
    fn supported_diagnostics(&self) -> Vec<Arc<DiagnosticDescriptor>> {
        vec![descriptor("N001"), descriptor("N002"), descriptor("N003")]
    }

    fn initialize(&self, registrar: &mut dyn Registrar) {
        registrar.register_compilation_start_action(|start: &mut StartContext<'_, Compilation>| {
            let on_call = descriptor("N001");
            start.register_syntax_node_action(move |ctx| report_at(ctx, &on_call), &[CALL]);
            let at_end = descriptor("N002");
            start.register_compilation_end_action(move |ctx| {
                ctx.report_diagnostic(Diagnostic::create(
                    Arc::clone(&at_end),
                    Location::none(),
                    vec![ctx.compilation().name().to_owned()],
                ));
            });
        });
        registrar.register_code_block_start_action(|start: &mut StartContext<'_, CodeBlock>| {
            let per_block = descriptor("N003");
            start.register_code_block_end_action(move |ctx| {
                let name = ctx.owning_symbol().map(|s| s.name().to_owned()).unwrap_or_default();
                let location = ctx
                    .owning_symbol()
                    .map_or_else(Location::none, |s| s.location().clone());
                ctx.report_diagnostic(Diagnostic::create(
                    Arc::clone(&per_block),
                    location,
                    vec![name],
                ));
            });
        });
    }
}

/// Plugin reporting from every leaf action kind, each diagnostic carrying an
/// `action` property and the first line of `src/lib.rs` as secondary location:
///
/// * `S001` per method symbol;
/// * `M001` per tree from a semantic model action;
/// * `T001` per tree from a syntax tree action;
/// * `C001` once from a compilation action;
/// * `K001` per code block.
#[derive(Debug, Clone, Default)]
pub struct EveryActionRule;

fn report_with_extras<S>(
    ctx: &ActionContext<'_, S>,
    id: &str,
    location: Location,
    action: &str,
) {
    let secondary = ctx
        .compilation()
        .trees()
        .first()
        .map(|tree| tree.location(TextRange::new(0, 2)))
        .into_iter()
        .collect();
    ctx.report_diagnostic(
        Diagnostic::create(descriptor(id), location, vec![action.to_owned()])
            .with_additional_locations(secondary)
            .with_property("action", action),
    );
}

impl Analyzer for EveryActionRule {
    fn supported_diagnostics(&self) -> Vec<Arc<DiagnosticDescriptor>> {
        ["S001", "M001", "T001", "C001", "K001"]
            .into_iter()
            .map(descriptor)
            .collect()
    }

    fn initialize(&self, registrar: &mut dyn Registrar) {
        registrar.register_symbol_action(
            |ctx| report_with_extras(ctx, "S001", ctx.symbol().location().clone(), "symbol"),
            &[SymbolKind::Method],
        );
        registrar.register_semantic_model_action(|ctx| {
            let location = ctx.source_tree().location(TextRange::new(0, 0));
            report_with_extras(ctx, "M001", location, "semantic_model");
        });
        registrar.register_syntax_tree_action(|ctx| {
            let location = ctx.source_tree().location(TextRange::new(0, 0));
            report_with_extras(ctx, "T001", location, "syntax_tree");
        });
        registrar.register_compilation_action(|ctx| {
            report_with_extras(ctx, "C001", Location::none(), "compilation");
        });
        registrar.register_code_block_action(|ctx| {
            let block = ctx.code_block();
            let location = ctx
                .compilation()
                .tree(block.tree())
                .map_or_else(Location::none, |tree| tree.location(block.range()));
            report_with_extras(ctx, "K001", location, "code_block");
        });
    }
}

/// Constructor of a plugin whose construction fails.
pub fn failing_constructor() -> anyhow::Result<Box<dyn Analyzer>> {
    anyhow::bail!("missing license key")
}

/// Constructor of a plugin whose construction panics.
#[allow(clippy::panic)]
pub fn panicking_constructor() -> anyhow::Result<Box<dyn Analyzer>> {
    panic!("constructor exploded")
}

/// Export table of a module mixing loadable and non-loadable types:
/// [`CallRule`] and [`IdentRule`] load, the other four are skipped or ignored.
#[must_use]
pub fn mixed_module() -> Vec<ExportedType> {
    vec![
        ExportedType::abstract_analyzer("sample::BaseRule"),
        ExportedType::analyzer::<CallRule>(),
        ExportedType::other("sample::Helpers"),
        ExportedType::parameterized("sample::ConfiguredRule"),
        ExportedType::fallible("sample::LicensedRule", failing_constructor),
        ExportedType::analyzer::<IdentRule>(),
    ]
}

/// A loader over in-process modules, one location per `(path, exports)` pair.
#[must_use]
pub fn registry_loader(modules: Vec<(&str, Vec<ExportedType>)>) -> PluginLoader {
    let locations = PluginLocations::new();
    let mut registry = ModuleRegistry::new();
    for (path, types) in modules {
        locations.add(PathBuf::from(path));
        registry.register(path, types);
    }
    PluginLoader::new(locations, DefaultModuleLoader::new(registry))
}
