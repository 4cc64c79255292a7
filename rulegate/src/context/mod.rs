//! Registration capability offered to analyzers at initialization time.
//!
//! An analyzer never talks to the analysis driver directly. It receives a
//! [`Registrar`] and installs callbacks on it, one [`Registration`] per
//! action kind. When the driver later invokes a callback it passes an
//! [`ActionContext`] (leaf actions) or a [`StartContext`] (scoped actions
//! that may register nested "end" callbacks).
//!
//! Registrars compose: [`DecoratingRegistrar`] wraps any registrar and
//! rewrites every callback passing through it, recursively for the nested
//! registrars handed out by start contexts.

mod decorate;
pub mod family;
pub mod generated;

pub use decorate::{ActionDecorator, DecoratingRegistrar};

use crate::diagnostic::{Diagnostic, DiagnosticSink, Location};
use crate::model::{
    AnalyzerOptions, CancellationToken, CodeBlock, Compilation, SourceTree, Symbol, SymbolKind,
    SyntaxKind, SyntaxNode,
};
use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Callback for a leaf action over subject `S`.
pub type ActionFn<S> = Arc<dyn for<'a> Fn(&ActionContext<'a, S>) + Send + Sync>;

/// Callback for a scoped action over subject `S`; may register nested callbacks.
pub type StartFn<S> = Arc<dyn for<'a, 'b> Fn(&'b mut StartContext<'a, S>) + Send + Sync>;

/// Kind filter attached to symbol and syntax-node registrations.
pub type KindFilter<K> = SmallVec<[K; 4]>;

/// Every action kind a registrar can accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Runs once per compilation before anything else; yields a compilation-start scope.
    CompilationStart,
    /// Runs once per compilation after every other action.
    Compilation,
    /// Runs at the end of the compilation-start scope that registered it.
    CompilationEnd,
    /// Runs once per source tree with semantic information.
    SemanticModel,
    /// Runs once per symbol of a matching kind.
    Symbol,
    /// Runs once per code block; yields a code-block-start scope.
    CodeBlockStart,
    /// Runs once per code block.
    CodeBlock,
    /// Runs at the end of the code-block-start scope that registered it.
    CodeBlockEnd,
    /// Runs once per source tree, syntax only.
    SyntaxTree,
    /// Runs once per syntax node of a matching kind.
    SyntaxNode,
}

impl ActionKind {
    /// Snake-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CompilationStart => "compilation_start",
            Self::Compilation => "compilation",
            Self::CompilationEnd => "compilation_end",
            Self::SemanticModel => "semantic_model",
            Self::Symbol => "symbol",
            Self::CodeBlockStart => "code_block_start",
            Self::CodeBlock => "code_block",
            Self::CodeBlockEnd => "code_block_end",
            Self::SyntaxTree => "syntax_tree",
            Self::SyntaxNode => "syntax_node",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The scope a registrar belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// Analyzer initialization; lives for the whole session.
    Analysis,
    /// Inside a compilation-start callback; lives for one compilation.
    CompilationStart,
    /// Inside a code-block-start callback; lives for one code block.
    CodeBlockStart,
}

impl ScopeKind {
    /// Returns true if actions of `kind` may be registered in this scope.
    #[must_use]
    pub fn accepts(self, kind: ActionKind) -> bool {
        match self {
            Self::Analysis => !matches!(kind, ActionKind::CompilationEnd | ActionKind::CodeBlockEnd),
            Self::CompilationStart => !matches!(
                kind,
                ActionKind::CompilationStart | ActionKind::Compilation | ActionKind::CodeBlockEnd
            ),
            Self::CodeBlockStart => {
                matches!(kind, ActionKind::CodeBlockEnd | ActionKind::SyntaxNode)
            }
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Analysis => "analysis",
            Self::CompilationStart => "compilation_start",
            Self::CodeBlockStart => "code_block_start",
        })
    }
}

/// A registration was rejected by the native registrar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The action kind is not available in the registrar's scope.
    #[error("{action} actions cannot be registered in a {scope} scope")]
    NotAllowedInScope {
        /// Kind of the rejected registration.
        action: ActionKind,
        /// Scope of the registrar that rejected it.
        scope: ScopeKind,
    },
    /// A kind-filtered registration was made with an empty filter.
    #[error("{0} action registered without any kinds")]
    EmptyKindFilter(ActionKind),
}

/// One callback registration.
#[derive(Clone)]
pub enum Registration {
    /// See [`ActionKind::CompilationStart`].
    CompilationStart(StartFn<Compilation>),
    /// See [`ActionKind::Compilation`].
    Compilation(ActionFn<Compilation>),
    /// See [`ActionKind::CompilationEnd`].
    CompilationEnd(ActionFn<Compilation>),
    /// See [`ActionKind::SemanticModel`].
    SemanticModel(ActionFn<SourceTree>),
    /// See [`ActionKind::Symbol`].
    Symbol(ActionFn<Symbol>, KindFilter<SymbolKind>),
    /// See [`ActionKind::CodeBlockStart`].
    CodeBlockStart(StartFn<CodeBlock>),
    /// See [`ActionKind::CodeBlock`].
    CodeBlock(ActionFn<CodeBlock>),
    /// See [`ActionKind::CodeBlockEnd`].
    CodeBlockEnd(ActionFn<CodeBlock>),
    /// See [`ActionKind::SyntaxTree`].
    SyntaxTree(ActionFn<SourceTree>),
    /// See [`ActionKind::SyntaxNode`].
    SyntaxNode(ActionFn<SyntaxNode>, KindFilter<SyntaxKind>),
}

impl Registration {
    /// The action kind of this registration.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::CompilationStart(_) => ActionKind::CompilationStart,
            Self::Compilation(_) => ActionKind::Compilation,
            Self::CompilationEnd(_) => ActionKind::CompilationEnd,
            Self::SemanticModel(_) => ActionKind::SemanticModel,
            Self::Symbol(..) => ActionKind::Symbol,
            Self::CodeBlockStart(_) => ActionKind::CodeBlockStart,
            Self::CodeBlock(_) => ActionKind::CodeBlock,
            Self::CodeBlockEnd(_) => ActionKind::CodeBlockEnd,
            Self::SyntaxTree(_) => ActionKind::SyntaxTree,
            Self::SyntaxNode(..) => ActionKind::SyntaxNode,
        }
    }

    /// Checks the registration against a scope and its own kind filter.
    pub fn validate(&self, scope: ScopeKind) -> Result<(), RegistrationError> {
        let action = self.kind();
        if !scope.accepts(action) {
            return Err(RegistrationError::NotAllowedInScope { action, scope });
        }
        let empty_filter = match self {
            Self::Symbol(_, kinds) => kinds.is_empty(),
            Self::SyntaxNode(_, kinds) => kinds.is_empty(),
            _ => false,
        };
        if empty_filter {
            return Err(RegistrationError::EmptyKindFilter(action));
        }
        Ok(())
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Registration");
        s.field("kind", &self.kind());
        match self {
            Self::Symbol(_, kinds) => s.field("kinds", kinds),
            Self::SyntaxNode(_, kinds) => s.field("kinds", kinds),
            _ => &mut s,
        };
        s.finish_non_exhaustive()
    }
}

/// Capability object through which callbacks are installed.
///
/// `register` never fails from the caller's point of view: the native
/// registrar records rejected registrations (see [`RegistrationError`])
/// so analyzers keep the fire-and-forget registration style.
pub trait Registrar {
    /// Scope of this registrar.
    fn scope(&self) -> ScopeKind;

    /// Installs one callback.
    fn register(&mut self, registration: Registration);
}

/// Typed convenience methods over [`Registrar::register`].
pub trait RegistrarExt: Registrar {
    /// Registers a compilation-start action.
    fn register_compilation_start_action<F>(&mut self, action: F)
    where
        F: for<'a, 'b> Fn(&'b mut StartContext<'a, Compilation>) + Send + Sync + 'static,
    {
        self.register(Registration::CompilationStart(Arc::new(action)));
    }

    /// Registers a whole-compilation action.
    fn register_compilation_action<F>(&mut self, action: F)
    where
        F: Fn(&ActionContext<'_, Compilation>) + Send + Sync + 'static,
    {
        self.register(Registration::Compilation(Arc::new(action)));
    }

    /// Registers a compilation-end action (compilation-start scope only).
    fn register_compilation_end_action<F>(&mut self, action: F)
    where
        F: Fn(&ActionContext<'_, Compilation>) + Send + Sync + 'static,
    {
        self.register(Registration::CompilationEnd(Arc::new(action)));
    }

    /// Registers a per-tree semantic model action.
    fn register_semantic_model_action<F>(&mut self, action: F)
    where
        F: Fn(&ActionContext<'_, SourceTree>) + Send + Sync + 'static,
    {
        self.register(Registration::SemanticModel(Arc::new(action)));
    }

    /// Registers a symbol action for the given symbol kinds.
    fn register_symbol_action<F>(&mut self, action: F, kinds: &[SymbolKind])
    where
        F: Fn(&ActionContext<'_, Symbol>) + Send + Sync + 'static,
    {
        self.register(Registration::Symbol(
            Arc::new(action),
            SmallVec::from_slice(kinds),
        ));
    }

    /// Registers a code-block-start action.
    fn register_code_block_start_action<F>(&mut self, action: F)
    where
        F: for<'a, 'b> Fn(&'b mut StartContext<'a, CodeBlock>) + Send + Sync + 'static,
    {
        self.register(Registration::CodeBlockStart(Arc::new(action)));
    }

    /// Registers a code-block action.
    fn register_code_block_action<F>(&mut self, action: F)
    where
        F: Fn(&ActionContext<'_, CodeBlock>) + Send + Sync + 'static,
    {
        self.register(Registration::CodeBlock(Arc::new(action)));
    }

    /// Registers a code-block-end action (code-block-start scope only).
    fn register_code_block_end_action<F>(&mut self, action: F)
    where
        F: Fn(&ActionContext<'_, CodeBlock>) + Send + Sync + 'static,
    {
        self.register(Registration::CodeBlockEnd(Arc::new(action)));
    }

    /// Registers a syntax-tree action.
    fn register_syntax_tree_action<F>(&mut self, action: F)
    where
        F: Fn(&ActionContext<'_, SourceTree>) + Send + Sync + 'static,
    {
        self.register(Registration::SyntaxTree(Arc::new(action)));
    }

    /// Registers a syntax-node action for the given node kinds.
    fn register_syntax_node_action<F>(&mut self, action: F, kinds: &[SyntaxKind])
    where
        F: Fn(&ActionContext<'_, SyntaxNode>) + Send + Sync + 'static,
    {
        self.register(Registration::SyntaxNode(
            Arc::new(action),
            SmallVec::from_slice(kinds),
        ));
    }
}

impl<R: Registrar + ?Sized> RegistrarExt for R {}

/// Context handed to a leaf action.
pub struct ActionContext<'a, S> {
    subject: &'a S,
    tree: Option<&'a SourceTree>,
    compilation: &'a Arc<Compilation>,
    options: &'a AnalyzerOptions,
    cancellation: &'a CancellationToken,
    sink: &'a dyn DiagnosticSink,
}

impl<'a, S> ActionContext<'a, S> {
    /// Creates a context. Called by drivers.
    pub fn new(
        subject: &'a S,
        tree: Option<&'a SourceTree>,
        compilation: &'a Arc<Compilation>,
        options: &'a AnalyzerOptions,
        cancellation: &'a CancellationToken,
        sink: &'a dyn DiagnosticSink,
    ) -> Self {
        Self {
            subject,
            tree,
            compilation,
            options,
            cancellation,
            sink,
        }
    }

    /// The analyzed subject (node, tree, symbol, code block or compilation).
    #[must_use]
    pub fn subject(&self) -> &'a S {
        self.subject
    }

    /// Tree containing the subject, if it lives in one.
    #[must_use]
    pub fn tree(&self) -> Option<&'a SourceTree> {
        self.tree
    }

    /// Compilation being analyzed.
    #[must_use]
    pub fn compilation(&self) -> &'a Arc<Compilation> {
        self.compilation
    }

    /// Analyzer options.
    #[must_use]
    pub fn options(&self) -> &'a AnalyzerOptions {
        self.options
    }

    /// Cancellation token of the pass.
    #[must_use]
    pub fn cancellation_token(&self) -> &'a CancellationToken {
        self.cancellation
    }

    /// Sink receiving diagnostics reported through this context.
    #[must_use]
    pub fn sink(&self) -> &'a dyn DiagnosticSink {
        self.sink
    }

    /// Reports a diagnostic.
    pub fn report_diagnostic(&self, diagnostic: Diagnostic) {
        self.sink.report(diagnostic);
    }

    /// A copy of this context that reports into `sink` instead.
    #[must_use]
    pub fn with_sink<'b>(&'b self, sink: &'b dyn DiagnosticSink) -> ActionContext<'b, S> {
        ActionContext {
            subject: self.subject,
            tree: self.tree,
            compilation: self.compilation,
            options: self.options,
            cancellation: self.cancellation,
            sink,
        }
    }
}

impl<'a> ActionContext<'a, SyntaxNode> {
    /// The visited node.
    #[must_use]
    pub fn node(&self) -> &'a SyntaxNode {
        self.subject
    }

    /// Location of the visited node.
    #[must_use]
    pub fn node_location(&self) -> Location {
        self.tree
            .map_or_else(Location::none, |tree| tree.location(self.subject.range()))
    }
}

impl<'a> ActionContext<'a, SourceTree> {
    /// The visited tree.
    #[must_use]
    pub fn source_tree(&self) -> &'a SourceTree {
        self.subject
    }
}

impl<'a> ActionContext<'a, Symbol> {
    /// The visited symbol.
    #[must_use]
    pub fn symbol(&self) -> &'a Symbol {
        self.subject
    }
}

impl<'a> ActionContext<'a, CodeBlock> {
    /// The visited code block.
    #[must_use]
    pub fn code_block(&self) -> &'a CodeBlock {
        self.subject
    }

    /// Symbol owning the code block.
    #[must_use]
    pub fn owning_symbol(&self) -> Option<&'a Symbol> {
        self.compilation.symbol(self.subject.owner())
    }
}

/// Context handed to a scoped ("start") action.
///
/// It is itself a [`Registrar`] of the nested scope, so nested callbacks are
/// registered directly on it.
pub struct StartContext<'a, S> {
    subject: &'a S,
    compilation: &'a Arc<Compilation>,
    options: &'a AnalyzerOptions,
    cancellation: &'a CancellationToken,
    registrar: &'a mut dyn Registrar,
}

impl<'a, S> StartContext<'a, S> {
    /// Creates a start context over a nested-scope registrar. Called by drivers.
    pub fn new(
        subject: &'a S,
        compilation: &'a Arc<Compilation>,
        options: &'a AnalyzerOptions,
        cancellation: &'a CancellationToken,
        registrar: &'a mut dyn Registrar,
    ) -> Self {
        Self {
            subject,
            compilation,
            options,
            cancellation,
            registrar,
        }
    }

    /// The scope's subject (the compilation or the code block).
    #[must_use]
    pub fn subject(&self) -> &'a S {
        self.subject
    }

    /// Compilation being analyzed.
    #[must_use]
    pub fn compilation(&self) -> &'a Arc<Compilation> {
        self.compilation
    }

    /// Analyzer options.
    #[must_use]
    pub fn options(&self) -> &'a AnalyzerOptions {
        self.options
    }

    /// Cancellation token of the pass.
    #[must_use]
    pub fn cancellation_token(&self) -> &'a CancellationToken {
        self.cancellation
    }

    /// Runs `f` with a copy of this context whose registrar is wrapped by
    /// `decorator`, so every nested registration is decorated as well.
    pub fn decorated<D, F>(&mut self, decorator: &D, f: F)
    where
        D: ActionDecorator,
        F: FnOnce(&mut StartContext<'_, S>),
    {
        let mut registrar = DecoratingRegistrar::new(&mut *self.registrar, decorator.clone());
        let mut nested = StartContext {
            subject: self.subject,
            compilation: self.compilation,
            options: self.options,
            cancellation: self.cancellation,
            registrar: &mut registrar,
        };
        f(&mut nested);
    }
}

impl<'a> StartContext<'a, CodeBlock> {
    /// The code block that opened this scope.
    #[must_use]
    pub fn code_block(&self) -> &'a CodeBlock {
        self.subject
    }

    /// Symbol owning the code block.
    #[must_use]
    pub fn owning_symbol(&self) -> Option<&'a Symbol> {
        self.compilation.symbol(self.subject.owner())
    }
}

impl<S> Registrar for StartContext<'_, S> {
    fn scope(&self) -> ScopeKind {
        self.registrar.scope()
    }

    fn register(&mut self, registration: Registration) {
        self.registrar.register(registration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_acceptance() {
        assert!(ScopeKind::Analysis.accepts(ActionKind::CompilationStart));
        assert!(!ScopeKind::Analysis.accepts(ActionKind::CompilationEnd));
        assert!(ScopeKind::CompilationStart.accepts(ActionKind::CompilationEnd));
        assert!(ScopeKind::CompilationStart.accepts(ActionKind::CodeBlockStart));
        assert!(!ScopeKind::CompilationStart.accepts(ActionKind::CompilationStart));
        assert!(ScopeKind::CodeBlockStart.accepts(ActionKind::CodeBlockEnd));
        assert!(ScopeKind::CodeBlockStart.accepts(ActionKind::SyntaxNode));
        assert!(!ScopeKind::CodeBlockStart.accepts(ActionKind::Symbol));
    }

    #[test]
    fn test_validate_rejects_empty_filter() {
        let registration = Registration::Symbol(Arc::new(|_| {}), SmallVec::new());
        assert_eq!(
            registration.validate(ScopeKind::Analysis),
            Err(RegistrationError::EmptyKindFilter(ActionKind::Symbol))
        );
    }

    #[test]
    fn test_validate_reports_scope() {
        let registration = Registration::CodeBlockEnd(Arc::new(|_| {}));
        let err = registration.validate(ScopeKind::Analysis).unwrap_err();
        assert_eq!(
            err.to_string(),
            "code_block_end actions cannot be registered in a analysis scope"
        );
    }
}
