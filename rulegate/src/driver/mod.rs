//! In-process analysis driver.
//!
//! This is the native side of the registration API: it initializes analyzers
//! against a collecting registrar and then runs one pass over a compilation,
//! invoking every registered callback with a context reporting into a shared
//! [`DiagnosticBag`]. Trees, symbols and code blocks are processed in
//! parallel with rayon.
//!
//! Pass order:
//! 1. compilation-start callbacks (may register compilation-scoped actions);
//! 2. per tree: syntax-tree, semantic-model, then syntax-node callbacks;
//! 3. per symbol: symbol callbacks;
//! 4. per code block: code-block-start callbacks, their syntax-node callbacks
//!    over the block's nodes, code-block callbacks, then code-block-end;
//! 5. compilation callbacks, then compilation-end callbacks.

mod actions;

use crate::analyzer::Analyzer;
use crate::context::{ActionContext, RegistrationError, ScopeKind, StartContext};
use crate::diagnostic::{Diagnostic, DiagnosticBag, DiagnosticSink};
use crate::model::{
    AnalyzerOptions, CancellationToken, CodeBlock, Compilation, SourceTree, Symbol,
};
use actions::{ActionSet, Collector};
use rayon::prelude::*;
use std::sync::Arc;
use thiserror::Error;

/// A pass did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The cancellation token fired.
    #[error("analysis cancelled")]
    Cancelled,
}

/// Result of one pass over a compilation.
#[derive(Debug, Default)]
pub struct AnalysisRun {
    /// Reported diagnostics, sorted by file, start offset and id.
    pub diagnostics: Vec<Diagnostic>,
    /// Registrations rejected during this pass (nested scopes).
    pub registration_errors: Vec<RegistrationError>,
}

/// Runs registered analyzers over compilations.
pub struct AnalysisDriver {
    options: AnalyzerOptions,
    // Callbacks may live in plugin modules kept alive by the analyzers below;
    // declared first so they are dropped first.
    session: ActionSet,
    analyzers: Vec<Arc<dyn Analyzer>>,
    registration_errors: Vec<RegistrationError>,
}

impl AnalysisDriver {
    /// Creates a driver with no analyzers.
    #[must_use]
    pub fn new(options: AnalyzerOptions) -> Self {
        Self {
            options,
            session: ActionSet::default(),
            analyzers: Vec::new(),
            registration_errors: Vec::new(),
        }
    }

    /// Adds an analyzer and runs its initialization against the session scope.
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        let mut collector = Collector::new(
            ScopeKind::Analysis,
            &mut self.session,
            &mut self.registration_errors,
        );
        analyzer.initialize(&mut collector);
        self.analyzers.push(analyzer);
        self
    }

    /// Number of session-scope registrations.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.session.len()
    }

    /// Registrations rejected during initialization.
    #[must_use]
    pub fn registration_errors(&self) -> &[RegistrationError] {
        &self.registration_errors
    }

    /// Number of analyzers added.
    #[must_use]
    pub fn analyzer_count(&self) -> usize {
        self.analyzers.len()
    }

    /// Analyzes `compilation`.
    pub fn run(
        &self,
        compilation: &Arc<Compilation>,
        cancellation: &CancellationToken,
    ) -> Result<AnalysisRun, DriverError> {
        let bag = DiagnosticBag::new();
        let mut registration_errors = Vec::new();
        let pass = Pass {
            options: &self.options,
            compilation,
            cancellation,
            sink: &bag,
        };

        pass.check()?;
        let mut scoped = ActionSet::default();
        for start in &self.session.compilation_start {
            let mut collector = Collector::new(
                ScopeKind::CompilationStart,
                &mut scoped,
                &mut registration_errors,
            );
            let mut ctx = StartContext::new(
                &**compilation,
                compilation,
                &self.options,
                cancellation,
                &mut collector,
            );
            start(&mut ctx);
        }
        let mut actions = self.session.clone();
        actions.extend(scoped);

        compilation
            .trees()
            .par_iter()
            .try_for_each(|tree| pass.run_tree(&actions, tree))?;

        compilation
            .symbols()
            .par_iter()
            .try_for_each(|symbol| pass.run_symbol(&actions, symbol))?;

        let block_errors = compilation
            .code_blocks()
            .par_iter()
            .map(|block| pass.run_code_block(&actions, block))
            .collect::<Result<Vec<_>, _>>()?;
        registration_errors.extend(block_errors.into_iter().flatten());

        pass.check()?;
        for action in actions.compilation.iter().chain(&actions.compilation_end) {
            action(&pass.context(&**compilation, None));
        }

        let mut diagnostics = bag.into_vec();
        diagnostics.sort_by(|a, b| {
            (&a.location.file, a.location.range.start, a.id()).cmp(&(
                &b.location.file,
                b.location.range.start,
                b.id(),
            ))
        });
        Ok(AnalysisRun {
            diagnostics,
            registration_errors,
        })
    }
}

impl std::fmt::Debug for AnalysisDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisDriver")
            .field("analyzers", &self.analyzers.len())
            .field("registrations", &self.session.len())
            .field("registration_errors", &self.registration_errors)
            .finish_non_exhaustive()
    }
}

/// Borrowed state shared by every unit of one pass.
struct Pass<'p> {
    options: &'p AnalyzerOptions,
    compilation: &'p Arc<Compilation>,
    cancellation: &'p CancellationToken,
    sink: &'p DiagnosticBag,
}

impl<'p> Pass<'p> {
    fn check(&self) -> Result<(), DriverError> {
        if self.cancellation.is_cancelled() {
            Err(DriverError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn context<S>(&self, subject: &'p S, tree: Option<&'p SourceTree>) -> ActionContext<'p, S> {
        let sink: &'p dyn DiagnosticSink = self.sink;
        ActionContext::new(
            subject,
            tree,
            self.compilation,
            self.options,
            self.cancellation,
            sink,
        )
    }

    fn run_tree(&self, actions: &ActionSet, tree: &'p SourceTree) -> Result<(), DriverError> {
        self.check()?;
        for action in &actions.syntax_tree {
            action(&self.context(tree, Some(tree)));
        }
        for action in &actions.semantic_model {
            action(&self.context(tree, Some(tree)));
        }
        for node in tree.nodes() {
            for (action, kinds) in &actions.syntax_node {
                if kinds.contains(&node.kind()) {
                    action(&self.context(node, Some(tree)));
                }
            }
        }
        Ok(())
    }

    fn run_symbol(&self, actions: &ActionSet, symbol: &'p Symbol) -> Result<(), DriverError> {
        self.check()?;
        let tree = symbol.location().file.as_deref().and_then(|path| {
            self.compilation
                .trees()
                .iter()
                .find(|tree| tree.path() == path)
        });
        for (action, kinds) in &actions.symbol {
            if kinds.contains(&symbol.kind()) {
                action(&self.context(symbol, tree));
            }
        }
        Ok(())
    }

    fn run_code_block(
        &self,
        actions: &ActionSet,
        block: &'p CodeBlock,
    ) -> Result<Vec<RegistrationError>, DriverError> {
        self.check()?;
        let tree = self.compilation.tree(block.tree());
        let mut scoped = ActionSet::default();
        let mut errors = Vec::new();
        for start in &actions.code_block_start {
            let mut collector = Collector::new(ScopeKind::CodeBlockStart, &mut scoped, &mut errors);
            let mut ctx = StartContext::new(
                block,
                self.compilation,
                self.options,
                self.cancellation,
                &mut collector,
            );
            start(&mut ctx);
        }

        if let Some(tree) = tree {
            for node in tree.nodes_in(block.range()) {
                for (action, kinds) in &scoped.syntax_node {
                    if kinds.contains(&node.kind()) {
                        action(&self.context(node, Some(tree)));
                    }
                }
            }
        }
        for action in &actions.code_block {
            action(&self.context(block, tree));
        }
        for action in &scoped.code_block_end {
            action(&self.context(block, tree));
        }
        Ok(errors)
    }
}
