//! Generated-code detection and the "non-generated only" registration helpers.
//!
//! Deciding whether a tree is generated can be expensive (header comments,
//! file name conventions, attributes), so the answer is memoized per
//! compilation and tree. Entries hold the compilation weakly and disappear
//! once the compilation is dropped.

use super::{ActionContext, Registrar, RegistrarExt, StartContext};
use crate::diagnostic::Diagnostic;
use crate::model::{
    CodeBlock, Compilation, CompilationId, SourceTree, SyntaxKind, SyntaxNode, TreeId,
};
use dashmap::DashMap;
use std::sync::{Arc, Weak};

/// Decides whether a source tree is machine-generated. Supplied per language.
pub trait GeneratedCodeRecognizer: Send + Sync {
    /// Returns true if `tree` is generated.
    fn is_generated(&self, tree: &SourceTree) -> bool;
}

impl<F> GeneratedCodeRecognizer for F
where
    F: Fn(&SourceTree) -> bool + Send + Sync,
{
    fn is_generated(&self, tree: &SourceTree) -> bool {
        self(tree)
    }
}

struct CompilationEntry {
    compilation: Weak<Compilation>,
    trees: Arc<DashMap<TreeId, bool>>,
}

/// Per-compilation memo of the recognizer's answers.
///
/// Racing first lookups of the same tree may both run the recognizer; the
/// last write wins. No lock is held while the recognizer runs.
pub struct GeneratedCodeCache {
    recognizer: Box<dyn GeneratedCodeRecognizer>,
    compilations: DashMap<CompilationId, CompilationEntry>,
}

impl GeneratedCodeCache {
    /// Creates an empty cache over `recognizer`.
    pub fn new(recognizer: impl GeneratedCodeRecognizer + 'static) -> Self {
        Self {
            recognizer: Box::new(recognizer),
            compilations: DashMap::new(),
        }
    }

    /// Returns true if `tree` of `compilation` is generated.
    pub fn is_generated(&self, tree: &SourceTree, compilation: &Arc<Compilation>) -> bool {
        let trees = self.trees_for(compilation);
        if let Some(cached) = trees.get(&tree.id()) {
            return *cached;
        }
        let generated = self.recognizer.is_generated(tree);
        trees.insert(tree.id(), generated);
        generated
    }

    /// Drops entries whose compilation is no longer referenced.
    pub fn purge(&self) {
        self.compilations
            .retain(|_, entry| entry.compilation.strong_count() > 0);
    }

    /// Number of compilations with cached answers.
    #[must_use]
    pub fn cached_compilations(&self) -> usize {
        self.compilations.len()
    }

    fn trees_for(&self, compilation: &Arc<Compilation>) -> Arc<DashMap<TreeId, bool>> {
        if let Some(entry) = self.compilations.get(&compilation.id()) {
            return Arc::clone(&entry.trees);
        }
        self.purge();
        let entry = self
            .compilations
            .entry(compilation.id())
            .or_insert_with(|| CompilationEntry {
                compilation: Arc::downgrade(compilation),
                trees: Arc::new(DashMap::new()),
            });
        Arc::clone(&entry.trees)
    }

    /// Reports `diagnostic` through `ctx` unless its location lies in a
    /// generated tree. Diagnostics without a source location are reported.
    pub fn report_if_non_generated<S>(&self, ctx: &ActionContext<'_, S>, diagnostic: Diagnostic) {
        let compilation = ctx.compilation();
        let generated = diagnostic
            .location
            .file
            .as_deref()
            .and_then(|path| compilation.trees().iter().find(|tree| tree.path() == path))
            .is_some_and(|tree| self.is_generated(tree, compilation));
        if !generated {
            ctx.report_diagnostic(diagnostic);
        }
    }
}

impl std::fmt::Debug for GeneratedCodeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedCodeCache")
            .field("compilations", &self.compilations.len())
            .finish_non_exhaustive()
    }
}

/// Registers a syntax-node action that skips nodes in generated trees.
pub fn register_syntax_node_action_in_non_generated<R, F>(
    registrar: &mut R,
    cache: &Arc<GeneratedCodeCache>,
    action: F,
    kinds: &[SyntaxKind],
) where
    R: Registrar + ?Sized,
    F: Fn(&ActionContext<'_, SyntaxNode>) + Send + Sync + 'static,
{
    let cache = Arc::clone(cache);
    registrar.register_syntax_node_action(
        move |ctx| {
            let generated = ctx
                .tree()
                .is_some_and(|tree| cache.is_generated(tree, ctx.compilation()));
            if !generated {
                action(ctx);
            }
        },
        kinds,
    );
}

/// Registers a syntax-tree action that skips generated trees.
///
/// The action is installed from a compilation-start callback, so it is
/// scoped to each compilation.
pub fn register_syntax_tree_action_in_non_generated<R, F>(
    registrar: &mut R,
    cache: &Arc<GeneratedCodeCache>,
    action: F,
) where
    R: Registrar + ?Sized,
    F: Fn(&ActionContext<'_, SourceTree>) + Send + Sync + 'static,
{
    let cache = Arc::clone(cache);
    let action = Arc::new(action);
    registrar.register_compilation_start_action(move |start: &mut StartContext<'_, Compilation>| {
        let cache = Arc::clone(&cache);
        let action = Arc::clone(&action);
        start.register_syntax_tree_action(move |ctx| {
            if !cache.is_generated(ctx.source_tree(), ctx.compilation()) {
                action(ctx);
            }
        });
    });
}

/// Registers a code-block-start action that skips blocks in generated trees.
pub fn register_code_block_start_action_in_non_generated<R, F>(
    registrar: &mut R,
    cache: &Arc<GeneratedCodeCache>,
    action: F,
) where
    R: Registrar + ?Sized,
    F: for<'a, 'b> Fn(&'b mut StartContext<'a, CodeBlock>) + Send + Sync + 'static,
{
    let cache = Arc::clone(cache);
    registrar.register_code_block_start_action(move |start: &mut StartContext<'_, CodeBlock>| {
        let compilation = start.compilation();
        let generated = compilation
            .tree(start.code_block().tree())
            .is_some_and(|tree| cache.is_generated(tree, compilation));
        if !generated {
            action(start);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn compilation() -> Arc<Compilation> {
        Compilation::builder("c")
            .tree(SourceTree::new("src/a.rs", "fn a() {}"))
            .tree(SourceTree::new("src/a.g.rs", "// <auto-generated>\n"))
            .build()
    }

    #[test]
    fn test_memoizes_per_tree() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = GeneratedCodeCache::new(move |tree: &SourceTree| {
            counter.fetch_add(1, Ordering::SeqCst);
            tree.text().contains("<auto-generated>")
        });
        let c = compilation();
        for _ in 0..3 {
            assert!(!cache.is_generated(&c.trees()[0], &c));
            assert!(cache.is_generated(&c.trees()[1], &c));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_releases_dropped_compilations() {
        let cache = GeneratedCodeCache::new(|_: &SourceTree| false);
        let first = compilation();
        cache.is_generated(&first.trees()[0], &first);
        assert_eq!(cache.cached_compilations(), 1);
        drop(first);

        let second = compilation();
        cache.is_generated(&second.trees()[0], &second);
        assert_eq!(cache.cached_compilations(), 1);

        drop(second);
        cache.purge();
        assert_eq!(cache.cached_compilations(), 0);
    }
}
