//! Program model handed to analyzers by the front end.
//!
//! Parsing and semantic resolution happen elsewhere; this module only fixes
//! the shapes the registration and driver layers need: a compilation made of
//! source trees, the syntax nodes inside them, declared symbols and the code
//! blocks owned by those symbols.

use crate::diagnostic::Location;
use crate::utils::LineIndex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A half-open byte range inside a source tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TextRange {
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
}

impl TextRange {
    /// Creates a new range.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true for an empty range.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `other` lies entirely inside this range.
    #[must_use]
    pub const fn contains_range(&self, other: TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl From<std::ops::Range<usize>> for TextRange {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Language-defined kind of a syntax node (e.g. `InvocationExpression`).
///
/// Front ends declare their kinds as constants:
/// `pub const INVOCATION: SyntaxKind = SyntaxKind::new("InvocationExpression");`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SyntaxKind(&'static str);

impl SyntaxKind {
    /// Creates a kind from its static name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The kind's name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Kind of a declared symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SymbolKind {
    /// A namespace or module.
    Namespace,
    /// A class, struct, interface, enum or delegate.
    NamedType,
    /// A method, constructor, accessor or operator.
    Method,
    /// A property or indexer.
    Property,
    /// A field.
    Field,
    /// An event.
    Event,
    /// A method parameter.
    Parameter,
    /// A local variable.
    Local,
}

/// Process-unique identity of a compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CompilationId(u64);

impl CompilationId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Index of a source tree inside its compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TreeId(pub usize);

/// Index of a symbol inside its compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolId(pub usize);

/// A node of a parsed source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    kind: SyntaxKind,
    range: TextRange,
    tree: TreeId,
}

impl SyntaxNode {
    /// Node kind.
    #[must_use]
    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    /// Byte range of the node.
    #[must_use]
    pub fn range(&self) -> TextRange {
        self.range
    }

    /// Tree the node belongs to.
    #[must_use]
    pub fn tree(&self) -> TreeId {
        self.tree
    }
}

/// One parsed source unit (a file).
#[derive(Debug, Clone)]
pub struct SourceTree {
    id: TreeId,
    path: PathBuf,
    text: String,
    line_index: LineIndex,
    nodes: Vec<SyntaxNode>,
}

impl SourceTree {
    /// Creates a tree for `path` with the given source text and no nodes.
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: TreeId(0),
            path: path.into(),
            line_index: LineIndex::new(&text),
            text,
            nodes: Vec::new(),
        }
    }

    /// Builder-style method to add a node in document order.
    #[must_use]
    pub fn with_node(mut self, kind: SyntaxKind, range: impl Into<TextRange>) -> Self {
        self.nodes.push(SyntaxNode {
            kind,
            range: range.into(),
            tree: self.id,
        });
        self
    }

    /// Tree identity within its compilation.
    #[must_use]
    pub fn id(&self) -> TreeId {
        self.id
    }

    /// File path of the tree.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full source text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// All nodes in document order.
    #[must_use]
    pub fn nodes(&self) -> &[SyntaxNode] {
        &self.nodes
    }

    /// Nodes lying entirely inside `range`.
    pub fn nodes_in(&self, range: TextRange) -> impl Iterator<Item = &SyntaxNode> {
        self.nodes
            .iter()
            .filter(move |node| range.contains_range(node.range))
    }

    /// Source slice covered by `range`, if it is in bounds.
    #[must_use]
    pub fn slice(&self, range: TextRange) -> Option<&str> {
        self.text.get(range.start..range.end)
    }

    /// Resolves `range` to a reportable location in this tree.
    #[must_use]
    pub fn location(&self, range: TextRange) -> Location {
        let (line, col) = self.line_index.line_col(range.start);
        Location::new(self.path.clone(), range, line, col)
    }

    fn assign_id(&mut self, id: TreeId) {
        self.id = id;
        for node in &mut self.nodes {
            node.tree = id;
        }
    }
}

/// A declared symbol with resolved semantic information.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    id: SymbolId,
    name: String,
    kind: SymbolKind,
    location: Location,
}

impl Symbol {
    /// Symbol identity within its compilation.
    #[must_use]
    pub fn id(&self) -> SymbolId {
        self.id
    }

    /// Declared (fully qualified) name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Symbol kind.
    #[must_use]
    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    /// Declaration location.
    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }
}

/// An executable body (method body, initializer, accessor) owned by a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    owner: SymbolId,
    tree: TreeId,
    range: TextRange,
}

impl CodeBlock {
    /// Symbol owning the block.
    #[must_use]
    pub fn owner(&self) -> SymbolId {
        self.owner
    }

    /// Tree containing the block.
    #[must_use]
    pub fn tree(&self) -> TreeId {
        self.tree
    }

    /// Byte range of the block.
    #[must_use]
    pub fn range(&self) -> TextRange {
        self.range
    }
}

/// A unit of analysis: every source tree and symbol of one project build.
#[derive(Debug)]
pub struct Compilation {
    id: CompilationId,
    name: String,
    trees: Vec<SourceTree>,
    symbols: Vec<Symbol>,
    code_blocks: Vec<CodeBlock>,
}

impl Compilation {
    /// Starts building a compilation.
    pub fn builder(name: impl Into<String>) -> CompilationBuilder {
        CompilationBuilder {
            name: name.into(),
            trees: Vec::new(),
            symbols: Vec::new(),
            code_blocks: Vec::new(),
        }
    }

    /// Process-unique identity.
    #[must_use]
    pub fn id(&self) -> CompilationId {
        self.id
    }

    /// Assembly/crate name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All source trees.
    #[must_use]
    pub fn trees(&self) -> &[SourceTree] {
        &self.trees
    }

    /// Tree by identity.
    #[must_use]
    pub fn tree(&self, id: TreeId) -> Option<&SourceTree> {
        self.trees.get(id.0)
    }

    /// All declared symbols.
    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Symbol by identity.
    #[must_use]
    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.0)
    }

    /// All code blocks.
    #[must_use]
    pub fn code_blocks(&self) -> &[CodeBlock] {
        &self.code_blocks
    }
}

/// Builder for [`Compilation`].
#[derive(Debug)]
pub struct CompilationBuilder {
    name: String,
    trees: Vec<SourceTree>,
    symbols: Vec<Symbol>,
    code_blocks: Vec<CodeBlock>,
}

impl CompilationBuilder {
    /// Adds a source tree; its id is its insertion index.
    #[must_use]
    pub fn tree(mut self, mut tree: SourceTree) -> Self {
        tree.assign_id(TreeId(self.trees.len()));
        self.trees.push(tree);
        self
    }

    /// Declares a symbol located at `range` in `tree`.
    #[must_use]
    pub fn symbol(
        mut self,
        name: impl Into<String>,
        kind: SymbolKind,
        tree: TreeId,
        range: impl Into<TextRange>,
    ) -> Self {
        let range = range.into();
        let location = self
            .trees
            .get(tree.0)
            .map_or_else(Location::none, |t| t.location(range));
        self.symbols.push(Symbol {
            id: SymbolId(self.symbols.len()),
            name: name.into(),
            kind,
            location,
        });
        self
    }

    /// Adds a code block owned by `owner`.
    #[must_use]
    pub fn code_block(mut self, owner: SymbolId, tree: TreeId, range: impl Into<TextRange>) -> Self {
        self.code_blocks.push(CodeBlock {
            owner,
            tree,
            range: range.into(),
        });
        self
    }

    /// Finishes the compilation.
    #[must_use]
    pub fn build(self) -> Arc<Compilation> {
        Arc::new(Compilation {
            id: CompilationId::next(),
            name: self.name,
            trees: self.trees,
            symbols: self.symbols,
            code_blocks: self.code_blocks,
        })
    }
}

/// Analyzer options passed through every context unchanged.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerOptions {
    /// Additional non-source files made available to analyzers.
    pub additional_files: Vec<PathBuf>,
    /// Free-form key/value settings.
    pub values: FxHashMap<String, String>,
}

impl AnalyzerOptions {
    /// Looks up a setting.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Cooperative cancellation flag shared between the driver and callbacks.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASS: SyntaxKind = SyntaxKind::new("ClassDeclaration");
    const CALL: SyntaxKind = SyntaxKind::new("InvocationExpression");

    #[test]
    fn test_builder_assigns_tree_ids() {
        let compilation = Compilation::builder("app")
            .tree(SourceTree::new("a.cs", "class A {}").with_node(CLASS, 0..10))
            .tree(SourceTree::new("b.cs", "class B {}").with_node(CLASS, 0..10))
            .build();

        assert_eq!(compilation.trees()[1].id(), TreeId(1));
        assert_eq!(compilation.trees()[1].nodes()[0].tree(), TreeId(1));
    }

    #[test]
    fn test_compilation_ids_are_unique() {
        let a = Compilation::builder("a").build();
        let b = Compilation::builder("a").build();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_nodes_in_block() {
        let text = "void M() {\n  Call();\n}\nvoid N() { Other(); }";
        let tree = SourceTree::new("m.cs", text)
            .with_node(CALL, 13..19)
            .with_node(CALL, 35..42);
        let inside: Vec<_> = tree.nodes_in(TextRange::new(9, 22)).collect();
        assert_eq!(inside.len(), 1);
        assert_eq!(tree.slice(inside[0].range()), Some("Call()"));
    }

    #[test]
    fn test_symbol_location_resolution() {
        let compilation = Compilation::builder("app")
            .tree(SourceTree::new("a.cs", "namespace N {\n  class A {}\n}"))
            .symbol("N.A", SymbolKind::NamedType, TreeId(0), 16..26)
            .symbol("Ghost", SymbolKind::Field, TreeId(9), 0..1)
            .build();

        let symbol = &compilation.symbols()[0];
        assert_eq!(symbol.location().line, 2);
        assert_eq!(symbol.location().col, 3);
        assert!(compilation.symbols()[1].location().file.is_none());
    }

    #[test]
    fn test_cancellation_token_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
