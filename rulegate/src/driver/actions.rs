use crate::context::{
    ActionFn, KindFilter, Registrar, Registration, RegistrationError, ScopeKind, StartFn,
};
use crate::model::{CodeBlock, Compilation, SourceTree, Symbol, SymbolKind, SyntaxKind, SyntaxNode};

/// Registered callbacks bucketed by action kind.
#[derive(Clone, Default)]
pub(crate) struct ActionSet {
    pub compilation_start: Vec<StartFn<Compilation>>,
    pub compilation: Vec<ActionFn<Compilation>>,
    pub compilation_end: Vec<ActionFn<Compilation>>,
    pub semantic_model: Vec<ActionFn<SourceTree>>,
    pub symbol: Vec<(ActionFn<Symbol>, KindFilter<SymbolKind>)>,
    pub code_block_start: Vec<StartFn<CodeBlock>>,
    pub code_block: Vec<ActionFn<CodeBlock>>,
    pub code_block_end: Vec<ActionFn<CodeBlock>>,
    pub syntax_tree: Vec<ActionFn<SourceTree>>,
    pub syntax_node: Vec<(ActionFn<SyntaxNode>, KindFilter<SyntaxKind>)>,
}

impl ActionSet {
    pub fn add(&mut self, registration: Registration) {
        match registration {
            Registration::CompilationStart(action) => self.compilation_start.push(action),
            Registration::Compilation(action) => self.compilation.push(action),
            Registration::CompilationEnd(action) => self.compilation_end.push(action),
            Registration::SemanticModel(action) => self.semantic_model.push(action),
            Registration::Symbol(action, kinds) => self.symbol.push((action, kinds)),
            Registration::CodeBlockStart(action) => self.code_block_start.push(action),
            Registration::CodeBlock(action) => self.code_block.push(action),
            Registration::CodeBlockEnd(action) => self.code_block_end.push(action),
            Registration::SyntaxTree(action) => self.syntax_tree.push(action),
            Registration::SyntaxNode(action, kinds) => self.syntax_node.push((action, kinds)),
        }
    }

    pub fn extend(&mut self, other: ActionSet) {
        self.compilation_start.extend(other.compilation_start);
        self.compilation.extend(other.compilation);
        self.compilation_end.extend(other.compilation_end);
        self.semantic_model.extend(other.semantic_model);
        self.symbol.extend(other.symbol);
        self.code_block_start.extend(other.code_block_start);
        self.code_block.extend(other.code_block);
        self.code_block_end.extend(other.code_block_end);
        self.syntax_tree.extend(other.syntax_tree);
        self.syntax_node.extend(other.syntax_node);
    }

    pub fn len(&self) -> usize {
        self.compilation_start.len()
            + self.compilation.len()
            + self.compilation_end.len()
            + self.semantic_model.len()
            + self.symbol.len()
            + self.code_block_start.len()
            + self.code_block.len()
            + self.code_block_end.len()
            + self.syntax_tree.len()
            + self.syntax_node.len()
    }
}

/// The native registrar: validates against its scope and files the callback.
pub(crate) struct Collector<'s> {
    scope: ScopeKind,
    actions: &'s mut ActionSet,
    errors: &'s mut Vec<RegistrationError>,
}

impl<'s> Collector<'s> {
    pub fn new(
        scope: ScopeKind,
        actions: &'s mut ActionSet,
        errors: &'s mut Vec<RegistrationError>,
    ) -> Self {
        Self {
            scope,
            actions,
            errors,
        }
    }
}

impl Registrar for Collector<'_> {
    fn scope(&self) -> ScopeKind {
        self.scope
    }

    fn register(&mut self, registration: Registration) {
        match registration.validate(self.scope) {
            Ok(()) => self.actions.add(registration),
            Err(error) => {
                tracing::warn!("rejected registration: {error}");
                self.errors.push(error);
            }
        }
    }
}
