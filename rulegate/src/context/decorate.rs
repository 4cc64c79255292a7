use super::{ActionFn, Registrar, Registration, ScopeKind, StartContext, StartFn};
use std::sync::Arc;

/// Rewrites callbacks on their way to the native registrar.
///
/// `decorate` is applied to every leaf callback, including the ones a start
/// callback registers later on its nested scope. `decorate_start` is applied
/// to the start callbacks themselves, after nesting has been set up.
pub trait ActionDecorator: Clone + Send + Sync + 'static {
    /// Wraps a leaf callback.
    fn decorate<S: 'static>(&self, action: ActionFn<S>) -> ActionFn<S>;

    /// Wraps a start callback. Identity by default.
    fn decorate_start<S: 'static>(&self, action: StartFn<S>) -> StartFn<S> {
        action
    }
}

/// A registrar that decorates every registration and forwards it to `inner`.
///
/// The scope and the acceptance rules are those of `inner`; decoration never
/// changes what may be registered where.
pub struct DecoratingRegistrar<'r, D> {
    inner: &'r mut dyn Registrar,
    decorator: D,
}

impl<'r, D: ActionDecorator> DecoratingRegistrar<'r, D> {
    /// Wraps `inner`.
    pub fn new(inner: &'r mut dyn Registrar, decorator: D) -> Self {
        Self { inner, decorator }
    }

    /// The decorator applied to registrations.
    #[must_use]
    pub fn decorator(&self) -> &D {
        &self.decorator
    }

    fn wrap(&self, registration: Registration) -> Registration {
        let d = &self.decorator;
        match registration {
            Registration::CompilationStart(action) => {
                Registration::CompilationStart(nest(d, action))
            }
            Registration::CodeBlockStart(action) => Registration::CodeBlockStart(nest(d, action)),
            Registration::Compilation(action) => Registration::Compilation(d.decorate(action)),
            Registration::CompilationEnd(action) => {
                Registration::CompilationEnd(d.decorate(action))
            }
            Registration::SemanticModel(action) => Registration::SemanticModel(d.decorate(action)),
            Registration::Symbol(action, kinds) => Registration::Symbol(d.decorate(action), kinds),
            Registration::CodeBlock(action) => Registration::CodeBlock(d.decorate(action)),
            Registration::CodeBlockEnd(action) => Registration::CodeBlockEnd(d.decorate(action)),
            Registration::SyntaxTree(action) => Registration::SyntaxTree(d.decorate(action)),
            Registration::SyntaxNode(action, kinds) => {
                Registration::SyntaxNode(d.decorate(action), kinds)
            }
        }
    }
}

/// The start callback runs against a context whose registrar is decorated by
/// the same decorator, so nested registrations are wrapped too.
fn nest<D: ActionDecorator, S: 'static>(decorator: &D, action: StartFn<S>) -> StartFn<S> {
    let nested = decorator.clone();
    let wrapped: StartFn<S> = Arc::new(move |ctx: &mut StartContext<'_, S>| {
        ctx.decorated(&nested, |inner| action(inner));
    });
    decorator.decorate_start(wrapped)
}

impl<D: ActionDecorator> Registrar for DecoratingRegistrar<'_, D> {
    fn scope(&self) -> ScopeKind {
        self.inner.scope()
    }

    fn register(&mut self, registration: Registration) {
        let wrapped = self.wrap(registration);
        self.inner.register(wrapped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ActionContext, RegistrarExt};
    use crate::model::Compilation;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Collect {
        scope: Option<ScopeKind>,
        registrations: Vec<Registration>,
    }

    impl Registrar for Collect {
        fn scope(&self) -> ScopeKind {
            self.scope.unwrap_or(ScopeKind::Analysis)
        }

        fn register(&mut self, registration: Registration) {
            self.registrations.push(registration);
        }
    }

    #[derive(Clone, Default)]
    struct Counting(Arc<AtomicUsize>);

    impl ActionDecorator for Counting {
        fn decorate<S: 'static>(&self, action: ActionFn<S>) -> ActionFn<S> {
            let count = Arc::clone(&self.0);
            Arc::new(move |ctx: &ActionContext<'_, S>| {
                count.fetch_add(1, Ordering::SeqCst);
                action(ctx);
            })
        }
    }

    #[test]
    fn test_forwards_with_inner_scope() {
        let mut native = Collect {
            scope: Some(ScopeKind::CompilationStart),
            ..Collect::default()
        };
        let mut registrar = DecoratingRegistrar::new(&mut native, Counting::default());
        assert_eq!(registrar.scope(), ScopeKind::CompilationStart);
        registrar.register_compilation_end_action(|_| {});
        registrar.register_syntax_tree_action(|_| {});
        assert_eq!(native.registrations.len(), 2);
    }

    #[test]
    fn test_start_callbacks_are_forwarded_as_start_callbacks() {
        let mut native = Collect::default();
        let mut registrar = DecoratingRegistrar::new(&mut native, Counting::default());
        registrar.register_compilation_start_action(|_: &mut StartContext<'_, Compilation>| {});
        assert!(matches!(
            native.registrations.as_slice(),
            [Registration::CompilationStart(_)]
        ));
    }
}
