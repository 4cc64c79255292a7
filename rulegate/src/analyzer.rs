use crate::context::Registrar;
use crate::diagnostic::DiagnosticDescriptor;
use std::sync::Arc;

/// Trait implemented by every analyzer, native or plugin.
///
/// An analyzer declares the diagnostics it can emit and, once per session,
/// installs its callbacks on the registrar it is given. It never learns
/// whether that registrar is the native one or an intercepting wrapper.
pub trait Analyzer: Send + Sync {
    /// Descriptors of every diagnostic this analyzer may report.
    fn supported_diagnostics(&self) -> Vec<Arc<DiagnosticDescriptor>>;

    /// Installs callbacks. Called once per session.
    fn initialize(&self, registrar: &mut dyn Registrar);

    /// Rule family key used by the enablement policy. Defaults to the
    /// concrete type name.
    fn family(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
