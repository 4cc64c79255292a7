//! Interception of plugin registrations and reports.
//!
//! A plugin is initialized against an [`InterceptingRegistrar`] instead of
//! the native registrar. Every callback it installs is wrapped so that, when
//! the driver invokes it, the plugin receives a substitute context whose
//! sink is a [`GatedSink`] bound to the plugin's [`ReportGate`]. Start
//! callbacks receive a start context whose registrar is itself intercepting,
//! so nested registrations are gated at any depth.

pub mod gate;
pub mod remap;

pub use gate::{GateDecision, GatedSink, ReportGate};
pub use remap::{remap, DescriptorConflict, DescriptorEntry, DescriptorMap};

use crate::context::{ActionContext, ActionDecorator, ActionFn, DecoratingRegistrar, Registrar};
use std::sync::Arc;

/// Decorator substituting the reporting sink with a gated one.
#[derive(Debug, Clone)]
pub struct ReportInterceptor {
    gate: Arc<ReportGate>,
}

impl ReportInterceptor {
    /// Creates an interceptor reporting through `gate`.
    #[must_use]
    pub fn new(gate: Arc<ReportGate>) -> Self {
        Self { gate }
    }

    /// The gate diagnostics are routed through.
    #[must_use]
    pub fn gate(&self) -> &ReportGate {
        &self.gate
    }
}

impl ActionDecorator for ReportInterceptor {
    fn decorate<S: 'static>(&self, action: ActionFn<S>) -> ActionFn<S> {
        let gate = Arc::clone(&self.gate);
        Arc::new(move |ctx: &ActionContext<'_, S>| {
            let sink = GatedSink::new(&gate, ctx.sink());
            action(&ctx.with_sink(&sink));
        })
    }
}

/// Registrar handed to plugins in place of the native one.
pub type InterceptingRegistrar<'r> = DecoratingRegistrar<'r, ReportInterceptor>;

/// Wraps `native` so every registration made through the result reports via `gate`.
pub fn intercept(native: &mut dyn Registrar, gate: Arc<ReportGate>) -> InterceptingRegistrar<'_> {
    DecoratingRegistrar::new(native, ReportInterceptor::new(gate))
}
