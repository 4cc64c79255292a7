//! Rule-family gating of callbacks.
//!
//! Native analyzers do not go through the report gate; the host wraps their
//! registrar in a [`FamilyGatedRegistrar`] instead, so turning a family off
//! skips its callbacks entirely. The check happens each time a callback is
//! invoked, never at registration.

use super::{ActionContext, ActionDecorator, ActionFn, DecoratingRegistrar, StartContext, StartFn};
use crate::policy::EnablementPolicy;
use std::sync::Arc;

/// Decorator skipping callbacks while `family` is disabled.
#[derive(Debug, Clone)]
pub struct FamilyGate {
    family: Arc<str>,
    policy: Arc<EnablementPolicy>,
}

impl FamilyGate {
    /// Creates a gate for `family`.
    pub fn new(family: impl Into<Arc<str>>, policy: Arc<EnablementPolicy>) -> Self {
        Self {
            family: family.into(),
            policy,
        }
    }

    /// The gated family key.
    #[must_use]
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Returns true if callbacks of the family currently run.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.policy.is_family_disabled(&self.family)
    }
}

impl ActionDecorator for FamilyGate {
    fn decorate<S: 'static>(&self, action: ActionFn<S>) -> ActionFn<S> {
        let gate = self.clone();
        Arc::new(move |ctx: &ActionContext<'_, S>| {
            if gate.is_enabled() {
                action(ctx);
            }
        })
    }

    fn decorate_start<S: 'static>(&self, action: StartFn<S>) -> StartFn<S> {
        let gate = self.clone();
        Arc::new(move |ctx: &mut StartContext<'_, S>| {
            if gate.is_enabled() {
                action(ctx);
            }
        })
    }
}

/// Registrar whose callbacks only run while a rule family is enabled.
pub type FamilyGatedRegistrar<'r> = DecoratingRegistrar<'r, FamilyGate>;
