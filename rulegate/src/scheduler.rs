//! Timer-driven toggling of the enablement policy.
//!
//! The scheduler flips a configured set of rule families and diagnostic ids
//! at a fixed period and tells a listener about each flip (an IDE host would
//! schedule re-analysis there). It never touches in-flight analyses: a flip
//! only affects diagnostics reported after it.

use crate::constants::DEFAULT_TOGGLE_INTERVAL_SECS;
use crate::policy::EnablementPolicy;
use serde::Serialize;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// What to flip and how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleSchedule {
    /// Flip period.
    pub interval: Duration,
    /// Rule families flipped together.
    pub families: Vec<String>,
    /// Diagnostic ids flipped together with the families.
    pub diagnostics: Vec<String>,
}

impl Default for ToggleSchedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_TOGGLE_INTERVAL_SECS),
            families: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

impl ToggleSchedule {
    /// Returns true if there is nothing to flip.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.families.is_empty() && self.diagnostics.is_empty()
    }
}

/// State of the scheduled set after a flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleState {
    /// Families and ids are enabled.
    Enabled,
    /// Families and ids are disabled.
    Disabled,
}

type Listener = Arc<dyn Fn(ToggleState) + Send + Sync>;

/// Flips a [`ToggleSchedule`] on an [`EnablementPolicy`].
#[derive(Clone)]
pub struct ToggleScheduler {
    policy: Arc<EnablementPolicy>,
    schedule: ToggleSchedule,
    listener: Option<Listener>,
}

impl ToggleScheduler {
    /// Creates a scheduler over `policy`.
    #[must_use]
    pub fn new(policy: Arc<EnablementPolicy>, schedule: ToggleSchedule) -> Self {
        Self {
            policy,
            schedule,
            listener: None,
        }
    }

    /// Builder-style method setting the flip listener.
    #[must_use]
    pub fn with_listener(mut self, listener: impl Fn(ToggleState) + Send + Sync + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// The schedule being applied.
    #[must_use]
    pub fn schedule(&self) -> &ToggleSchedule {
        &self.schedule
    }

    /// Performs one flip now and returns the new state.
    pub fn toggle_now(&self) -> ToggleState {
        let state = if self.is_disabled() {
            for family in &self.schedule.families {
                self.policy.enable_family(family);
            }
            self.policy.enable_ids(&self.schedule.diagnostics);
            ToggleState::Enabled
        } else {
            for family in &self.schedule.families {
                self.policy.disable_family(family.as_str());
            }
            self.policy.disable_ids(self.schedule.diagnostics.iter().map(String::as_str));
            ToggleState::Disabled
        };
        tracing::debug!(
            ?state,
            families = self.schedule.families.len(),
            diagnostics = self.schedule.diagnostics.len(),
            "toggled rule enablement"
        );
        if let Some(listener) = &self.listener {
            listener(state);
        }
        state
    }

    /// Starts flipping every interval on a background thread.
    pub fn spawn(self) -> std::io::Result<ToggleHandle> {
        let (stop, stopped) = mpsc::channel::<()>();
        let interval = self.schedule.interval.max(Duration::from_millis(1));
        let thread = thread::Builder::new()
            .name("rulegate-toggle".to_owned())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        self.toggle_now();
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        Ok(ToggleHandle {
            stop: Some(stop),
            thread: Some(thread),
        })
    }

    /// The scheduled set counts as disabled if any scheduled family is, or,
    /// without families, if any scheduled id is.
    fn is_disabled(&self) -> bool {
        if self.schedule.families.is_empty() {
            self.schedule
                .diagnostics
                .iter()
                .any(|id| self.policy.is_diagnostic_disabled(id))
        } else {
            self.schedule
                .families
                .iter()
                .any(|family| self.policy.is_family_disabled(family))
        }
    }
}

impl std::fmt::Debug for ToggleScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToggleScheduler")
            .field("schedule", &self.schedule)
            .field("listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}

/// Running scheduler thread. Stops on [`ToggleHandle::stop`] or drop.
#[derive(Debug)]
pub struct ToggleHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ToggleHandle {
    /// Stops the thread and waits for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("toggle listener panicked");
            }
        }
    }
}

impl Drop for ToggleHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
