//! Runtime enablement state over rule families and diagnostic identifiers.
//!
//! The policy is created once per process and shared as an
//! `Arc<EnablementPolicy>` with the host engine (which reads it on every
//! report) and with whatever external actor toggles it, typically the
//! [`crate::scheduler::ToggleScheduler`]. There is no global instance.

use dashmap::DashSet;

/// Two independent sets: disabled rule families and disabled diagnostic ids.
///
/// Reads and writes go through sharded concurrent sets, so analysis threads
/// never wait on each other. A toggle is visible to every report made after
/// the mutating call returns.
#[derive(Debug, Default)]
pub struct EnablementPolicy {
    disabled_families: DashSet<String>,
    disabled_ids: DashSet<String>,
}

impl EnablementPolicy {
    /// Creates a policy with everything enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the rule family `family` is disabled.
    #[must_use]
    pub fn is_family_disabled(&self, family: &str) -> bool {
        self.disabled_families.contains(family)
    }

    /// Returns true if the diagnostic id `id` is disabled.
    #[must_use]
    pub fn is_diagnostic_disabled(&self, id: &str) -> bool {
        self.disabled_ids.contains(id)
    }

    /// Disables a rule family. Returns true if it was enabled before.
    pub fn disable_family(&self, family: impl Into<String>) -> bool {
        self.disabled_families.insert(family.into())
    }

    /// Re-enables a rule family. Returns true if it was disabled before.
    pub fn enable_family(&self, family: &str) -> bool {
        self.disabled_families.remove(family).is_some()
    }

    /// Disables every id in `ids`.
    pub fn disable_ids<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            self.disabled_ids.insert(id.into());
        }
    }

    /// Re-enables every id in `ids`.
    pub fn enable_ids<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in ids {
            self.disabled_ids.remove(id.as_ref());
        }
    }

    /// Sorted snapshot of the disabled families.
    #[must_use]
    pub fn disabled_families(&self) -> Vec<String> {
        let mut families: Vec<String> = self
            .disabled_families
            .iter()
            .map(|f| f.key().clone())
            .collect();
        families.sort_unstable();
        families
    }

    /// Sorted snapshot of the disabled diagnostic ids.
    #[must_use]
    pub fn disabled_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.disabled_ids.iter().map(|id| id.key().clone()).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_family_toggle() {
        let policy = EnablementPolicy::new();
        assert!(!policy.is_family_disabled("A"));
        assert!(policy.disable_family("A"));
        assert!(!policy.disable_family("A"));
        assert!(policy.is_family_disabled("A"));
        assert!(policy.enable_family("A"));
        assert!(!policy.enable_family("A"));
        assert!(!policy.is_family_disabled("A"));
    }

    #[test]
    fn test_id_toggle_is_independent_of_families() {
        let policy = EnablementPolicy::new();
        policy.disable_ids(["S1", "S2"]);
        policy.disable_family("S1");
        policy.enable_ids(["S1"]);
        assert!(!policy.is_diagnostic_disabled("S1"));
        assert!(policy.is_diagnostic_disabled("S2"));
        assert!(policy.is_family_disabled("S1"));
        assert_eq!(policy.disabled_ids(), vec!["S2".to_owned()]);
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        let policy = Arc::new(EnablementPolicy::new());
        std::thread::scope(|s| {
            let writer = Arc::clone(&policy);
            s.spawn(move || {
                for i in 0..100 {
                    writer.disable_ids([format!("X{i}")]);
                }
            });
            for _ in 0..4 {
                let reader = Arc::clone(&policy);
                s.spawn(move || {
                    for i in 0..100 {
                        let _ = reader.is_diagnostic_disabled(&format!("X{i}"));
                    }
                });
            }
        });
        assert_eq!(policy.disabled_ids().len(), 100);
    }
}
