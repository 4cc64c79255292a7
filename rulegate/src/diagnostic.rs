//! Diagnostic descriptors, reported diagnostics and the sinks that receive them.

use crate::model::TextRange;
use crate::utils::format_message;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Not surfaced to users by default.
    Hidden,
    /// Informational.
    Info,
    /// A likely problem.
    #[default]
    Warning,
    /// A definite problem.
    Error,
}

impl Severity {
    /// Lowercase display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hidden => "hidden",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a diagnostic points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    /// File path, `None` for compilation-level findings.
    pub file: Option<PathBuf>,
    /// Byte range in the file.
    pub range: TextRange,
    /// 1-indexed line number.
    pub line: usize,
    /// 1-indexed column number.
    pub col: usize,
}

impl Location {
    /// Creates a location in a file.
    #[must_use]
    pub fn new(file: PathBuf, range: TextRange, line: usize, col: usize) -> Self {
        Self {
            file: Some(file),
            range,
            line,
            col,
        }
    }

    /// A location outside any source file.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns true if the location points into a file.
    #[must_use]
    pub fn is_in_source(&self) -> bool {
        self.file.is_some()
    }
}

/// Immutable metadata identifying one kind of diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticDescriptor {
    /// Unique identifier (e.g. `S1144`).
    pub id: String,
    /// Short title.
    pub title: String,
    /// Message template with `{0}`-style positional placeholders.
    pub message_format: String,
    /// Category (e.g. "Maintainability").
    pub category: String,
    /// Severity used when no override applies.
    pub default_severity: Severity,
    /// Whether the rule is on unless configured off.
    pub is_enabled_by_default: bool,
    /// Longer description.
    pub description: Option<String>,
    /// Documentation link.
    pub help_link: Option<String>,
    /// Free-form tags.
    pub custom_tags: Vec<String>,
}

impl DiagnosticDescriptor {
    /// Creates an enabled-by-default descriptor with no description, link or tags.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        message_format: impl Into<String>,
        category: impl Into<String>,
        default_severity: Severity,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            message_format: message_format.into(),
            category: category.into(),
            default_severity,
            is_enabled_by_default: true,
            description: None,
            help_link: None,
            custom_tags: Vec::new(),
        }
    }

    /// Builder-style method to set the default-enabled flag.
    #[must_use]
    pub fn enabled_by_default(mut self, enabled: bool) -> Self {
        self.is_enabled_by_default = enabled;
        self
    }

    /// Builder-style method to set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder-style method to set the help link.
    #[must_use]
    pub fn with_help_link(mut self, link: impl Into<String>) -> Self {
        self.help_link = Some(link.into());
        self
    }

    /// Builder-style method to add a custom tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.custom_tags.push(tag.into());
        self
    }

    /// Returns true if `tag` is among the custom tags.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.custom_tags.iter().any(|t| t == tag)
    }
}

/// A reported finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Descriptor the diagnostic was created from.
    pub descriptor: Arc<DiagnosticDescriptor>,
    /// Primary location.
    pub location: Location,
    /// Secondary locations.
    pub additional_locations: Vec<Location>,
    /// Property bag consumed by code fixes.
    pub properties: BTreeMap<String, String>,
    /// Positional arguments for the descriptor's message format.
    pub message_args: Vec<String>,
    /// Effective severity.
    pub severity: Severity,
}

impl Diagnostic {
    /// Creates a diagnostic at the descriptor's default severity.
    #[must_use]
    pub fn create(
        descriptor: Arc<DiagnosticDescriptor>,
        location: Location,
        message_args: Vec<String>,
    ) -> Self {
        let severity = descriptor.default_severity;
        Self {
            descriptor,
            location,
            additional_locations: Vec::new(),
            properties: BTreeMap::new(),
            message_args,
            severity,
        }
    }

    /// Builder-style method to set secondary locations.
    #[must_use]
    pub fn with_additional_locations(mut self, locations: Vec<Location>) -> Self {
        self.additional_locations = locations;
        self
    }

    /// Builder-style method to add a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Builder-style method to override the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Descriptor identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// Rendered message.
    #[must_use]
    pub fn message(&self) -> String {
        format_message(&self.descriptor.message_format, &self.message_args)
    }
}

/// Receiver of reported diagnostics.
///
/// Implementations are shared by every callback of a pass, so `report` takes
/// `&self` and must be callable from several analysis threads.
pub trait DiagnosticSink: Send + Sync {
    /// Accepts one diagnostic.
    fn report(&self, diagnostic: Diagnostic);
}

impl<F> DiagnosticSink for F
where
    F: Fn(Diagnostic) + Send + Sync,
{
    fn report(&self, diagnostic: Diagnostic) {
        self(diagnostic);
    }
}

/// A sink collecting diagnostics in memory.
#[derive(Debug, Default)]
pub struct DiagnosticBag {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of collected diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the bag.
    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl DiagnosticSink for DiagnosticBag {
    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}
