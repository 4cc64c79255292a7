use crate::analyzer::Analyzer;
use crate::diagnostic::{DiagnosticDescriptor, Severity};
use crate::host::HostEngine;
use crate::interception::DescriptorConflict;
use crate::plugin::SkippedEntry;
use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// One loaded plugin, as shown to users.
#[derive(Debug, Clone, Serialize)]
pub struct PluginSummary {
    /// Exported type name.
    pub type_name: String,
    /// Rule family.
    pub family: String,
    /// Module name.
    pub module: String,
    /// Module location.
    pub location: PathBuf,
    /// Number of declared descriptors.
    pub descriptors: usize,
}

/// A supported descriptor with its owning family and current state.
#[derive(Debug, Clone, Serialize)]
pub struct DescriptorStatus {
    /// The descriptor as the host reports it.
    #[serde(flatten)]
    pub descriptor: DiagnosticDescriptor,
    /// Family whose gate governs the id.
    pub family: Option<String>,
    /// False when the id, its family or the plugin host family is disabled.
    pub enabled: bool,
}

/// Everything the inspection tool prints.
#[derive(Debug, Clone, Serialize)]
pub struct InspectionReport {
    /// Tool version.
    pub version: &'static str,
    /// Loaded plugins in load order.
    pub plugins: Vec<PluginSummary>,
    /// Descriptors supported by the host, sorted by id.
    pub descriptors: Vec<DescriptorStatus>,
    /// Skipped modules and types.
    pub skipped: Vec<SkippedEntry>,
    /// Contested diagnostic ids.
    pub conflicts: Vec<DescriptorConflict>,
    /// Disabled rule families.
    pub disabled_families: Vec<String>,
    /// Disabled diagnostic ids.
    pub disabled_diagnostics: Vec<String>,
}

impl InspectionReport {
    /// Snapshots `host` and its policy.
    #[must_use]
    pub fn collect(host: &HostEngine) -> Self {
        let plugins = host
            .plugins()
            .iter()
            .map(|plugin| PluginSummary {
                type_name: plugin.type_name().to_owned(),
                family: plugin.family().to_owned(),
                module: plugin.module_name().to_owned(),
                location: plugin.location().to_path_buf(),
                descriptors: plugin.analyzer().supported_diagnostics().len(),
            })
            .collect();
        Self {
            version: crate::VERSION,
            plugins,
            descriptors: host
                .supported_diagnostics()
                .iter()
                .map(|d| DescriptorStatus {
                    descriptor: DiagnosticDescriptor::clone(d),
                    family: host.owning_family(&d.id).map(str::to_owned),
                    enabled: host.is_descriptor_enabled(&d.id),
                })
                .collect(),
            skipped: host.load_report().skipped.clone(),
            conflicts: host.conflicts().to_vec(),
            disabled_families: host.policy().disabled_families(),
            disabled_diagnostics: host.policy().disabled_ids(),
        }
    }
}

/// Helper to create a styled table
fn create_table(headers: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers);
    table
}

/// Helper to map severity to Comfy Table Color
fn get_severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Info => Color::Blue,
        Severity::Hidden => Color::White,
    }
}

fn print_heading(writer: &mut impl Write, title: &str, count: usize) -> std::io::Result<()> {
    writeln!(
        writer,
        "{} {}",
        title.bold().underline(),
        format!("({count})").dimmed()
    )
}

/// Print the inspection report as tables.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_report(writer: &mut impl Write, report: &InspectionReport) -> std::io::Result<()> {
    print_heading(writer, "Plugins", report.plugins.len())?;
    if report.plugins.is_empty() {
        writeln!(writer, "{}", "No plugins loaded.".dimmed())?;
    } else {
        let mut table = create_table(vec!["Type", "Family", "Module", "Descriptors"]);
        for plugin in &report.plugins {
            table.add_row(vec![
                Cell::new(&plugin.type_name),
                Cell::new(&plugin.family),
                Cell::new(&plugin.module),
                Cell::new(plugin.descriptors),
            ]);
        }
        writeln!(writer, "{table}")?;
    }
    writeln!(writer)?;

    print_heading(writer, "Descriptors", report.descriptors.len())?;
    if !report.descriptors.is_empty() {
        let mut table = create_table(vec!["Id", "Title", "Category", "Severity", "Status", "Tags"]);
        for entry in &report.descriptors {
            let descriptor = &entry.descriptor;
            let status = if entry.enabled {
                Cell::new("enabled").fg(Color::Green)
            } else {
                Cell::new("disabled").fg(Color::DarkGrey)
            };
            table.add_row(vec![
                Cell::new(&descriptor.id),
                Cell::new(&descriptor.title),
                Cell::new(&descriptor.category),
                Cell::new(descriptor.default_severity)
                    .fg(get_severity_color(descriptor.default_severity)),
                status,
                Cell::new(descriptor.custom_tags.join(", ")),
            ]);
        }
        writeln!(writer, "{table}")?;
    }
    writeln!(writer)?;

    if !report.skipped.is_empty() {
        print_heading(writer, "Skipped", report.skipped.len())?;
        let mut table = create_table(vec!["Location", "Type", "Reason"]);
        for entry in &report.skipped {
            table.add_row(vec![
                Cell::new(entry.location.display()),
                Cell::new(entry.type_name.as_deref().unwrap_or("-")),
                Cell::new(&entry.reason).fg(Color::Yellow),
            ]);
        }
        writeln!(writer, "{table}")?;
        writeln!(writer)?;
    }

    if !report.conflicts.is_empty() {
        print_heading(writer, "Conflicts", report.conflicts.len())?;
        let mut table = create_table(vec!["Id", "Kept", "Rejected"]);
        for conflict in &report.conflicts {
            table.add_row(vec![
                Cell::new(&conflict.id),
                Cell::new(format!(
                    "{} ({})",
                    conflict.owner,
                    conflict.owner_location.display()
                )),
                Cell::new(format!(
                    "{} ({})",
                    conflict.rejected,
                    conflict.rejected_location.display()
                ))
                .fg(Color::Red),
            ]);
        }
        writeln!(writer, "{table}")?;
        writeln!(writer)?;
    }

    if !report.disabled_families.is_empty() {
        writeln!(
            writer,
            "{} {}",
            "Disabled families:".yellow().bold(),
            report.disabled_families.join(", ")
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PLUGIN_HOST_FAMILY;
    use crate::plugin::ExportedType;
    use crate::policy::EnablementPolicy;
    use crate::test_utils::{registry_loader, CallRule, NodeReporter, CALL};
    use std::sync::Arc;

    fn host(policy: &Arc<EnablementPolicy>) -> HostEngine {
        let loader = registry_loader(vec![(
            "plugins/rules.so",
            vec![ExportedType::analyzer::<CallRule>()],
        )]);
        HostEngine::new(loader, Arc::clone(policy))
            .with_native_analyzer(Arc::new(NodeReporter::new("X100", CALL).with_family("natives")))
    }

    fn status<'r>(report: &'r InspectionReport, id: &str) -> &'r DescriptorStatus {
        report
            .descriptors
            .iter()
            .find(|entry| entry.descriptor.id == id)
            .unwrap()
    }

    #[test]
    fn test_status_follows_plugin_host_family() {
        let policy = Arc::new(EnablementPolicy::new());
        let host = host(&policy);
        policy.disable_family(PLUGIN_HOST_FAMILY);

        let report = InspectionReport::collect(&host);
        assert!(!status(&report, "A001").enabled);
        assert!(status(&report, "X100").enabled);
        assert_eq!(status(&report, "X100").family.as_deref(), Some("natives"));

        let mut out = Vec::new();
        print_report(&mut out, &report).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("disabled"));
        assert!(text.contains("enabled"));
    }

    #[test]
    fn test_status_follows_owning_family_and_id() {
        let policy = Arc::new(EnablementPolicy::new());
        let host = host(&policy);
        let plugin_family = host.plugins()[0].family().to_owned();

        let report = InspectionReport::collect(&host);
        assert!(status(&report, "A001").enabled);
        assert_eq!(status(&report, "A001").family.as_deref(), Some(plugin_family.as_str()));

        policy.disable_family(plugin_family);
        policy.disable_ids(["X100"]);
        let report = InspectionReport::collect(&host);
        assert!(!status(&report, "A001").enabled);
        assert!(!status(&report, "X100").enabled);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["descriptors"][0]["id"], "A001");
        assert_eq!(json["descriptors"][0]["enabled"], false);
    }
}
