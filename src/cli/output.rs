use serde::Serialize;

use super::commands::RunReport;
use super::OutputFormat;

/// Format a run report for output.
pub fn format_report(report: &RunReport, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Json | OutputFormat::Compact => format_json(report, format),
        OutputFormat::Text => {
            let mut output = String::new();
            for file in &report.files {
                if let Some(error) = &file.error {
                    output.push_str(&format!("{}: error: {}\n", file.path, error));
                    continue;
                }
                for change in &file.changes {
                    output.push_str(&format!("{}:{}\n", file.path, change.line));
                    output.push_str(&format!("  - {}\n", change.before));
                    output.push_str(&format!("  + {}\n", change.after));
                }
            }

            let verb = if report.written { "Rewrote" } else { "Would rewrite" };
            output.push_str(&format!(
                "{} {} of {} files",
                verb, report.files_changed, report.files_scanned
            ));
            output
        }
    }
}

/// Format any serializable value as JSON.
pub fn format_json<T: Serialize>(value: &T, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Compact => serde_json::to_string(value).unwrap_or_default(),
        OutputFormat::Json | OutputFormat::Text => serde_json::to_string_pretty(value).unwrap_or_default(),
    }
}
