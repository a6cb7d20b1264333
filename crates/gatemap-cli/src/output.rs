//! Output formatting and writing utilities
//!
//! This module provides utilities for formatting and writing output
//! in various formats (JSON, YAML, human-readable), with dedicated
//! renderings for mapping runs and integration validation.

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::logging::redaction;
use colored::Colorize;
use gatemap_core::pipeline::behaviors::timing::ELAPSED_MS;
use gatemap_core::{DispatchReceipt, GatewayOutcome, MappingStats, MappingWarning};
use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// What one `map` or `send` run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub integration: String,
    pub request_id: String,
    pub is_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub stats: MappingStats,
    pub warnings: Vec<MappingWarning>,
    /// Result properties with credentials redacted
    pub properties: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<DispatchReceipt>,
}

impl RunReport {
    /// Build a report from a gateway outcome, rendering the document
    pub fn from_outcome(integration: &str, outcome: &GatewayOutcome, pretty: bool) -> Result<Self> {
        let mut keys: Vec<&String> = outcome.result.properties.keys().collect();
        keys.sort();
        let mut properties = Map::new();
        for key in keys {
            properties.insert(key.clone(), outcome.result.properties[key].clone());
        }
        let mut redacted = Value::Object(properties);
        redaction::redact_json_value(&mut redacted);
        let properties = match redacted {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let document = match &outcome.document {
            Some(document) if outcome.result.is_success => Some(document.render(pretty)?),
            _ => None,
        };

        Ok(Self {
            integration: integration.to_string(),
            request_id: outcome.request_id.clone(),
            is_success: outcome.result.is_success,
            error_message: outcome.result.error_message.clone(),
            stats: outcome.result.stats,
            warnings: outcome.result.warnings.clone(),
            properties,
            document,
            saved_to: None,
            receipt: outcome.receipt.clone(),
        })
    }

    /// Elapsed milliseconds recorded by the timing behavior
    pub fn elapsed_ms(&self) -> Option<u64> {
        self.properties.get(ELAPSED_MS).and_then(Value::as_u64)
    }
}

/// Compile check of one field mapping
#[derive(Debug, Clone, Serialize)]
pub struct MappingCheck {
    pub index: usize,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transformers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl MappingCheck {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Result of `validate`
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub integration: String,
    pub source_format: String,
    pub destination_format: String,
    pub valid: bool,
    /// Problems not tied to a single mapping
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub mappings: Vec<MappingCheck>,
}

impl ValidationReport {
    pub fn invalid_count(&self) -> usize {
        self.mappings.iter().filter(|m| !m.is_valid()).count()
    }
}

/// Trait for formatting output with specialized support for common types
pub trait OutputFormatter {
    /// Format a serializable value
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Format a mapping run
    fn format_run_report(&self, report: &RunReport) -> Result<String>;

    /// Format a validation report; `detailed` lists valid mappings too
    fn format_validation_report(&self, report: &ValidationReport, detailed: bool) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
            OutputFormat::Human => Ok(serde_json::to_string_pretty(value)?),
        }
    }

    fn format_run_report(&self, report: &RunReport) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_run_report_human(report)),
            _ => self.format(report),
        }
    }

    fn format_validation_report(&self, report: &ValidationReport, detailed: bool) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_validation_report_human(report, detailed)),
            _ => self.format(report),
        }
    }
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    show_progress: bool,
    quiet: bool,
    verbose: u8,
    writer: Box<dyn Write>,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool, verbose: u8) -> Self {
        Self {
            format,
            use_color,
            show_progress: !quiet && io::stderr().is_terminal(),
            quiet,
            verbose,
            writer: Box::new(io::stdout()),
        }
    }

    /// Create an output writer with a custom writer
    #[cfg(test)]
    pub fn with_writer(
        format: OutputFormat,
        use_color: bool,
        quiet: bool,
        verbose: u8,
        writer: Box<dyn Write>,
    ) -> Self {
        Self {
            format,
            use_color,
            show_progress: false,
            quiet,
            verbose,
            writer,
        }
    }

    /// Turn progress indicators off regardless of the terminal
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress &= enabled;
        self
    }

    /// Get the output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write a line of output
    pub fn writeln(&mut self, content: &str) -> Result<()> {
        writeln!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write an info message
    pub fn info(&mut self, message: &str) -> Result<()> {
        debug!("Output info: {}", message);

        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.writeln(&format!("INFO: {}", message))
        }
    }

    /// Write a success message
    pub fn success(&mut self, message: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.green().to_string())
        } else {
            self.writeln(message)
        }
    }

    /// Write a warning message
    pub fn warning(&mut self, message: &str) -> Result<()> {
        if self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.yellow().to_string())
        } else {
            self.writeln(&format!("WARNING: {}", message))
        }
    }

    /// Write a run report
    pub fn run_report(&mut self, report: &RunReport) -> Result<()> {
        let formatted = self.format.format_run_report(report)?;
        self.writeln(formatted.trim_end())
    }

    /// Write a validation report
    pub fn validation_report(&mut self, report: &ValidationReport, detailed: bool) -> Result<()> {
        let formatted = self.format.format_validation_report(report, detailed)?;
        self.writeln(formatted.trim_end())
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(default_spinner_style());
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    /// Write debug information if verbose mode is enabled
    pub fn debug(&mut self, message: &str) -> Result<()> {
        if self.verbose > 0 && self.format == OutputFormat::Human {
            if self.use_color {
                self.writeln(&format!("{} {}", "DEBUG:".dimmed(), message.dimmed()))
            } else {
                self.writeln(&format!("DEBUG: {}", message))
            }
        } else {
            Ok(())
        }
    }
}

/// Helper function to create a spinner style
pub fn default_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn format_run_report_human(report: &RunReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("═══ Mapping Result: {} ═══\n\n", report.integration));

    if report.is_success {
        output.push_str(&format!("✅ Success (request {})\n", report.request_id));
    } else {
        output.push_str(&format!(
            "❌ Failed (request {}): {}\n",
            report.request_id,
            report.error_message.as_deref().unwrap_or("unknown error")
        ));
    }

    output.push_str(&format!(
        "  Mappings: {} applied, {} skipped\n",
        report.stats.mappings_applied, report.stats.mappings_skipped
    ));
    output.push_str(&format!("  Values written: {}\n", report.stats.values_written));
    if let Some(elapsed) = report.elapsed_ms() {
        output.push_str(&format!("  Duration: {}ms\n", elapsed));
    }
    output.push('\n');

    if !report.warnings.is_empty() {
        output.push_str(&format!("⚠️  Warnings ({}):\n", report.warnings.len()));
        for warning in &report.warnings {
            output.push_str(&format!(
                "  • [{}] {} -> {}: {}\n",
                warning.kind, warning.source, warning.destination, warning.message
            ));
        }
        output.push('\n');
    }

    if let Some(receipt) = &report.receipt {
        output.push_str(&format!(
            "📤 Downstream: status {} after {} attempt(s)\n",
            receipt.status, receipt.attempts
        ));
        if !receipt.body.trim().is_empty() {
            output.push_str(&format!("{}\n", redaction::redact_sensitive(receipt.body.trim())));
        }
        output.push('\n');
    }

    match (&report.saved_to, &report.document) {
        (Some(path), _) => {
            output.push_str(&format!("💾 Document saved to {}\n", path.display()));
        }
        (None, Some(document)) => {
            output.push_str("📝 Document:\n");
            output.push_str(document);
            output.push('\n');
        }
        (None, None) => {}
    }

    output
}

fn format_validation_report_human(report: &ValidationReport, detailed: bool) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "═══ Integration: {} ({} -> {}) ═══\n\n",
        report.integration, report.source_format, report.destination_format
    ));

    for error in &report.errors {
        output.push_str(&format!("❌ {}\n", error));
    }

    for check in &report.mappings {
        if check.is_valid() && !detailed {
            continue;
        }
        let icon = if check.is_valid() { "✓" } else { "✗" };
        output.push_str(&format!(
            "{} #{} {} -> {}\n",
            icon,
            check.index,
            check.source,
            check.destination.as_deref().unwrap_or("(resolve only)")
        ));
        if detailed && !check.transformers.is_empty() {
            output.push_str(&format!("    transformers: {}\n", check.transformers.join(", ")));
        }
        for error in &check.errors {
            output.push_str(&format!("    {}\n", error));
        }
    }

    if report.valid {
        output.push_str(&format!("\n✅ {} mapping(s) valid\n", report.mappings.len()));
    } else {
        output.push_str(&format!(
            "\n❌ {} of {} mapping(s) invalid\n",
            report.invalid_count(),
            report.mappings.len()
        ));
    }

    output
}
