//! Report command handlers
//!
//! Reads a run report from disk and prints the metadata one table's asset
//! would be materialized with.

use anyhow::{Context, Result};
use assetlink_bridge::extract::extract_resource_metadata;
use assetlink_core::domain::report::RunReport;
use assetlink_core::domain::resource::Resource;
use clap::Subcommand;
use colored::*;
use serde_json::Value as JsonValue;

use crate::config::Config;

/// Report subcommands
#[derive(Subcommand)]
pub enum ReportCommands {
    /// Print the normalized metadata for one table
    Extract {
        /// Path to the JSON run report
        report: String,

        /// Table whose load jobs are kept
        #[arg(short, long)]
        table: String,

        /// Fail on values that cannot be normalized
        #[arg(long)]
        strict: bool,
    },
}

/// Handle report commands
///
/// # Arguments
/// * `command` - The report command to execute
/// * `config` - The CLI configuration
pub async fn handle_report_command(command: ReportCommands, config: &Config) -> Result<()> {
    match command {
        ReportCommands::Extract {
            report,
            table,
            strict,
        } => extract(config, &report, &table, strict),
    }
}

/// Print the normalized metadata of `table`
fn extract(config: &Config, report_path: &str, table: &str, strict: bool) -> Result<()> {
    let content = std::fs::read_to_string(report_path)
        .with_context(|| format!("Failed to read report file: {}", report_path))?;
    let report: RunReport = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse report file: {}", report_path))?;

    let resource = Resource::new(report.pipeline_name.clone(), table);
    let metadata = extract_resource_metadata(&config.normalizer(strict), &resource, &report)
        .context("Failed to normalize report metadata")?;

    let jobs = metadata
        .get("jobs")
        .and_then(|jobs| jobs.as_list())
        .map(|jobs| jobs.len())
        .unwrap_or_default();
    if jobs == 0 {
        eprintln!(
            "{}",
            format!("No load jobs found for table '{}'.", table).yellow()
        );
    }

    let json: JsonValue = JsonValue::Object(
        metadata
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect(),
    );
    println!("{}", serde_json::to_string_pretty(&json)?);

    Ok(())
}
