//! Source command handlers
//!
//! Loads a source manifest and shows the asset specs a unit of work would
//! register, or how a run would pair assets with resources.

use anyhow::{Context, Result};
use assetlink_bridge::{PipelineSource, Selection, StaticSource, UnitOfWorkBuilder, plan_execution};
use assetlink_core::domain::asset::{AssetKey, AssetSpec};
use clap::Subcommand;
use colored::*;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;

/// Source subcommands
#[derive(Subcommand)]
pub enum SourceCommands {
    /// Show the asset specs derived from a source manifest
    Specs {
        /// Path to the JSON source manifest
        manifest: String,

        /// Group name attached to every spec
        #[arg(short, long)]
        group: Option<String>,
    },
    /// Show the asset/resource pairing of a run
    Plan {
        /// Path to the JSON source manifest
        manifest: String,

        /// Asset keys to run (e.g. dlt/shop_orders); all assets when omitted
        #[arg(short, long)]
        select: Vec<String>,
    },
}

/// Handle source commands
///
/// # Arguments
/// * `command` - The source command to execute
/// * `config` - The CLI configuration
pub async fn handle_source_command(command: SourceCommands, config: &Config) -> Result<()> {
    match command {
        SourceCommands::Specs { manifest, group } => show_specs(config, &manifest, group),
        SourceCommands::Plan { manifest, select } => show_plan(config, &manifest, &select),
    }
}

/// Reads a source manifest from disk
fn load_source(path: &str) -> Result<Arc<dyn PipelineSource>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest file: {}", path))?;
    let source = StaticSource::from_json(&content)
        .with_context(|| format!("Failed to parse manifest file: {}", path))?;
    debug!(
        source = source.name(),
        resources = source.resources().len(),
        "Loaded source manifest"
    );
    Ok(Arc::new(source))
}

/// Parses `--select` values into a selection
fn parse_selection(select: &[String]) -> Result<Selection> {
    if select.is_empty() {
        return Ok(Selection::full([]));
    }
    let keys = select
        .iter()
        .map(|s| AssetKey::parse(s).with_context(|| format!("Invalid asset key: {}", s)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Selection::subset(keys))
}

/// Show the specs a unit of work would register
fn show_specs(config: &Config, manifest: &str, group: Option<String>) -> Result<()> {
    let source = load_source(manifest)?;

    let mut builder =
        UnitOfWorkBuilder::unbound(source).translator(Arc::new(config.translator()));
    if let Some(group) = group {
        builder = builder.group_name(group);
    }
    let unit = builder.build().context("Failed to build unit of work")?;

    println!(
        "{}",
        format!("Unit '{}' ({} asset(s)):", unit.name(), unit.specs().len()).bold()
    );
    println!();
    for spec in unit.specs() {
        print_spec(spec);
    }

    Ok(())
}

/// Show the pairing a run would execute
fn show_plan(config: &Config, manifest: &str, select: &[String]) -> Result<()> {
    let source = load_source(manifest)?;
    let selection = parse_selection(select)?;

    let plan = plan_execution(&source, &config.translator(), &selection)
        .context("Failed to plan execution")?;

    let kind = if selection.is_subset { "Subset" } else { "Full" };
    println!(
        "{}",
        format!("{} run of source '{}':", kind, source.name()).bold()
    );

    if plan.pairing.is_empty() {
        println!("  {}", "No resource matched the selection.".yellow());
    }
    for (key, resource) in plan.pairing.pairs() {
        println!(
            "  {} {} {} {}",
            "▸".cyan(),
            key.to_string().bold(),
            "←".dimmed(),
            resource.name
        );
        if resource.table_name != resource.name {
            println!("      Table: {}", resource.table_name.dimmed());
        }
    }

    if !plan.unmatched.is_empty() {
        println!();
        println!("{}", "Unmatched keys:".red().bold());
        for key in &plan.unmatched {
            println!("  - {}", key.to_string().red());
        }
    }

    Ok(())
}

/// Print one asset spec
fn print_spec(spec: &AssetSpec) {
    println!("  {} {}", "▸".cyan(), spec.key.to_string().bold());
    if !spec.deps.is_empty() {
        println!(
            "    Deps:     {}",
            spec.deps
                .iter()
                .map(AssetKey::to_user_string)
                .collect::<Vec<_>>()
                .join(", ")
                .dimmed()
        );
    }
    if let Some(group) = &spec.group_name {
        println!("    Group:    {}", group.dimmed());
    }
    if let Some(policy) = &spec.automation_policy {
        println!("    Policy:   {}", format!("{:?}", policy).dimmed());
    }
    for (key, value) in &spec.metadata {
        println!("    {}: {}", key, value.to_json().to_string().dimmed());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection() {
        let full = parse_selection(&[]).unwrap();
        assert!(!full.is_subset);

        let subset = parse_selection(&["dlt/shop_orders".to_string()]).unwrap();
        assert!(subset.is_subset);
        assert!(
            subset
                .keys
                .contains(&AssetKey::new(["dlt", "shop_orders"]).unwrap())
        );

        assert!(parse_selection(&["dlt//orders".to_string()]).is_err());
    }
}
