//! Materialization service
//!
//! Handles a unit-of-work run end to end:
//! - Recovering the source and pipeline bound at build time
//! - Narrowing the source to the selected assets
//! - Executing the pipeline once
//! - Emitting one completion record per executed asset
//!
//! The pipeline run is the only step with side effects. Everything after it
//! is a pure function of the returned report.

use assetlink_core::dto::materialization::CompletionRecord;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{BridgeConfig, EmptySelectionPolicy};
use crate::context::ExecutionContext;
use crate::engine::{PipelineError, RunParams};
use crate::error::{BridgeError, Result};
use crate::extract::extract_resource_metadata;
use crate::subset::plan_execution;
use crate::unit::UnitOfWork;

/// Service trait for materializing a unit of work
#[async_trait]
pub trait MaterializationService: Send + Sync {
    /// Runs `unit` for the assets selected in `ctx`
    ///
    /// # Arguments
    /// * `unit` - The unit of work built at definition time
    /// * `ctx` - Selection and report mode for this run
    /// * `params` - Run parameters forwarded verbatim to the pipeline
    ///
    /// # Returns
    /// One completion record per executed asset, in the source's native order
    async fn materialize(
        &self,
        unit: &UnitOfWork,
        ctx: &ExecutionContext,
        params: &RunParams,
    ) -> Result<Vec<CompletionRecord>>;
}

/// Standard implementation of MaterializationService
pub struct StandardMaterializationService {
    config: Arc<BridgeConfig>,
}

impl StandardMaterializationService {
    /// Creates a new standard materialization service
    pub fn new(config: Arc<BridgeConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

impl Default for StandardMaterializationService {
    fn default() -> Self {
        Self::new(Arc::new(BridgeConfig::default()))
    }
}

#[async_trait]
impl MaterializationService for StandardMaterializationService {
    async fn materialize(
        &self,
        unit: &UnitOfWork,
        ctx: &ExecutionContext,
        params: &RunParams,
    ) -> Result<Vec<CompletionRecord>> {
        let (source, pipeline) = unit.resolve_binding()?;

        let plan = plan_execution(&source, unit.translator(), &ctx.selection)?;

        if plan.pairing.is_empty() {
            match self.config.empty_selection {
                EmptySelectionPolicy::Allow => {
                    debug!(run_id = %ctx.run_id, unit = unit.name(), "Nothing selected, skipping run");
                    return Ok(Vec::new());
                }
                EmptySelectionPolicy::Warn => {
                    warn!(
                        run_id = %ctx.run_id,
                        unit = unit.name(),
                        requested = ctx.selection.keys.len(),
                        "No resource matched the selection, pipeline not executed"
                    );
                    return Ok(Vec::new());
                }
                EmptySelectionPolicy::Error => {
                    return Err(BridgeError::EmptyPairing {
                        requested: ctx.selection.keys.iter().cloned().collect(),
                    });
                }
            }
        }

        info!(
            run_id = %ctx.run_id,
            unit = unit.name(),
            pipeline = pipeline.name(),
            resources = plan.pairing.len(),
            subset = ctx.is_subset(),
            "Running pipeline"
        );

        let report = match pipeline.run(Arc::clone(&plan.source), params).await {
            Ok(report) => report,
            Err(e) => {
                error!(run_id = %ctx.run_id, pipeline = pipeline.name(), "Pipeline run failed: {}", e);
                return Err(e.into());
            }
        };

        if self.config.raise_on_failed_jobs && report.has_failed_jobs() {
            let mut tables: Vec<String> = Vec::new();
            for job in report.failed_jobs() {
                if !tables.contains(&job.table_name) {
                    tables.push(job.table_name.clone());
                }
            }
            error!(run_id = %ctx.run_id, tables = ?tables, "Load jobs failed");
            return Err(PipelineError::FailedJobs { tables }.into());
        }

        let normalizer = self.config.normalizer();
        let mut records = Vec::with_capacity(plan.pairing.len());
        for (key, resource) in plan.pairing {
            let metadata = extract_resource_metadata(&normalizer, &resource, &report)?;
            debug!(run_id = %ctx.run_id, asset = %key, mode = %ctx.mode, "Emitting completion record");
            records.push(CompletionRecord::new(ctx.mode, key, metadata));
        }

        info!(
            run_id = %ctx.run_id,
            unit = unit.name(),
            records = records.len(),
            "Materialization completed"
        );

        Ok(records)
    }
}
