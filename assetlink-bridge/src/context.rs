//! Execution context for a unit-of-work run
//!
//! Built once by the caller at the orchestrator boundary. The report mode is
//! fixed here so the emitter never has to inspect what kind of caller it is
//! serving.

use assetlink_core::domain::asset::AssetKey;
use assetlink_core::dto::materialization::ReportMode;
use uuid::Uuid;

use crate::subset::Selection;

/// Per-run state handed to the materialization service
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Identifier of this run, used in log spans
    pub run_id: Uuid,
    /// Keys selected by the orchestrator
    pub selection: Selection,
    /// How completion records are reported
    pub mode: ReportMode,
}

impl ExecutionContext {
    /// Context for running every asset of a unit of work
    pub fn full<I: IntoIterator<Item = AssetKey>>(keys: I, mode: ReportMode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            selection: Selection::full(keys),
            mode,
        }
    }

    /// Context for running only `keys`
    pub fn subset<I: IntoIterator<Item = AssetKey>>(keys: I, mode: ReportMode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            selection: Selection::subset(keys),
            mode,
        }
    }

    pub fn is_subset(&self) -> bool {
        self.selection.is_subset
    }
}
