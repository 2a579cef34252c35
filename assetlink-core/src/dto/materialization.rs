//! Materialization records

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::asset::AssetKey;
use crate::domain::metadata::NormalizedMetadata;

/// How the orchestrator should interpret a completion record
///
/// Selected once per run, at the boundary where the execution context is
/// built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportMode {
    /// Final materialization result of an asset computation
    AssetMaterialization,
    /// Materialization event logged from inside an op
    OpMaterialization,
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportMode::AssetMaterialization => write!(f, "asset_materialization"),
            ReportMode::OpMaterialization => write!(f, "op_materialization"),
        }
    }
}

/// One completed asset, as reported to the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub mode: ReportMode,
    pub asset_key: AssetKey,
    pub metadata: NormalizedMetadata,
}

impl CompletionRecord {
    pub fn new(mode: ReportMode, asset_key: AssetKey, metadata: NormalizedMetadata) -> Self {
        Self {
            mode,
            asset_key,
            metadata,
        }
    }
}
