//! Assetlink Bridge
//!
//! Exposes the resources of a pipeline engine source as assets of an
//! orchestrator and reports what each run loaded.
//!
//! The bridge is built from five parts:
//! - `translator`: derives asset keys and dependencies for resources
//! - `subset`: narrows a source to the assets selected for a run
//! - `normalize`: turns run metadata into storable values
//! - `service`: runs the pipeline and emits completion records
//! - `unit`: groups the specs of one source into a unit of work
//!
//! # Example
//!
//! ```no_run
//! use assetlink_bridge::{
//!     ExecutionContext, MaterializationService, Pipeline, PipelineSource, RunParams,
//!     StandardMaterializationService, StaticSource, UnitOfWorkBuilder,
//! };
//! use assetlink_core::dto::materialization::ReportMode;
//! use std::sync::Arc;
//!
//! async fn run(pipeline: Arc<dyn Pipeline>) -> assetlink_bridge::Result<()> {
//!     let source: Arc<dyn PipelineSource> =
//!         Arc::new(StaticSource::new("shop", ["orders", "customers"]));
//!     let unit = UnitOfWorkBuilder::new(source, pipeline).build()?;
//!
//!     let ctx = ExecutionContext::full(unit.keys().cloned(), ReportMode::AssetMaterialization);
//!     let service = StandardMaterializationService::default();
//!     for record in unit.materialize(&service, &ctx, &RunParams::new()).await? {
//!         println!("{}", record.asset_key);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod service;
pub mod subset;
pub mod translator;
pub mod unit;

// Re-export commonly used types
pub use config::{BridgeConfig, EmptySelectionPolicy};
pub use context::ExecutionContext;
pub use engine::{Pipeline, PipelineError, PipelineSource, RunParams, StaticSource};
pub use error::{BridgeError, Result};
pub use normalize::{NormalizeError, NormalizePolicy, Normalizer};
pub use service::{MaterializationService, StandardMaterializationService};
pub use subset::{ExecutionPairing, ExecutionPlan, Selection, plan_execution};
pub use translator::{AssetTranslator, DefaultTranslator};
pub use unit::{PipelineBinding, UnitOfWork, UnitOfWorkBuilder};
