//! Assetlink Connectors
//!
//! Assets that live next to the pipeline bridge but are materialized by
//! other systems:
//! - `stages`: warehouse stages and external tables over replicated files
//! - `sync`: reverse-ETL syncs reported as asset materializations
//!
//! Warehouses and sync services are reached through the `Warehouse` and
//! `SyncClient` traits; drivers are supplied by the caller.

pub mod error;
pub mod sql;
pub mod stages;
pub mod sync;

// Re-export commonly used types
pub use error::{ConnectorError, Result};
pub use sql::{Connection, Row, Warehouse};
pub use stages::{StageAction, StageOutcome, StageProvisioner};
pub use sync::{SyncAsset, SyncClient, SyncResult};
