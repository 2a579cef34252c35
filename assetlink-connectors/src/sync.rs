//! Reverse-ETL sync assets
//!
//! A sync asset triggers one sync on a reverse-ETL service, waits for it to
//! finish and reports the run details as asset metadata.

use assetlink_bridge::Normalizer;
use assetlink_core::domain::asset::AssetSpec;
use assetlink_core::domain::metadata::{MetadataValue, NormalizedMetadata};
use assetlink_core::dto::materialization::{CompletionRecord, ReportMode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::error::{ConnectorError, Result};

/// Details returned by a finished sync
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    #[serde(default)]
    pub sync_details: BTreeMap<String, MetadataValue>,
    #[serde(default)]
    pub sync_run_details: BTreeMap<String, MetadataValue>,
    #[serde(default)]
    pub destination_details: BTreeMap<String, MetadataValue>,
}

impl SyncResult {
    /// Flattens the result into asset metadata
    ///
    /// The three detail maps are kept whole. `query_size`,
    /// `completion_ratio` and `failed_rows` are lifted out of the run details
    /// and are `Null` when the service did not report them.
    pub fn to_metadata(&self) -> BTreeMap<String, MetadataValue> {
        let run_detail = |key: &str| {
            self.sync_run_details
                .get(key)
                .cloned()
                .unwrap_or(MetadataValue::Null)
        };

        let failed_rows = self
            .sync_run_details
            .get("failedRows")
            .and_then(|rows| rows.get("addedCount"))
            .cloned()
            .unwrap_or(MetadataValue::Null);

        BTreeMap::from([
            (
                "sync_details".to_string(),
                MetadataValue::Map(self.sync_details.clone()),
            ),
            (
                "sync_run_details".to_string(),
                MetadataValue::Map(self.sync_run_details.clone()),
            ),
            (
                "destination_details".to_string(),
                MetadataValue::Map(self.destination_details.clone()),
            ),
            ("query_size".to_string(), run_detail("querySize")),
            ("completion_ratio".to_string(), run_detail("completionRatio")),
            ("failed_rows".to_string(), failed_rows),
        ])
    }
}

/// Client for a reverse-ETL service
#[async_trait]
pub trait SyncClient: Send + Sync {
    /// Starts sync `sync_id` and waits until it finishes
    async fn sync_and_poll(&self, sync_id: &str) -> Result<SyncResult>;
}

/// An asset materialized by running one sync
#[derive(Debug, Clone)]
pub struct SyncAsset {
    spec: AssetSpec,
    sync_id_env_var: String,
}

impl SyncAsset {
    /// Creates a sync asset whose sync id is read from `sync_id_env_var`
    pub fn new(spec: AssetSpec, sync_id_env_var: impl Into<String>) -> Self {
        Self {
            spec,
            sync_id_env_var: sync_id_env_var.into(),
        }
    }

    pub fn spec(&self) -> &AssetSpec {
        &self.spec
    }

    /// Reads the sync id from the environment
    ///
    /// # Errors
    /// Returns `ConnectorError::MissingSyncId` if the variable is unset or
    /// empty.
    pub fn sync_id(&self) -> Result<String> {
        match std::env::var(&self.sync_id_env_var) {
            Ok(id) if !id.is_empty() => Ok(id),
            _ => Err(ConnectorError::MissingSyncId {
                env_var: self.sync_id_env_var.clone(),
            }),
        }
    }

    /// Runs the sync named by the environment and reports it
    pub async fn materialize(
        &self,
        client: &dyn SyncClient,
        normalizer: &Normalizer,
        mode: ReportMode,
    ) -> Result<CompletionRecord> {
        let sync_id = self.sync_id()?;
        self.materialize_sync(&sync_id, client, normalizer, mode)
            .await
    }

    /// Runs sync `sync_id` and reports it
    pub async fn materialize_sync(
        &self,
        sync_id: &str,
        client: &dyn SyncClient,
        normalizer: &Normalizer,
        mode: ReportMode,
    ) -> Result<CompletionRecord> {
        info!(asset = %self.spec.key, sync_id = sync_id, "Starting sync");
        let result = client.sync_and_poll(sync_id).await?;

        let metadata: NormalizedMetadata = normalizer.normalize_map(&result.to_metadata())?;
        info!(asset = %self.spec.key, "Sync completed");

        Ok(CompletionRecord::new(mode, self.spec.key.clone(), metadata))
    }
}
