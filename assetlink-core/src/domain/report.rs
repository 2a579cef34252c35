//! Pipeline run reports
//!
//! A run report is produced once per pipeline execution and covers every
//! resource that ran in that invocation. Per-resource data is not separated;
//! jobs are tagged with the table they loaded.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::metadata::MetadataValue;

/// Job state reported for a load job that did not complete
pub const FAILED_JOB_STATE: &str = "failed_jobs";

/// Structured outcome of one pipeline execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub pipeline_name: String,
    pub first_run: bool,
    pub started_at: DateTime<FixedOffset>,
    pub finished_at: Option<DateTime<FixedOffset>>,
    pub dataset_name: String,
    pub destination_name: String,
    pub destination_type: String,
    #[serde(default)]
    pub load_packages: Vec<LoadPackage>,
}

/// A batch of load jobs committed together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadPackage {
    pub load_id: String,
    pub state: String,
    pub completed_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub jobs: Vec<LoadJob>,
}

/// One file loaded into one destination table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadJob {
    pub job_id: String,
    pub table_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub state: String,
    pub created_at: DateTime<FixedOffset>,
    /// Seconds spent loading the file
    pub elapsed: f64,
    pub failed_message: Option<String>,
}

impl RunReport {
    /// Renders the report as a metadata mapping
    ///
    /// Timestamps stay rich values; callers normalize before persisting.
    pub fn as_metadata(&self) -> BTreeMap<String, MetadataValue> {
        BTreeMap::from([
            (
                "pipeline".to_string(),
                MetadataValue::Map(BTreeMap::from([(
                    "pipeline_name".to_string(),
                    MetadataValue::from(self.pipeline_name.as_str()),
                )])),
            ),
            ("first_run".to_string(), MetadataValue::from(self.first_run)),
            ("started_at".to_string(), MetadataValue::from(self.started_at)),
            ("finished_at".to_string(), MetadataValue::from(self.finished_at)),
            (
                "dataset_name".to_string(),
                MetadataValue::from(self.dataset_name.as_str()),
            ),
            (
                "destination_name".to_string(),
                MetadataValue::from(self.destination_name.as_str()),
            ),
            (
                "destination_type".to_string(),
                MetadataValue::from(self.destination_type.as_str()),
            ),
            (
                "load_packages".to_string(),
                MetadataValue::List(
                    self.load_packages
                        .iter()
                        .map(LoadPackage::as_metadata)
                        .collect(),
                ),
            ),
        ])
    }

    /// Jobs that failed to load, across all packages
    pub fn failed_jobs(&self) -> Vec<&LoadJob> {
        self.load_packages
            .iter()
            .flat_map(|package| package.jobs.iter())
            .filter(|job| job.state == FAILED_JOB_STATE)
            .collect()
    }

    pub fn has_failed_jobs(&self) -> bool {
        !self.failed_jobs().is_empty()
    }
}

impl LoadPackage {
    pub fn as_metadata(&self) -> MetadataValue {
        MetadataValue::Map(BTreeMap::from([
            ("load_id".to_string(), MetadataValue::from(self.load_id.as_str())),
            ("state".to_string(), MetadataValue::from(self.state.as_str())),
            ("completed_at".to_string(), MetadataValue::from(self.completed_at)),
            (
                "jobs".to_string(),
                MetadataValue::List(self.jobs.iter().map(LoadJob::as_metadata).collect()),
            ),
        ]))
    }
}

impl LoadJob {
    pub fn as_metadata(&self) -> MetadataValue {
        MetadataValue::Map(BTreeMap::from([
            ("job_id".to_string(), MetadataValue::from(self.job_id.as_str())),
            (
                "table_name".to_string(),
                MetadataValue::from(self.table_name.as_str()),
            ),
            ("file_path".to_string(), MetadataValue::from(self.file_path.as_str())),
            ("file_size".to_string(), MetadataValue::from(self.file_size)),
            ("state".to_string(), MetadataValue::from(self.state.as_str())),
            ("created_at".to_string(), MetadataValue::from(self.created_at)),
            ("elapsed".to_string(), MetadataValue::from(self.elapsed)),
            (
                "failed_message".to_string(),
                MetadataValue::from(self.failed_message.clone()),
            ),
        ]))
    }
}
