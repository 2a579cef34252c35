//! Per-resource metadata extraction
//!
//! A run report covers every resource of the invocation. The metadata for a
//! single resource is the report's shared top-level fields plus the load jobs
//! that targeted the resource's table.

use assetlink_core::domain::metadata::{MetadataValue, NormalizedMetadata};
use assetlink_core::domain::report::RunReport;
use assetlink_core::domain::resource::Resource;

use crate::normalize::{NormalizeError, Normalizer};

/// Top-level report fields shared by every asset of a run
pub const BASE_METADATA_KEYS: [&str; 6] = [
    "first_run",
    "started_at",
    "finished_at",
    "dataset_name",
    "destination_name",
    "destination_type",
];

/// Metadata key holding the jobs of the resource's table
pub const JOBS_KEY: &str = "jobs";

/// Builds the normalized metadata of one resource from a run report
///
/// `jobs` lists every job of every load package whose `table_name` equals
/// the resource's table, in report order.
pub fn extract_resource_metadata(
    normalizer: &Normalizer,
    resource: &Resource,
    report: &RunReport,
) -> Result<NormalizedMetadata, NormalizeError> {
    let report_metadata = normalizer.normalize_map(&report.as_metadata())?;

    let mut metadata: NormalizedMetadata = report_metadata
        .iter()
        .filter(|(key, _)| BASE_METADATA_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let jobs = report_metadata
        .get("load_packages")
        .and_then(MetadataValue::as_list)
        .unwrap_or_default()
        .iter()
        .flat_map(|package| {
            package
                .get(JOBS_KEY)
                .and_then(MetadataValue::as_list)
                .unwrap_or_default()
        })
        .filter(|job| {
            job.get("table_name").and_then(MetadataValue::as_str)
                == Some(resource.table_name.as_str())
        })
        .cloned()
        .collect();

    metadata.insert(JOBS_KEY.to_string(), MetadataValue::List(jobs));
    Ok(metadata)
}
