//! Pipeline engine interfaces
//!
//! The pipeline engine is a black box to the bridge. It exposes a source (an
//! ordered resource collection that can be narrowed to a named subset) and a
//! pipeline that runs a source and returns one `RunReport`.

use assetlink_core::domain::report::RunReport;
use assetlink_core::domain::resource::Resource;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// Free-form run parameters, forwarded verbatim to the pipeline
pub type RunParams = serde_json::Map<String, serde_json::Value>;

/// Errors raised by the pipeline engine
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The execution step raised
    #[error("{0}")]
    Execution(String),

    /// The execution step was cancelled by the caller or the engine
    #[error("pipeline run was cancelled")]
    Cancelled,

    /// A subset named a resource the source does not have
    #[error("source '{source_name}' has no resource named '{resource}'")]
    UnknownResource {
        source_name: String,
        resource: String,
    },

    /// The run finished but some load jobs failed
    #[error("{} load job(s) failed for tables: {}", .tables.len(), .tables.join(", "))]
    FailedJobs { tables: Vec<String> },
}

/// Ordered collection of resources owned by the pipeline engine
pub trait PipelineSource: Send + Sync {
    /// Name of the source
    fn name(&self) -> &str;

    /// Resources in their native order
    fn resources(&self) -> &[Resource];

    /// Returns a view of this source restricted to the named resources
    ///
    /// The returned source keeps the native order of the retained resources.
    ///
    /// # Errors
    /// Returns `PipelineError::UnknownResource` if a name is not part of
    /// this source.
    fn with_resources(&self, names: &[String]) -> Result<Arc<dyn PipelineSource>, PipelineError>;
}

/// Executes a source and reports what was loaded
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Name identifying the pipeline
    fn name(&self) -> &str;

    /// Runs every resource of `source` once
    ///
    /// This is the only step that moves data. It is treated as atomic: the
    /// returned report is the only observable output.
    async fn run(
        &self,
        source: Arc<dyn PipelineSource>,
        params: &RunParams,
    ) -> Result<RunReport, PipelineError>;
}

/// A source described entirely by its resource list
///
/// Used for manifests loaded from disk and for engines whose sources carry
/// no state beyond their resource descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticSource {
    name: String,
    resources: Vec<Resource>,
}

#[derive(Deserialize)]
struct SourceManifest {
    name: String,
    resources: Vec<ResourceManifest>,
}

#[derive(Deserialize)]
struct ResourceManifest {
    name: String,
    table_name: Option<String>,
}

impl StaticSource {
    /// Creates a source whose resources load into tables of the same name
    pub fn new<I, S>(name: impl Into<String>, resource_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let resources = resource_names
            .into_iter()
            .map(|resource| Resource::new(name.clone(), resource))
            .collect();
        Self { name, resources }
    }

    /// Creates a source from fully specified resources
    pub fn from_resources(name: impl Into<String>, resources: Vec<Resource>) -> Self {
        Self {
            name: name.into(),
            resources,
        }
    }

    /// Parses a JSON manifest
    ///
    /// ```json
    /// { "name": "shop", "resources": [{ "name": "orders", "table_name": "orders" }] }
    /// ```
    ///
    /// `table_name` defaults to the resource name.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let manifest: SourceManifest = serde_json::from_str(json)?;
        let resources = manifest
            .resources
            .into_iter()
            .map(|entry| {
                let resource = Resource::new(manifest.name.clone(), entry.name);
                match entry.table_name {
                    Some(table_name) => resource.with_table_name(table_name),
                    None => resource,
                }
            })
            .collect();
        Ok(Self {
            name: manifest.name,
            resources,
        })
    }
}

impl PipelineSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn resources(&self) -> &[Resource] {
        &self.resources
    }

    fn with_resources(&self, names: &[String]) -> Result<Arc<dyn PipelineSource>, PipelineError> {
        if let Some(unknown) = names
            .iter()
            .find(|name| !self.resources.iter().any(|r| &r.name == *name))
        {
            return Err(PipelineError::UnknownResource {
                source_name: self.name.clone(),
                resource: unknown.clone(),
            });
        }

        let resources = self
            .resources
            .iter()
            .filter(|r| names.contains(&r.name))
            .cloned()
            .collect();

        Ok(Arc::new(Self {
            name: self.name.clone(),
            resources,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource_names(source: &dyn PipelineSource) -> Vec<&str> {
        source.resources().iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_static_source_new() {
        let source = StaticSource::new("shop", ["orders", "customers"]);
        assert_eq!(source.name(), "shop");
        assert_eq!(resource_names(&source), vec!["orders", "customers"]);
        assert!(source.resources().iter().all(|r| r.source_name == "shop"));
    }

    #[test]
    fn test_with_resources_keeps_native_order() {
        let source = StaticSource::new("shop", ["orders", "customers", "refunds"]);
        let narrowed = source
            .with_resources(&["refunds".to_string(), "orders".to_string()])
            .unwrap();
        assert_eq!(resource_names(narrowed.as_ref()), vec!["orders", "refunds"]);
        assert_eq!(narrowed.name(), "shop");
    }

    #[test]
    fn test_with_resources_rejects_unknown_name() {
        let source = StaticSource::new("shop", ["orders"]);
        let err = match source.with_resources(&["gamma".to_string()]) {
            Err(err) => err,
            Ok(_) => panic!("expected an unknown resource error"),
        };
        assert!(matches!(
            err,
            PipelineError::UnknownResource { ref resource, .. } if resource == "gamma"
        ));
    }

    #[test]
    fn test_from_json_manifest() {
        let source = StaticSource::from_json(
            r#"{
                "name": "shop",
                "resources": [
                    { "name": "orders" },
                    { "name": "customers", "table_name": "dim_customers" }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(source.resources()[0].table_name, "orders");
        assert_eq!(source.resources()[1].table_name, "dim_customers");
        assert_eq!(source.resources()[1].source_name, "shop");
    }

    #[test]
    fn test_failed_jobs_message() {
        let err = PipelineError::FailedJobs {
            tables: vec!["orders".to_string(), "customers".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "2 load job(s) failed for tables: orders, customers"
        );
    }
}
