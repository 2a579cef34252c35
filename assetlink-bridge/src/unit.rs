//! Unit-of-work construction
//!
//! A unit of work is the orchestrator-visible group of all asset specs
//! derived from one pipeline source. It is built once at definition time and
//! carries, for every spec, a binding to the source and pipeline that
//! materialize it. At run time the binding is read back and control is handed
//! to a `MaterializationService`.

use assetlink_core::domain::asset::{AssetKey, AssetSpec};
use assetlink_core::dto::materialization::CompletionRecord;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::context::ExecutionContext;
use crate::engine::{Pipeline, PipelineSource, RunParams};
use crate::error::{BridgeError, Result};
use crate::service::MaterializationService;
use crate::translator::{AssetTranslator, DefaultTranslator, validate_resource};

/// Spec metadata key naming the bound pipeline source
pub const META_KEY_SOURCE: &str = "assetlink/source";

/// Spec metadata key naming the bound pipeline
pub const META_KEY_PIPELINE: &str = "assetlink/pipeline";

/// References to the objects that materialize a spec
#[derive(Clone, Default)]
pub struct PipelineBinding {
    pub source: Option<Arc<dyn PipelineSource>>,
    pub pipeline: Option<Arc<dyn Pipeline>>,
}

impl fmt::Debug for PipelineBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBinding")
            .field("source", &self.source.as_ref().map(|s| s.name().to_string()))
            .field(
                "pipeline",
                &self.pipeline.as_ref().map(|p| p.name().to_string()),
            )
            .finish()
    }
}

/// A subsettable group of asset specs backed by one pipeline source
pub struct UnitOfWork {
    name: String,
    group_name: Option<String>,
    specs: Vec<AssetSpec>,
    bindings: BTreeMap<AssetKey, PipelineBinding>,
    translator: Arc<dyn AssetTranslator>,
}

impl UnitOfWork {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group_name(&self) -> Option<&str> {
        self.group_name.as_deref()
    }

    /// Specs in the source's native resource order
    pub fn specs(&self) -> &[AssetSpec] {
        &self.specs
    }

    pub fn spec(&self, key: &AssetKey) -> Option<&AssetSpec> {
        self.specs.iter().find(|spec| &spec.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &AssetKey> {
        self.specs.iter().map(|spec| &spec.key)
    }

    pub fn translator(&self) -> &dyn AssetTranslator {
        self.translator.as_ref()
    }

    /// Units built from a pipeline source always support subset runs
    pub fn can_subset(&self) -> bool {
        true
    }

    /// Binding attached to `key` at build time
    pub fn binding(&self, key: &AssetKey) -> Option<&PipelineBinding> {
        self.bindings.get(key)
    }

    /// Recovers the source and pipeline this unit runs against
    ///
    /// Every spec of a unit carries the same binding, so the first spec's is
    /// authoritative.
    ///
    /// # Errors
    /// Returns `BridgeError::Configuration` if the unit has no specs or the
    /// binding is missing the source or the pipeline.
    pub fn resolve_binding(&self) -> Result<(Arc<dyn PipelineSource>, Arc<dyn Pipeline>)> {
        let first = self.specs.first().ok_or_else(|| {
            BridgeError::configuration(format!("unit of work '{}' has no specs", self.name))
        })?;

        let binding = self.bindings.get(&first.key).ok_or_else(|| {
            BridgeError::configuration(format!(
                "asset '{}' has no pipeline binding",
                first.key
            ))
        })?;

        let source = binding.source.clone().ok_or_else(|| {
            BridgeError::configuration(format!(
                "asset '{}' is not bound to a pipeline source",
                first.key
            ))
        })?;

        let pipeline = binding.pipeline.clone().ok_or_else(|| {
            BridgeError::configuration(format!(
                "asset '{}' is not bound to a pipeline",
                first.key
            ))
        })?;

        Ok((source, pipeline))
    }

    /// Runs the unit through `service`
    pub async fn materialize(
        &self,
        service: &dyn MaterializationService,
        ctx: &ExecutionContext,
        params: &RunParams,
    ) -> Result<Vec<CompletionRecord>> {
        service.materialize(self, ctx, params).await
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("name", &self.name)
            .field("group_name", &self.group_name)
            .field("specs", &self.specs)
            .field("bindings", &self.bindings)
            .finish()
    }
}

/// Builds a `UnitOfWork` from a pipeline source
pub struct UnitOfWorkBuilder {
    source: Arc<dyn PipelineSource>,
    pipeline: Option<Arc<dyn Pipeline>>,
    name: Option<String>,
    group_name: Option<String>,
    translator: Arc<dyn AssetTranslator>,
}

impl UnitOfWorkBuilder {
    pub fn new(source: Arc<dyn PipelineSource>, pipeline: Arc<dyn Pipeline>) -> Self {
        Self {
            source,
            pipeline: Some(pipeline),
            name: None,
            group_name: None,
            translator: Arc::new(DefaultTranslator::default()),
        }
    }

    /// Builder whose translator uses the key namespace of `config`
    pub fn with_config(
        source: Arc<dyn PipelineSource>,
        pipeline: Arc<dyn Pipeline>,
        config: &BridgeConfig,
    ) -> Self {
        Self::new(source, pipeline).translator(Arc::new(config.translator()))
    }

    /// Builder for a source with no pipeline attached
    ///
    /// The resulting unit can describe its specs but fails to materialize.
    pub fn unbound(source: Arc<dyn PipelineSource>) -> Self {
        Self {
            source,
            pipeline: None,
            name: None,
            group_name: None,
            translator: Arc::new(DefaultTranslator::default()),
        }
    }

    /// Name of the unit; defaults to the source name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn group_name(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self
    }

    pub fn translator(mut self, translator: Arc<dyn AssetTranslator>) -> Self {
        self.translator = translator;
        self
    }

    /// Derives one spec per resource and checks the unit is well formed
    ///
    /// # Errors
    /// Returns `BridgeError::Configuration` if the source has no resources,
    /// a resource name is malformed, or two resources derive the same key.
    pub fn build(self) -> Result<UnitOfWork> {
        let name = self
            .name
            .unwrap_or_else(|| self.source.name().to_string());

        if self.source.resources().is_empty() {
            return Err(BridgeError::configuration(format!(
                "source '{}' has no resources",
                self.source.name()
            )));
        }

        let binding = PipelineBinding {
            source: Some(Arc::clone(&self.source)),
            pipeline: self.pipeline.clone(),
        };

        let mut specs = Vec::with_capacity(self.source.resources().len());
        let mut bindings = BTreeMap::new();
        let mut owners: BTreeMap<AssetKey, String> = BTreeMap::new();

        for resource in self.source.resources() {
            validate_resource(resource)?;

            let key = self.translator.asset_key(resource)?;
            if let Some(previous) = owners.insert(key.clone(), resource.name.clone()) {
                return Err(BridgeError::configuration(format!(
                    "resources '{}' and '{}' both derive asset key '{}'",
                    previous, resource.name, key
                )));
            }

            let mut spec = AssetSpec::new(key.clone())
                .with_deps(self.translator.deps_asset_keys(resource)?)
                .with_automation_policy(self.translator.automation_policy(resource))
                .with_group_name(self.group_name.clone())
                .with_metadata(META_KEY_SOURCE, self.source.name());
            if let Some(pipeline) = &self.pipeline {
                spec = spec.with_metadata(META_KEY_PIPELINE, pipeline.name());
            }

            debug!(asset = %key, resource = %resource.name, "Derived asset spec");
            bindings.insert(key, binding.clone());
            specs.push(spec);
        }

        info!(
            unit = %name,
            source = self.source.name(),
            assets = specs.len(),
            "Built unit of work"
        );

        Ok(UnitOfWork {
            name,
            group_name: self.group_name,
            specs,
            bindings,
            translator: self.translator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{PipelineError, StaticSource};
    use assetlink_core::domain::asset::AutomationPolicy;
    use assetlink_core::domain::report::RunReport;
    use assetlink_core::domain::resource::Resource;
    use async_trait::async_trait;

    struct NoopPipeline;

    #[async_trait]
    impl Pipeline for NoopPipeline {
        fn name(&self) -> &str {
            "shop_pipeline"
        }

        async fn run(
            &self,
            _source: Arc<dyn PipelineSource>,
            _params: &RunParams,
        ) -> std::result::Result<RunReport, PipelineError> {
            Err(PipelineError::Execution("not used".to_string()))
        }
    }

    /// Maps every resource to the same key
    struct Collapsing;

    impl AssetTranslator for Collapsing {
        fn asset_key(&self, _resource: &Resource) -> Result<AssetKey> {
            Ok(AssetKey::new(["ns", "same"])?)
        }

        fn deps_asset_keys(&self, _resource: &Resource) -> Result<Vec<AssetKey>> {
            Ok(vec![])
        }
    }

    /// Default keys with a lazy policy hint
    struct Lazy;

    impl AssetTranslator for Lazy {
        fn asset_key(&self, resource: &Resource) -> Result<AssetKey> {
            DefaultTranslator::default().asset_key(resource)
        }

        fn deps_asset_keys(&self, resource: &Resource) -> Result<Vec<AssetKey>> {
            DefaultTranslator::default().deps_asset_keys(resource)
        }

        fn automation_policy(&self, _resource: &Resource) -> Option<AutomationPolicy> {
            Some(AutomationPolicy::Lazy)
        }
    }

    fn shop() -> Arc<dyn PipelineSource> {
        Arc::new(StaticSource::new("shop", ["orders", "customers"]))
    }

    #[test]
    fn test_build_derives_specs_in_source_order() {
        let unit = UnitOfWorkBuilder::new(shop(), Arc::new(NoopPipeline))
            .group_name("ingest")
            .build()
            .unwrap();

        assert_eq!(unit.name(), "shop");
        assert!(unit.can_subset());
        let keys: Vec<String> = unit.keys().map(AssetKey::to_user_string).collect();
        assert_eq!(keys, vec!["dlt/shop_orders", "dlt/shop_customers"]);

        let orders = &unit.specs()[0];
        assert_eq!(orders.deps, vec![AssetKey::new(["shop_orders"]).unwrap()]);
        assert_eq!(orders.group_name.as_deref(), Some("ingest"));
        assert_eq!(orders.metadata[META_KEY_SOURCE].as_str(), Some("shop"));
        assert_eq!(
            orders.metadata[META_KEY_PIPELINE].as_str(),
            Some("shop_pipeline")
        );
    }

    #[test]
    fn test_every_spec_carries_binding() {
        let unit = UnitOfWorkBuilder::new(shop(), Arc::new(NoopPipeline))
            .build()
            .unwrap();

        for key in unit.keys() {
            let binding = unit.binding(key).unwrap();
            assert_eq!(binding.source.as_ref().unwrap().name(), "shop");
            assert_eq!(binding.pipeline.as_ref().unwrap().name(), "shop_pipeline");
        }

        let (source, pipeline) = unit.resolve_binding().unwrap();
        assert_eq!(source.name(), "shop");
        assert_eq!(pipeline.name(), "shop_pipeline");
    }

    #[test]
    fn test_custom_name_and_policy_hint() {
        let unit = UnitOfWorkBuilder::new(shop(), Arc::new(NoopPipeline))
            .name("shop_assets")
            .translator(Arc::new(Lazy))
            .build()
            .unwrap();

        assert_eq!(unit.name(), "shop_assets");
        assert!(
            unit.specs()
                .iter()
                .all(|spec| spec.automation_policy == Some(AutomationPolicy::Lazy))
        );
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        let err = UnitOfWorkBuilder::new(shop(), Arc::new(NoopPipeline))
            .translator(Arc::new(Collapsing))
            .build()
            .unwrap_err();

        assert!(matches!(err, BridgeError::Configuration(_)));
        assert!(err.to_string().contains("'orders' and 'customers'"));
    }

    #[test]
    fn test_malformed_resource_name_is_rejected() {
        let source: Arc<dyn PipelineSource> =
            Arc::new(StaticSource::new("shop", ["orders/2024"]));
        let err = UnitOfWorkBuilder::new(source, Arc::new(NoopPipeline))
            .build()
            .unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(_)));
    }

    #[test]
    fn test_empty_source_is_rejected() {
        let source: Arc<dyn PipelineSource> =
            Arc::new(StaticSource::new("shop", Vec::<String>::new()));
        let err = UnitOfWorkBuilder::new(source, Arc::new(NoopPipeline))
            .build()
            .unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(_)));
    }

    #[test]
    fn test_configured_namespace_reaches_keys() {
        let config = BridgeConfig::new("raw".to_string());
        let unit = UnitOfWorkBuilder::with_config(shop(), Arc::new(NoopPipeline), &config)
            .build()
            .unwrap();

        let keys: Vec<String> = unit.keys().map(AssetKey::to_user_string).collect();
        assert_eq!(keys, vec!["raw/shop_orders", "raw/shop_customers"]);
        assert_eq!(
            unit.translator()
                .asset_key(&Resource::new("shop", "orders"))
                .unwrap(),
            AssetKey::new(["raw", "shop_orders"]).unwrap()
        );
    }

    #[test]
    fn test_unbound_unit_describes_but_cannot_resolve() {
        let unit = UnitOfWorkBuilder::unbound(shop()).build().unwrap();

        assert_eq!(unit.specs().len(), 2);
        assert!(!unit.specs()[0].metadata.contains_key(META_KEY_PIPELINE));
        let err = match unit.resolve_binding() {
            Err(e) => e,
            Ok(_) => panic!("unbound unit resolved a pipeline"),
        };
        assert!(matches!(err, BridgeError::Configuration(_)));
        assert!(err.to_string().contains("not bound to a pipeline"));
    }
}
