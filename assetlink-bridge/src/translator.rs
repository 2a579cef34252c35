//! Resource to asset translation
//!
//! A translator derives the orchestrator identity of a resource and the keys
//! of the assets it depends on. Both derivations are pure functions of the
//! resource's (source name, resource name) pair, so they can be recomputed at
//! run time and always agree with what was registered at build time.

use assetlink_core::domain::asset::{AssetKey, AutomationPolicy, KEY_SEPARATOR};
use assetlink_core::domain::resource::Resource;

use crate::error::{BridgeError, Result};

/// Namespace segment used by `DefaultTranslator` unless configured otherwise
pub const DEFAULT_NAMESPACE: &str = "dlt";

/// Derives asset identities for pipeline resources
///
/// The key of a node and the keys of its dependencies are computed
/// independently: a dependency usually names an asset produced outside the
/// bridge, under its own naming convention.
pub trait AssetTranslator: Send + Sync {
    /// Key of the asset materialized by `resource`
    fn asset_key(&self, resource: &Resource) -> Result<AssetKey>;

    /// Keys of the assets `resource` depends on
    fn deps_asset_keys(&self, resource: &Resource) -> Result<Vec<AssetKey>>;

    /// Scheduling hint for the asset, if any
    fn automation_policy(&self, _resource: &Resource) -> Option<AutomationPolicy> {
        None
    }
}

/// Default naming convention
///
/// - key: `[namespace, "<source>_<resource>"]`
/// - deps: `[["<source>_<resource>"]]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultTranslator {
    namespace: String,
}

impl DefaultTranslator {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl Default for DefaultTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl AssetTranslator for DefaultTranslator {
    fn asset_key(&self, resource: &Resource) -> Result<AssetKey> {
        Ok(AssetKey::new([
            self.namespace.clone(),
            format!("{}_{}", resource.source_name, resource.name),
        ])?)
    }

    fn deps_asset_keys(&self, resource: &Resource) -> Result<Vec<AssetKey>> {
        Ok(vec![AssetKey::new([format!(
            "{}_{}",
            resource.source_name, resource.name
        )])?])
    }
}

/// Checks that a resource can be translated into asset keys
///
/// Runs at build time so a malformed name never reaches execution.
pub fn validate_resource(resource: &Resource) -> Result<()> {
    for (field, value) in [
        ("source name", &resource.source_name),
        ("resource name", &resource.name),
    ] {
        if value.is_empty() {
            return Err(BridgeError::configuration(format!(
                "resource {} must not be empty",
                field
            )));
        }
        if value.contains(KEY_SEPARATOR) {
            return Err(BridgeError::configuration(format!(
                "resource {} '{}' contains the '{}' separator",
                field, value, KEY_SEPARATOR
            )));
        }
    }
    Ok(())
}
