//! Asset domain types
//!
//! An asset is the orchestrator-side view of one pipeline resource. Its key is
//! a hierarchical path; its spec declares the key, upstream dependencies and
//! display metadata.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use super::metadata::MetadataValue;

/// Separator used in the user-facing string form of an asset key
pub const KEY_SEPARATOR: char = '/';

/// Errors raised when constructing an asset key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The key has no path segments
    #[error("asset key must have at least one path segment")]
    EmptyPath,

    /// A path segment is the empty string
    #[error("asset key segment {index} is empty")]
    EmptySegment { index: usize },

    /// A path segment contains the key separator
    #[error("asset key segment '{segment}' contains the '/' separator")]
    SeparatorInSegment { segment: String },
}

/// Hierarchical identifier of an asset, as seen by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct AssetKey {
    path: Vec<String>,
}

impl AssetKey {
    /// Creates a key from its path segments
    ///
    /// # Errors
    /// Returns `KeyError` if the path is empty, a segment is empty, or a
    /// segment contains `/`.
    pub fn new<I, S>(path: I) -> Result<Self, KeyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path: Vec<String> = path.into_iter().map(Into::into).collect();
        if path.is_empty() {
            return Err(KeyError::EmptyPath);
        }
        for (index, segment) in path.iter().enumerate() {
            if segment.is_empty() {
                return Err(KeyError::EmptySegment { index });
            }
            if segment.contains(KEY_SEPARATOR) {
                return Err(KeyError::SeparatorInSegment {
                    segment: segment.clone(),
                });
            }
        }
        Ok(Self { path })
    }

    /// Parses the `a/b/c` user-string form
    pub fn parse(user_string: &str) -> Result<Self, KeyError> {
        Self::new(user_string.split(KEY_SEPARATOR))
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        // `new` guarantees at least one segment
        self.path.last().map(String::as_str).unwrap_or_default()
    }

    pub fn to_user_string(&self) -> String {
        self.path.join("/")
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_user_string())
    }
}

impl TryFrom<Vec<String>> for AssetKey {
    type Error = KeyError;

    fn try_from(path: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl From<AssetKey> for Vec<String> {
    fn from(key: AssetKey) -> Self {
        key.path
    }
}

/// Scheduling hint attached to an asset spec
///
/// The orchestrator owns the evaluation of these policies; the bridge only
/// forwards whichever hint the translator chose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationPolicy {
    /// Materialize whenever upstream assets change
    Eager,
    /// Materialize only when a downstream asset requires it
    Lazy,
    /// Materialize on a cron schedule
    OnCron(String),
}

/// Orchestrator-visible declaration of one schedulable asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetSpec {
    pub key: AssetKey,
    pub deps: Vec<AssetKey>,
    pub automation_policy: Option<AutomationPolicy>,
    pub group_name: Option<String>,
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl AssetSpec {
    /// Creates a spec with no dependencies, policy, group or metadata
    pub fn new(key: AssetKey) -> Self {
        Self {
            key,
            deps: Vec::new(),
            automation_policy: None,
            group_name: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_deps(mut self, deps: Vec<AssetKey>) -> Self {
        self.deps = deps;
        self
    }

    pub fn with_automation_policy(mut self, policy: Option<AutomationPolicy>) -> Self {
        self.automation_policy = policy;
        self
    }

    pub fn with_group_name(mut self, group_name: Option<String>) -> Self {
        self.group_name = group_name;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_key() {
        let key = AssetKey::new(["dlt", "github_issues"]).unwrap();
        assert_eq!(key.path(), &["dlt".to_string(), "github_issues".to_string()]);
        assert_eq!(key.name(), "github_issues");
        assert_eq!(key.to_string(), "dlt/github_issues");
    }

    #[test]
    fn test_key_validation() {
        assert_eq!(AssetKey::new(Vec::<String>::new()), Err(KeyError::EmptyPath));
        assert_eq!(
            AssetKey::new(["dlt", ""]),
            Err(KeyError::EmptySegment { index: 1 })
        );
        assert!(matches!(
            AssetKey::new(["dlt", "a/b"]),
            Err(KeyError::SeparatorInSegment { .. })
        ));
    }

    #[test]
    fn test_parse_user_string() {
        let key = AssetKey::parse("aws/cloud-prod/workspace_staging_runs").unwrap();
        assert_eq!(key.path().len(), 3);
        assert_eq!(key.name(), "workspace_staging_runs");
        assert!(AssetKey::parse("aws//x").is_err());
    }

    #[test]
    fn test_key_serializes_as_path_array() {
        let key = AssetKey::new(["ns", "alpha"]).unwrap();
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json, serde_json::json!(["ns", "alpha"]));

        let parsed: AssetKey = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, key);

        let invalid: Result<AssetKey, _> = serde_json::from_value(serde_json::json!([]));
        assert!(invalid.is_err());
    }

    #[test]
    fn test_spec_builder() {
        let key = AssetKey::new(["dlt", "github_issues"]).unwrap();
        let dep = AssetKey::new(["github_issues"]).unwrap();
        let spec = AssetSpec::new(key.clone())
            .with_deps(vec![dep.clone()])
            .with_group_name(Some("github".to_string()))
            .with_metadata("owner", "data-eng");

        assert_eq!(spec.key, key);
        assert_eq!(spec.deps, vec![dep]);
        assert_eq!(spec.group_name.as_deref(), Some("github"));
        assert_eq!(
            spec.metadata.get("owner"),
            Some(&MetadataValue::Text("data-eng".to_string()))
        );
        assert!(spec.automation_policy.is_none());
    }
}
