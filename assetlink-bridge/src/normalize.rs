//! Metadata normalization
//!
//! Rewrites rich metadata values (timestamps, dates, offsets, UUIDs) into
//! their string renderings so the result can be persisted by a storage layer
//! without native temporal types. Maps and lists keep their shape.

use assetlink_core::domain::metadata::{MetadataValue, NormalizedMetadata};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Nesting depth at which normalization gives up
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Errors raised during normalization
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// An opaque value was found under the strict policy
    #[error("unsupported metadata value of type '{type_name}' at '{path}'")]
    Unsupported { type_name: String, path: String },

    /// The input nests deeper than the configured limit
    #[error("metadata nesting exceeds {max_depth} levels at '{path}'")]
    DepthExceeded { max_depth: usize, path: String },
}

/// What to do with values the normalizer cannot classify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizePolicy {
    /// Keep the value unchanged
    #[default]
    Permissive,
    /// Fail the normalization
    Strict,
}

impl FromStr for NormalizePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "permissive" => Ok(NormalizePolicy::Permissive),
            "strict" => Ok(NormalizePolicy::Strict),
            other => Err(format!(
                "unknown normalize policy '{}' (expected permissive or strict)",
                other
            )),
        }
    }
}

impl fmt::Display for NormalizePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizePolicy::Permissive => write!(f, "permissive"),
            NormalizePolicy::Strict => write!(f, "strict"),
        }
    }
}

/// Recursive metadata normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    policy: NormalizePolicy,
    max_depth: usize,
}

impl Normalizer {
    pub fn new(policy: NormalizePolicy, max_depth: usize) -> Self {
        Self { policy, max_depth }
    }

    pub fn policy(&self) -> NormalizePolicy {
        self.policy
    }

    /// Returns a normalized copy of `value`
    ///
    /// Maps are normalized per value, lists elementwise, rich kinds become
    /// strings, every other value is returned unchanged. The input is never
    /// modified, and normalizing an already normalized value is a no-op.
    pub fn normalize(&self, value: &MetadataValue) -> Result<MetadataValue, NormalizeError> {
        self.visit(value, 0, &mut Vec::new())
    }

    /// Normalizes every value of a top-level mapping
    pub fn normalize_map(
        &self,
        entries: &BTreeMap<String, MetadataValue>,
    ) -> Result<NormalizedMetadata, NormalizeError> {
        let mut path = Vec::new();
        entries
            .iter()
            .map(|(key, value)| {
                path.push(key.clone());
                let normalized = self.visit(value, 1, &mut path);
                path.pop();
                normalized.map(|v| (key.clone(), v))
            })
            .collect()
    }

    fn visit(
        &self,
        value: &MetadataValue,
        depth: usize,
        path: &mut Vec<String>,
    ) -> Result<MetadataValue, NormalizeError> {
        if depth > self.max_depth {
            return Err(NormalizeError::DepthExceeded {
                max_depth: self.max_depth,
                path: render_path(path),
            });
        }

        match value {
            MetadataValue::Map(entries) => {
                let mut normalized = BTreeMap::new();
                for (key, item) in entries {
                    path.push(key.clone());
                    let item = self.visit(item, depth + 1, path);
                    path.pop();
                    normalized.insert(key.clone(), item?);
                }
                Ok(MetadataValue::Map(normalized))
            }
            MetadataValue::List(items) => {
                let mut normalized = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    path.push(index.to_string());
                    let item = self.visit(item, depth + 1, path);
                    path.pop();
                    normalized.push(item?);
                }
                Ok(MetadataValue::List(normalized))
            }
            MetadataValue::Timestamp(_)
            | MetadataValue::Date(_)
            | MetadataValue::Timezone(_)
            | MetadataValue::Uuid(_) => {
                Ok(MetadataValue::Text(value.render_rich().unwrap_or_default()))
            }
            MetadataValue::Opaque { type_name, .. } => match self.policy {
                NormalizePolicy::Permissive => Ok(value.clone()),
                NormalizePolicy::Strict => Err(NormalizeError::Unsupported {
                    type_name: type_name.clone(),
                    path: render_path(path),
                }),
            },
            MetadataValue::Null
            | MetadataValue::Bool(_)
            | MetadataValue::Int(_)
            | MetadataValue::Float(_)
            | MetadataValue::Text(_) => Ok(value.clone()),
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizePolicy::default(), DEFAULT_MAX_DEPTH)
    }
}

fn render_path(path: &[String]) -> String {
    if path.is_empty() {
        "$".to_string()
    } else {
        format!("$.{}", path.join("."))
    }
}
