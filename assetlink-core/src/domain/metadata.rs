//! Metadata values
//!
//! Run reports produced by the pipeline engine contain timestamps, dates,
//! offsets and identifiers that the orchestrator's storage layer cannot
//! persist natively. `MetadataValue` is the closed set of value kinds the
//! bridge understands; normalization (in `assetlink-bridge`) rewrites the rich
//! kinds into strings.

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Metadata mapping whose values contain only storable kinds
pub type NormalizedMetadata = BTreeMap<String, MetadataValue>;

/// A metadata value
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<MetadataValue>),
    Map(BTreeMap<String, MetadataValue>),
    /// Timestamp with a UTC offset
    Timestamp(DateTime<FixedOffset>),
    Date(NaiveDate),
    /// UTC offset without a point in time
    Timezone(FixedOffset),
    Uuid(Uuid),
    /// A value the bridge cannot classify, kept as its type name and rendering
    Opaque { type_name: String, repr: String },
}

impl MetadataValue {
    /// True for the kinds that normalization rewrites into strings
    pub fn is_rich(&self) -> bool {
        matches!(
            self,
            MetadataValue::Timestamp(_)
                | MetadataValue::Date(_)
                | MetadataValue::Timezone(_)
                | MetadataValue::Uuid(_)
        )
    }

    /// True when no rich or opaque value appears anywhere in the tree
    pub fn is_storable(&self) -> bool {
        match self {
            MetadataValue::List(items) => items.iter().all(MetadataValue::is_storable),
            MetadataValue::Map(entries) => entries.values().all(MetadataValue::is_storable),
            MetadataValue::Opaque { .. } => false,
            other => !other.is_rich(),
        }
    }

    /// Canonical string rendering of a rich value, `None` for every other kind
    pub fn render_rich(&self) -> Option<String> {
        match self {
            MetadataValue::Timestamp(ts) => Some(ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
            MetadataValue::Date(date) => Some(date.format("%Y-%m-%d").to_string()),
            MetadataValue::Timezone(offset) => Some(offset.to_string()),
            MetadataValue::Uuid(id) => Some(id.hyphenated().to_string()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[MetadataValue]> {
        match self {
            MetadataValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, MetadataValue>> {
        match self {
            MetadataValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Looks up a key when this value is a map
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.as_map().and_then(|entries| entries.get(key))
    }

    /// Converts to JSON
    ///
    /// Rich kinds are rendered with `render_rich`; opaque values become their
    /// `repr` string. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as JsonValue;

        match self {
            MetadataValue::Null => JsonValue::Null,
            MetadataValue::Bool(b) => JsonValue::Bool(*b),
            MetadataValue::Int(n) => JsonValue::from(*n),
            MetadataValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            MetadataValue::Text(s) => JsonValue::String(s.clone()),
            MetadataValue::List(items) => {
                JsonValue::Array(items.iter().map(MetadataValue::to_json).collect())
            }
            MetadataValue::Map(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            MetadataValue::Opaque { repr, .. } => JsonValue::String(repr.clone()),
            rich => JsonValue::String(rich.render_rich().unwrap_or_default()),
        }
    }
}

impl From<serde_json::Value> for MetadataValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as JsonValue;

        match value {
            JsonValue::Null => MetadataValue::Null,
            JsonValue::Bool(b) => MetadataValue::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => MetadataValue::Int(i),
                None => MetadataValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => MetadataValue::Text(s),
            JsonValue::Array(items) => {
                MetadataValue::List(items.into_iter().map(MetadataValue::from).collect())
            }
            JsonValue::Object(entries) => MetadataValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, MetadataValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

impl From<i64> for MetadataValue {
    fn from(n: i64) -> Self {
        MetadataValue::Int(n)
    }
}

impl From<u64> for MetadataValue {
    fn from(n: u64) -> Self {
        i64::try_from(n)
            .map(MetadataValue::Int)
            .unwrap_or(MetadataValue::Float(n as f64))
    }
}

impl From<f64> for MetadataValue {
    fn from(f: f64) -> Self {
        MetadataValue::Float(f)
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<DateTime<FixedOffset>> for MetadataValue {
    fn from(ts: DateTime<FixedOffset>) -> Self {
        MetadataValue::Timestamp(ts)
    }
}

impl From<NaiveDate> for MetadataValue {
    fn from(date: NaiveDate) -> Self {
        MetadataValue::Date(date)
    }
}

impl From<Uuid> for MetadataValue {
    fn from(id: Uuid) -> Self {
        MetadataValue::Uuid(id)
    }
}

impl<T: Into<MetadataValue>> From<Option<T>> for MetadataValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(MetadataValue::Null)
    }
}

impl<T: Into<MetadataValue>> From<Vec<T>> for MetadataValue {
    fn from(items: Vec<T>) -> Self {
        MetadataValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, MetadataValue>> for MetadataValue {
    fn from(entries: BTreeMap<String, MetadataValue>) -> Self {
        MetadataValue::Map(entries)
    }
}

impl Serialize for MetadataValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MetadataValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(MetadataValue::from)
    }
}
