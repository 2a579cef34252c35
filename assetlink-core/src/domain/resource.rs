//! Pipeline resource descriptors

use serde::{Deserialize, Serialize};

/// One extract/load unit inside a pipeline source
///
/// Owned by the pipeline engine. The bridge only reads the identity fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resource {
    /// Name of the resource, unique within its source
    pub name: String,
    /// Name of the source that owns this resource
    pub source_name: String,
    /// Destination table the resource loads into
    pub table_name: String,
}

impl Resource {
    /// Creates a resource whose table name equals its resource name
    pub fn new(source_name: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table_name: name.clone(),
            name,
            source_name: source_name.into(),
        }
    }

    /// Overrides the destination table name
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }
}
