//! Warehouse interfaces
//!
//! The provisioning code only needs to open a session, run statements and
//! read result rows. Drivers live outside this crate.

use assetlink_core::domain::metadata::MetadataValue;
use async_trait::async_trait;

use crate::error::Result;

/// One result row, column values in select order
pub type Row = Vec<MetadataValue>;

/// Source of warehouse sessions
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Opens a new session
    async fn connect(&self) -> Result<Box<dyn Connection>>;
}

/// An open warehouse session
#[async_trait]
pub trait Connection: Send {
    /// Runs a statement and discards its result
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Runs a query and returns every row
    async fn fetch_all(&mut self, sql: &str) -> Result<Vec<Row>>;

    /// Ends the session
    async fn close(&mut self) -> Result<()>;
}

/// Returns true if `name` can be used unquoted as a SQL identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Returns true if `path` can be placed inside a quoted storage URL
///
/// Allows letters, digits and `-_./`, with no empty or `..` segments.
pub fn is_storage_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
        && path.split('/').all(|segment| !segment.is_empty() && segment != "..")
}
