//! Error types for the connectors

use assetlink_bridge::NormalizeError;
use assetlink_core::domain::asset::KeyError;
use thiserror::Error;

/// Result type alias for connector operations
pub type Result<T> = std::result::Result<T, ConnectorError>;

/// Errors that can occur while talking to a warehouse or a sync service
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// A warehouse statement failed
    #[error("SQL error: {0}")]
    Sql(String),

    /// A reverse-ETL sync failed or could not be polled
    #[error("Sync failed: {0}")]
    Sync(String),

    /// The environment variable holding a sync id is unset or empty
    #[error("Sync id variable '{env_var}' is not set")]
    MissingSyncId {
        /// Name of the environment variable
        env_var: String,
    },

    /// An asset key does not follow the naming the connector expects
    #[error("Unexpected asset key '{key}': {reason}")]
    UnexpectedKey {
        /// User string of the key
        key: String,
        /// What was wrong with it
        reason: String,
    },

    /// A name cannot be used as a SQL identifier
    #[error("Invalid SQL identifier '{0}'")]
    InvalidIdentifier(String),

    /// A bucket or prefix cannot be placed in a storage URL
    #[error("Invalid storage path '{0}'")]
    InvalidStoragePath(String),

    /// A derived key was invalid
    #[error("Invalid asset key: {0}")]
    InvalidKey(#[from] KeyError),

    /// Sync metadata could not be normalized
    #[error("Metadata normalization failed: {0}")]
    Normalization(#[from] NormalizeError),
}

impl ConnectorError {
    /// Create a SQL error
    pub fn sql(message: impl Into<String>) -> Self {
        Self::Sql(message.into())
    }

    /// Create an unexpected key error
    pub fn unexpected_key(key: impl ToString, reason: impl Into<String>) -> Self {
        Self::UnexpectedKey {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sync_id_message() {
        let err = ConnectorError::MissingSyncId {
            env_var: "HIGHTOUCH_ORG_SYNC_ID".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Sync id variable 'HIGHTOUCH_ORG_SYNC_ID' is not set"
        );
    }

    #[test]
    fn test_unexpected_key_message() {
        let err = ConnectorError::unexpected_key("aws/cloud-prod/orders", "missing prefix");
        assert_eq!(
            err.to_string(),
            "Unexpected asset key 'aws/cloud-prod/orders': missing prefix"
        );
    }
}
