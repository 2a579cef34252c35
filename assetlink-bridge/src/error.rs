//! Error types for the bridge

use assetlink_core::domain::asset::{AssetKey, KeyError};
use thiserror::Error;

use crate::engine::PipelineError;
use crate::normalize::NormalizeError;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors that can occur while building or running a unit of work
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Build-time references or derivations are wrong; never retried
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested keys matched no resource and empty selections are errors
    #[error("No resource matched the requested asset keys: {}", format_keys(.requested))]
    EmptyPairing {
        /// Keys requested by the orchestrator
        requested: Vec<AssetKey>,
    },

    /// The pipeline execution step failed
    #[error("Pipeline execution failed: {0}")]
    Pipeline(#[from] PipelineError),

    /// Run metadata could not be normalized
    #[error("Metadata normalization failed: {0}")]
    Normalization(#[from] NormalizeError),

    /// A translator produced an invalid asset key
    #[error("Invalid asset key: {0}")]
    InvalidKey(#[from] KeyError),
}

impl BridgeError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Check if this error comes from the pipeline execution step
    pub fn is_pipeline_failure(&self) -> bool {
        matches!(self, Self::Pipeline(_))
    }
}

fn format_keys(keys: &[AssetKey]) -> String {
    keys.iter()
        .map(AssetKey::to_user_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pairing_message_lists_keys() {
        let err = BridgeError::EmptyPairing {
            requested: vec![AssetKey::new(["ns", "gamma"]).unwrap()],
        };
        assert_eq!(
            err.to_string(),
            "No resource matched the requested asset keys: ns/gamma"
        );
    }

    #[test]
    fn test_pipeline_failure_passes_through() {
        let err = BridgeError::from(PipelineError::Execution("destination offline".to_string()));
        assert!(err.is_pipeline_failure());
        assert!(matches!(
            err,
            BridgeError::Pipeline(PipelineError::Execution(ref msg)) if msg == "destination offline"
        ));
    }
}
