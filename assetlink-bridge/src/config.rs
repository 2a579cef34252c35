//! Bridge configuration
//!
//! Defines the knobs that change how units of work are built and how runs
//! are reported: key namespace, empty-selection handling, normalization
//! policy and failed-job handling.

use std::fmt;
use std::str::FromStr;

use crate::normalize::{DEFAULT_MAX_DEPTH, NormalizePolicy, Normalizer};
use crate::translator::{DEFAULT_NAMESPACE, DefaultTranslator};

/// How a run whose pairing is empty is treated
///
/// An empty pairing usually means the orchestrator's keys and the
/// translator's keys disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptySelectionPolicy {
    /// Return no records
    Allow,
    /// Return no records and log a warning
    #[default]
    Warn,
    /// Fail the run
    Error,
}

impl FromStr for EmptySelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allow" => Ok(EmptySelectionPolicy::Allow),
            "warn" => Ok(EmptySelectionPolicy::Warn),
            "error" => Ok(EmptySelectionPolicy::Error),
            other => Err(format!(
                "unknown empty selection policy '{}' (expected allow, warn or error)",
                other
            )),
        }
    }
}

impl fmt::Display for EmptySelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptySelectionPolicy::Allow => write!(f, "allow"),
            EmptySelectionPolicy::Warn => write!(f, "warn"),
            EmptySelectionPolicy::Error => write!(f, "error"),
        }
    }
}

/// Bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// First key segment used by the default translator
    pub namespace: String,

    /// Handling of runs where no resource matches the selection
    pub empty_selection: EmptySelectionPolicy,

    /// Handling of metadata values the normalizer cannot classify
    pub normalize_policy: NormalizePolicy,

    /// Maximum metadata nesting depth
    pub max_depth: usize,

    /// Fail the run when the report lists failed load jobs
    pub raise_on_failed_jobs: bool,
}

impl BridgeConfig {
    /// Creates a configuration with defaults and the given namespace
    pub fn new(namespace: String) -> Self {
        Self {
            namespace,
            empty_selection: EmptySelectionPolicy::default(),
            normalize_policy: NormalizePolicy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            raise_on_failed_jobs: false,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Recognized environment variables:
    /// - ASSETLINK_NAMESPACE (optional, default: dlt)
    /// - ASSETLINK_EMPTY_SELECTION (optional, allow|warn|error, default: warn)
    /// - ASSETLINK_NORMALIZE_POLICY (optional, permissive|strict, default: permissive)
    /// - ASSETLINK_MAX_DEPTH (optional, default: 64)
    /// - ASSETLINK_RAISE_ON_FAILED_JOBS (optional, true|false, default: false)
    pub fn from_env() -> anyhow::Result<Self> {
        let namespace =
            std::env::var("ASSETLINK_NAMESPACE").unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string());

        let empty_selection = match std::env::var("ASSETLINK_EMPTY_SELECTION") {
            Ok(value) => value.parse().map_err(|e: String| anyhow::anyhow!(e))?,
            Err(_) => EmptySelectionPolicy::default(),
        };

        let normalize_policy = match std::env::var("ASSETLINK_NORMALIZE_POLICY") {
            Ok(value) => value.parse().map_err(|e: String| anyhow::anyhow!(e))?,
            Err(_) => NormalizePolicy::default(),
        };

        let max_depth = match std::env::var("ASSETLINK_MAX_DEPTH") {
            Ok(value) => value.parse::<usize>().map_err(|e| {
                anyhow::anyhow!("ASSETLINK_MAX_DEPTH must be a positive integer: {}", e)
            })?,
            Err(_) => DEFAULT_MAX_DEPTH,
        };

        let raise_on_failed_jobs = match std::env::var("ASSETLINK_RAISE_ON_FAILED_JOBS") {
            Ok(value) => value.parse::<bool>().map_err(|e| {
                anyhow::anyhow!("ASSETLINK_RAISE_ON_FAILED_JOBS must be true or false: {}", e)
            })?,
            Err(_) => false,
        };

        Ok(Self {
            namespace,
            empty_selection,
            normalize_policy,
            max_depth,
            raise_on_failed_jobs,
        })
    }

    pub fn with_empty_selection(mut self, policy: EmptySelectionPolicy) -> Self {
        self.empty_selection = policy;
        self
    }

    pub fn with_normalize_policy(mut self, policy: NormalizePolicy) -> Self {
        self.normalize_policy = policy;
        self
    }

    pub fn with_raise_on_failed_jobs(mut self, raise: bool) -> Self {
        self.raise_on_failed_jobs = raise;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.namespace.is_empty() {
            anyhow::bail!("namespace cannot be empty");
        }

        if self.namespace.contains('/') {
            anyhow::bail!("namespace cannot contain '/'");
        }

        if self.max_depth == 0 {
            anyhow::bail!("max_depth must be greater than 0");
        }

        Ok(())
    }

    /// Normalizer built from this configuration
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.normalize_policy, self.max_depth)
    }

    /// Default translator for this configuration's namespace
    pub fn translator(&self) -> DefaultTranslator {
        DefaultTranslator::new(self.namespace.clone())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.namespace, "dlt");
        assert_eq!(config.empty_selection, EmptySelectionPolicy::Warn);
        assert_eq!(config.normalize_policy, NormalizePolicy::Permissive);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert!(!config.raise_on_failed_jobs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = BridgeConfig::default();

        config.namespace = String::new();
        assert!(config.validate().is_err());

        config.namespace = "raw/dlt".to_string();
        assert!(config.validate().is_err());

        config.namespace = "raw".to_string();
        config.max_depth = 0;
        assert!(config.validate().is_err());

        config.max_depth = 8;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_selection_policy_from_str() {
        assert_eq!(
            "ERROR".parse::<EmptySelectionPolicy>(),
            Ok(EmptySelectionPolicy::Error)
        );
        assert_eq!(
            "allow".parse::<EmptySelectionPolicy>(),
            Ok(EmptySelectionPolicy::Allow)
        );
        assert!("ignore".parse::<EmptySelectionPolicy>().is_err());
    }

    #[test]
    fn test_builders() {
        let config = BridgeConfig::new("raw".to_string())
            .with_empty_selection(EmptySelectionPolicy::Error)
            .with_normalize_policy(NormalizePolicy::Strict)
            .with_raise_on_failed_jobs(true);

        assert_eq!(config.translator().namespace(), "raw");
        assert_eq!(config.normalizer().policy(), NormalizePolicy::Strict);
        assert_eq!(config.empty_selection, EmptySelectionPolicy::Error);
        assert!(config.raise_on_failed_jobs);
    }
}
