//! Configuration module
//!
//! Collects the bridge settings given on the command line or through the
//! environment.

use anyhow::{Context, Result};
use assetlink_bridge::{BridgeConfig, DefaultTranslator, NormalizePolicy, Normalizer};

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Settings shared with the bridge library
    pub bridge: BridgeConfig,
}

impl Config {
    /// Builds and validates the configuration
    pub fn new(namespace: String, normalize_policy: NormalizePolicy, max_depth: usize) -> Result<Self> {
        let mut bridge = BridgeConfig::new(namespace).with_normalize_policy(normalize_policy);
        bridge.max_depth = max_depth;
        bridge.validate().context("Invalid configuration")?;
        Ok(Self { bridge })
    }

    pub fn translator(&self) -> DefaultTranslator {
        self.bridge.translator()
    }

    /// Normalizer for this run, forced to strict when `strict` is set
    pub fn normalizer(&self, strict: bool) -> Normalizer {
        if strict {
            Normalizer::new(NormalizePolicy::Strict, self.bridge.max_depth)
        } else {
            self.bridge.normalizer()
        }
    }
}
