//! Subset selection
//!
//! When the orchestrator runs only some assets of a unit of work, the
//! pipeline source has to be narrowed to the matching resources while every
//! resource stays paired with the key it reports under.
//!
//! Keys are always derived from the source's own resource collection, in its
//! native order. The requested keys are only used as a membership filter, so
//! the pairing can never be shifted by a differently ordered selection.

use assetlink_core::domain::asset::AssetKey;
use assetlink_core::domain::resource::Resource;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::engine::PipelineSource;
use crate::error::Result;
use crate::translator::AssetTranslator;

/// Which assets the orchestrator asked to run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    /// Keys selected for this run
    pub keys: BTreeSet<AssetKey>,
    /// True when only part of the unit of work was selected
    pub is_subset: bool,
}

impl Selection {
    /// Selection covering the whole unit of work
    pub fn full<I: IntoIterator<Item = AssetKey>>(keys: I) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            is_subset: false,
        }
    }

    /// Selection covering only `keys`
    pub fn subset<I: IntoIterator<Item = AssetKey>>(keys: I) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            is_subset: true,
        }
    }
}

/// Ordered (key, resource) pairs that run in one invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionPairing {
    pairs: Vec<(AssetKey, Resource)>,
}

impl ExecutionPairing {
    pub fn pairs(&self) -> &[(AssetKey, Resource)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &AssetKey> {
        self.pairs.iter().map(|(key, _)| key)
    }

    pub fn resource_names(&self) -> Vec<String> {
        self.pairs.iter().map(|(_, r)| r.name.clone()).collect()
    }
}

impl IntoIterator for ExecutionPairing {
    type Item = (AssetKey, Resource);
    type IntoIter = std::vec::IntoIter<(AssetKey, Resource)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

/// The narrowed source together with its pairing
pub struct ExecutionPlan {
    /// Source to execute; the unnarrowed source for full runs
    pub source: Arc<dyn PipelineSource>,
    pub pairing: ExecutionPairing,
    /// Requested keys that no resource of the source derives
    pub unmatched: Vec<AssetKey>,
}

/// Pairs every resource of `source` with its derived key and narrows the
/// source to the selection when the run is a subset
///
/// An empty pairing is not an error here; callers decide how to treat it.
pub fn plan_execution(
    source: &Arc<dyn PipelineSource>,
    translator: &dyn AssetTranslator,
    selection: &Selection,
) -> Result<ExecutionPlan> {
    let mut pairs = Vec::with_capacity(source.resources().len());
    for resource in source.resources() {
        pairs.push((translator.asset_key(resource)?, resource.clone()));
    }

    let unmatched: Vec<AssetKey> = selection
        .keys
        .iter()
        .filter(|key| !pairs.iter().any(|(derived, _)| derived == *key))
        .cloned()
        .collect();
    if !unmatched.is_empty() {
        let unmatched_keys: Vec<String> = unmatched.iter().map(AssetKey::to_user_string).collect();
        warn!(
            source = source.name(),
            unmatched = ?unmatched_keys,
            "Requested asset keys do not match any resource of the source"
        );
    }

    if !selection.is_subset {
        debug!(
            source = source.name(),
            resources = pairs.len(),
            "Planning full run"
        );
        return Ok(ExecutionPlan {
            source: Arc::clone(source),
            pairing: ExecutionPairing { pairs },
            unmatched,
        });
    }

    pairs.retain(|(key, _)| selection.keys.contains(key));
    let pairing = ExecutionPairing { pairs };
    let narrowed = source.with_resources(&pairing.resource_names())?;

    debug!(
        source = source.name(),
        selected = pairing.len(),
        total = source.resources().len(),
        "Planning subset run"
    );

    Ok(ExecutionPlan {
        source: narrowed,
        pairing,
        unmatched,
    })
}
