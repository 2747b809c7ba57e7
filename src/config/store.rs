//! Live pipeline configuration.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::patch::ConfigPatch;
use crate::config::schema::PipelineConfig;

/// Process-wide holder of the current [`PipelineConfig`].
///
/// Readers take a cheap snapshot per request; [`configure`](Self::configure)
/// publishes a merged copy with a single atomic swap, so a request never sees
/// a half-applied update.
#[derive(Debug)]
pub struct ConfigStore {
    current: ArcSwap<PipelineConfig>,
}

impl ConfigStore {
    pub fn new(initial: PipelineConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// The configuration in effect right now.
    pub fn snapshot(&self) -> Arc<PipelineConfig> {
        self.current.load_full()
    }

    /// Merge `patch` over the current configuration.
    pub fn configure(&self, patch: &ConfigPatch) -> Arc<PipelineConfig> {
        if patch.is_empty() {
            return self.snapshot();
        }
        let previous = self.current.rcu(|current| patch.apply_to(current));
        let applied = self.snapshot();
        if applied.as_ref() != previous.as_ref() {
            tracing::debug!(?applied, "Pipeline configuration updated");
        }
        applied
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
