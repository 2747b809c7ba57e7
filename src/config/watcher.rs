//! Configuration file watcher for live pipeline tuning.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::patch::ConfigPatch;

/// Monitors the configuration file and forwards the pipeline sections of
/// every successfully reloaded file as a [`ConfigPatch`].
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ConfigPatch>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for pipeline updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ConfigPatch>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for events to flow.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        // Several modify events for one save collapse into one update.
        let mut last_sent: Option<ConfigPatch> = None;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    match load_config(&path) {
                        Ok(config) => {
                            if let Some(patch) = dedupe(&mut last_sent, config.pipeline_patch()) {
                                tracing::info!(path = ?path, "Config file changed, forwarding pipeline tuning");
                                let _ = tx.send(patch);
                            }
                        }
                        Err(e) => tracing::error!(
                            error = %e,
                            "Failed to reload config. Keeping current configuration."
                        ),
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Returns `next` unless it equals the previously forwarded patch.
fn dedupe(last_sent: &mut Option<ConfigPatch>, next: ConfigPatch) -> Option<ConfigPatch> {
    if last_sent.as_ref() == Some(&next) {
        return None;
    }
    *last_sent = Some(next.clone());
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::patch::RetryPatch;

    fn retries(n: u64) -> ConfigPatch {
        ConfigPatch {
            retry: Some(RetryPatch {
                retries: Some(n.into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_repeated_patch_is_forwarded_once() {
        let mut last = None;
        assert!(dedupe(&mut last, retries(2)).is_some());
        assert!(dedupe(&mut last, retries(2)).is_none());
        assert_eq!(dedupe(&mut last, retries(3)), Some(retries(3)));
    }
}
