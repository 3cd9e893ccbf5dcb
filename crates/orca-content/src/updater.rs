use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::cache::ContentCache;
use crate::parser::parse_rule_content_dir;

/// Periodic refresh of the rule-content catalog.
///
/// Each tick re-parses the content directory off the async runtime and
/// publishes the result atomically. A failed parse leaves the previous
/// catalog in place.
pub struct ContentUpdater {
    cache: Arc<ContentCache>,
    path: PathBuf,
    refresh_interval: Duration,
}

impl ContentUpdater {
    pub fn new(cache: Arc<ContentCache>, path: PathBuf, refresh_interval: Duration) -> Self {
        Self {
            cache,
            path,
            refresh_interval,
        }
    }

    pub async fn run(self) {
        tracing::info!(
            path = %self.path.display(),
            interval_secs = self.refresh_interval.as_secs(),
            "rule content updater started"
        );
        let mut tick = interval(self.refresh_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately; the catalog
        // was already loaded at startup, so skip it.
        tick.tick().await;
        loop {
            tick.tick().await;
            self.refresh().await;
        }
    }

    async fn refresh(&self) {
        let path = self.path.clone();
        let parsed = tokio::task::spawn_blocking(move || parse_rule_content_dir(&path)).await;
        match parsed {
            Ok(Ok(catalog)) => {
                tracing::info!(rules = catalog.len(), "rule content refreshed");
                self.cache.publish(catalog);
            }
            Ok(Err(err)) => {
                metrics::counter!("orca_content_refresh_failures_total").increment(1);
                tracing::error!(error = %err, "rule content refresh failed, keeping previous catalog");
            }
            Err(err) => {
                metrics::counter!("orca_content_refresh_failures_total").increment(1);
                tracing::error!(error = %err, "rule content refresh task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tests::{write_rule_dir, TEST_RULE};

    #[tokio::test]
    async fn failed_refresh_keeps_previous_catalog() {
        let root = write_rule_dir();
        let cache = Arc::new(ContentCache::new(
            parse_rule_content_dir(root.path()).unwrap(),
        ));
        let updater = ContentUpdater::new(
            cache.clone(),
            root.path().join("does-not-exist"),
            Duration::from_secs(3600),
        );

        updater.refresh().await;

        assert!(cache.snapshot().contains_key(TEST_RULE));
    }

    #[tokio::test]
    async fn successful_refresh_publishes_new_catalog() {
        let root = write_rule_dir();
        let cache = Arc::new(ContentCache::empty());
        let updater = ContentUpdater::new(
            cache.clone(),
            root.path().to_path_buf(),
            Duration::from_secs(3600),
        );

        updater.refresh().await;

        assert!(cache.snapshot().contains_key(TEST_RULE));
    }
}
