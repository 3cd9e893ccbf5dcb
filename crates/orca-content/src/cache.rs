use std::sync::{Arc, RwLock};

use orca_common::types::RuleId;

use crate::parser::{RuleContent, RuleContentDirectory};
use crate::{ContentError, Result};

/// In-memory rule catalog behind an atomically swapped snapshot.
///
/// A single writer (the refresh loop) publishes complete catalogs; readers
/// take an `Arc` snapshot that stays valid however many publishes happen
/// afterwards. The lock is only held for the pointer swap or clone.
pub struct ContentCache {
    catalog: RwLock<Arc<RuleContentDirectory>>,
}

impl ContentCache {
    pub fn new(catalog: RuleContentDirectory) -> Self {
        Self {
            catalog: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Empty catalog; used when the initial parse fails and the service
    /// starts degraded until the first successful refresh.
    pub fn empty() -> Self {
        Self::new(RuleContentDirectory::new())
    }

    /// Current catalog snapshot.
    pub fn snapshot(&self) -> Arc<RuleContentDirectory> {
        self.catalog
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Atomically replaces the catalog with a fully formed new one.
    pub fn publish(&self, catalog: RuleContentDirectory) {
        let mut guard = self
            .catalog
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(catalog);
    }

    /// Resolves a rule against the current snapshot.
    pub fn get_rule(&self, rule_id: &RuleId) -> Result<RuleContent> {
        self.snapshot()
            .get(&rule_id.0)
            .cloned()
            .ok_or_else(|| ContentError::RuleNotFound {
                rule_id: rule_id.0.clone(),
            })
    }
}
