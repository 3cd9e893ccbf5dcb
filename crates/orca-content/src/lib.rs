//! Local catalog of rule content.
//!
//! The catalog is parsed from an on-disk directory tree (one subdirectory per
//! rule, markdown bodies plus YAML descriptors), cached in memory behind an
//! atomically swapped snapshot, refreshed on a configurable cadence, and
//! joined with stored reports by the decorator at read time.

pub mod cache;
pub mod decorator;
pub mod parser;
pub mod updater;

pub use cache::ContentCache;
pub use decorator::{decorate, ClusterReportPayload, ReportMeta, RuleReport};
pub use parser::{
    parse_rule_content_dir, ErrorKeyMetadata, PluginInfo, RuleContent, RuleContentDirectory,
    RuleErrorKeyContent,
};
pub use updater::ContentUpdater;

/// Errors from parsing or resolving rule content.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Item with ID {rule_id} was not found in the storage")]
    RuleNotFound { rule_id: String },

    #[error("cannot read rule content at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Yaml {
        path: String,
        source: serde_yaml::Error,
    },
}

pub type Result<T> = std::result::Result<T, ContentError>;
