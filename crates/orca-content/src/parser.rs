//! Parser for the on-disk rule-content directory.
//!
//! Layout, one subdirectory per rule:
//!
//! ```text
//! <root>/<rule_id>/{summary,reason,resolution,more_info}.md
//! <root>/<rule_id>/plugin.yaml
//! <root>/<rule_id>/<error_key>/{generic.md, metadata.yaml}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::{ContentError, Result};

/// Contents of `metadata.yaml` inside an error key directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorKeyMetadata {
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub description: String,
    pub impact: i32,
    pub likelihood: i32,
    #[serde(default)]
    pub publish_date: String,
    #[serde(default)]
    pub status: String,
    /// Risk attached to applying the resolution; feeds `risk_of_change`.
    #[serde(default = "default_resolution_risk")]
    pub resolution_risk: i32,
}

fn default_resolution_risk() -> i32 {
    1
}

/// Content of a single error key: its generic markdown body plus metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleErrorKeyContent {
    pub generic: String,
    pub metadata: ErrorKeyMetadata,
}

/// Contents of `plugin.yaml` inside a rule directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub node_id: String,
    #[serde(default)]
    pub product_code: String,
    #[serde(default)]
    pub python_module: String,
}

/// All content available for one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleContent {
    pub summary: String,
    pub reason: String,
    pub resolution: String,
    pub more_info: String,
    pub plugin: PluginInfo,
    pub error_keys: HashMap<String, RuleErrorKeyContent>,
}

/// Parsed catalog, keyed by rule id (the subdirectory name).
pub type RuleContentDirectory = HashMap<String, RuleContent>;

fn read_file(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    fs::read_to_string(&path).map_err(|source| ContentError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn parse_yaml<T: serde::de::DeserializeOwned>(dir: &Path, name: &str) -> Result<T> {
    let path = dir.join(name);
    let raw = read_file(dir, name)?;
    serde_yaml::from_str(&raw).map_err(|source| ContentError::Yaml {
        path: path.display().to_string(),
        source,
    })
}

/// Parses all error key subdirectories of a rule directory. Checking for
/// directory entries implicitly verifies the rule directory exists.
fn parse_error_contents(rule_dir: &Path) -> Result<HashMap<String, RuleErrorKeyContent>> {
    let entries = fs::read_dir(rule_dir).map_err(|source| ContentError::Io {
        path: rule_dir.display().to_string(),
        source,
    })?;

    let mut error_keys = HashMap::new();
    for entry in entries {
        let entry = entry.map_err(|source| ContentError::Io {
            path: rule_dir.display().to_string(),
            source,
        })?;
        if !entry.path().is_dir() {
            continue;
        }
        let key = entry.file_name().to_string_lossy().to_string();
        let key_dir = entry.path();
        error_keys.insert(
            key,
            RuleErrorKeyContent {
                generic: read_file(&key_dir, "generic.md")?,
                metadata: parse_yaml(&key_dir, "metadata.yaml")?,
            },
        );
    }
    Ok(error_keys)
}

fn parse_rule_content(rule_dir: &Path) -> Result<RuleContent> {
    Ok(RuleContent {
        summary: read_file(rule_dir, "summary.md")?,
        reason: read_file(rule_dir, "reason.md")?,
        resolution: read_file(rule_dir, "resolution.md")?,
        more_info: read_file(rule_dir, "more_info.md")?,
        plugin: parse_yaml(rule_dir, "plugin.yaml")?,
        error_keys: parse_error_contents(rule_dir)?,
    })
}

/// Finds all rule content in a directory and parses it into a catalog.
pub fn parse_rule_content_dir(root: impl AsRef<Path>) -> Result<RuleContentDirectory> {
    let root = root.as_ref();
    let entries = fs::read_dir(root).map_err(|source| ContentError::Io {
        path: root.display().to_string(),
        source,
    })?;

    let mut catalog = RuleContentDirectory::new();
    for entry in entries {
        let entry = entry.map_err(|source| ContentError::Io {
            path: root.display().to_string(),
            source,
        })?;
        if !entry.path().is_dir() {
            continue;
        }
        let rule_id = entry.file_name().to_string_lossy().to_string();
        catalog.insert(rule_id, parse_rule_content(&entry.path())?);
    }
    Ok(catalog)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    pub(crate) const TEST_RULE: &str =
        "ccx_rules_ocp.external.rules.nodes_kubelet_version_check";
    pub(crate) const TEST_ERROR_KEY: &str = "NODE_KUBELET_VERSION";

    /// Builds a one-rule content tree in a scratch directory.
    pub(crate) fn write_rule_dir() -> TempDir {
        let root = TempDir::new().unwrap();
        let rule_dir = root.path().join(TEST_RULE);
        let key_dir = rule_dir.join(TEST_ERROR_KEY);
        fs::create_dir_all(&key_dir).unwrap();

        fs::write(rule_dir.join("summary.md"), "kubelet version skew\n").unwrap();
        fs::write(rule_dir.join("reason.md"), "node {{ node }} lags\n").unwrap();
        fs::write(rule_dir.join("resolution.md"), "upgrade the node\n").unwrap();
        fs::write(rule_dir.join("more_info.md"), "see the upgrade guide\n").unwrap();
        fs::write(
            rule_dir.join("plugin.yaml"),
            concat!(
                "name: nodes_kubelet_version_check\n",
                "node_id: \"1234\"\n",
                "product_code: ocp\n",
                "python_module: ccx_rules_ocp.external.rules.nodes_kubelet_version_check\n",
            ),
        )
        .unwrap();
        fs::write(key_dir.join("generic.md"), "kubelet is older than the api server\n").unwrap();
        fs::write(
            key_dir.join("metadata.yaml"),
            concat!(
                "condition: kubelet minor version behind\n",
                "description: Node kubelet version mismatch\n",
                "impact: 2\n",
                "likelihood: 4\n",
                "publish_date: 2020-03-06 16:00:00\n",
                "status: active\n",
            ),
        )
        .unwrap();
        root
    }

    #[test]
    fn parses_rule_directory() {
        let root = write_rule_dir();
        let catalog = parse_rule_content_dir(root.path()).unwrap();
        assert_eq!(catalog.len(), 1);

        let rule = &catalog[TEST_RULE];
        assert_eq!(rule.summary, "kubelet version skew\n");
        assert_eq!(rule.plugin.product_code, "ocp");

        let key = &rule.error_keys[TEST_ERROR_KEY];
        assert_eq!(key.metadata.impact, 2);
        assert_eq!(key.metadata.likelihood, 4);
        // Absent resolution_risk falls back to the default.
        assert_eq!(key.metadata.resolution_risk, 1);
    }

    #[test]
    fn serialize_reparse_round_trip_is_equal() {
        let root = write_rule_dir();
        let catalog = parse_rule_content_dir(root.path()).unwrap();
        let json = serde_json::to_string(&catalog).unwrap();
        let reparsed: RuleContentDirectory = serde_json::from_str(&json).unwrap();
        assert_eq!(catalog, reparsed);
    }

    #[test]
    fn missing_markdown_file_is_an_error() {
        let root = write_rule_dir();
        fs::remove_file(root.path().join(TEST_RULE).join("reason.md")).unwrap();
        assert!(matches!(
            parse_rule_content_dir(root.path()),
            Err(ContentError::Io { .. })
        ));
    }

    #[test]
    fn malformed_metadata_is_an_error() {
        let root = write_rule_dir();
        fs::write(
            root.path()
                .join(TEST_RULE)
                .join(TEST_ERROR_KEY)
                .join("metadata.yaml"),
            "impact: not-a-number\n",
        )
        .unwrap();
        assert!(matches!(
            parse_rule_content_dir(root.path()),
            Err(ContentError::Yaml { .. })
        ));
    }

    #[test]
    fn stray_files_at_the_root_are_ignored() {
        let root = write_rule_dir();
        fs::write(root.path().join("README.md"), "not a rule\n").unwrap();
        let catalog = parse_rule_content_dir(root.path()).unwrap();
        assert_eq!(catalog.len(), 1);
    }
}
