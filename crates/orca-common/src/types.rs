//! Semantic identifier types shared by the storage, consumer, and API layers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Tenant identifier owning a set of clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(pub u64);

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrgId {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Bounded to what a BIGINT column can hold.
        match s.parse::<u64>() {
            Ok(v) if v <= i64::MAX as u64 => Ok(OrgId(v)),
            _ => Err(InvalidIdentifier::OrgId(s.to_string())),
        }
    }
}

/// Cluster identifier; a canonical hyphenated UUID. A cluster belongs to
/// exactly one organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterName(pub Uuid);

impl ClusterName {
    /// Canonical hyphenated form, as stored and exposed on the wire.
    pub fn as_hyphenated_string(&self) -> String {
        self.0.hyphenated().to_string()
    }
}

impl fmt::Display for ClusterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ClusterName {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // uuid accepts a few alternate encodings; the wire format is
        // the 36-character hyphenated one only.
        if s.len() != 36 {
            return Err(InvalidIdentifier::ClusterName(s.to_string()));
        }
        Uuid::parse_str(s)
            .map(ClusterName)
            .map_err(|_| InvalidIdentifier::ClusterName(s.to_string()))
    }
}

/// Rule identifier: the dotted module path of the diagnostic that produced
/// a finding, e.g. `ccx_rules_ocp.external.rules.nodes_kubelet_version_check`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub String);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RuleId {
    fn from(s: &str) -> Self {
        RuleId(s.to_string())
    }
}

/// Opaque user identifier extracted from the request identity token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

/// Stored analysis report: an opaque JSON document kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterReport(pub String);

/// Tri-state user sentiment toward a (cluster, rule) pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserVote {
    Dislike,
    None,
    Like,
}

impl UserVote {
    pub fn as_i16(self) -> i16 {
        match self {
            UserVote::Dislike => -1,
            UserVote::None => 0,
            UserVote::Like => 1,
        }
    }

    pub fn from_i16(value: i16) -> Self {
        match value {
            v if v < 0 => UserVote::Dislike,
            0 => UserVote::None,
            _ => UserVote::Like,
        }
    }
}

/// Per-(cluster, rule, user) enable/disable flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleToggle {
    Enable,
    Disable,
}

impl RuleToggle {
    pub fn as_i16(self) -> i16 {
        match self {
            RuleToggle::Enable => 0,
            RuleToggle::Disable => 1,
        }
    }
}

/// Failure to parse a path or wire identifier.
#[derive(Debug, thiserror::Error)]
pub enum InvalidIdentifier {
    #[error("organization id must be a non-negative integer, got '{0}'")]
    OrgId(String),
    #[error("cluster name must be a hyphenated UUID, got '{0}'")]
    ClusterName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_name_accepts_canonical_uuid() {
        let name: ClusterName = "84f7eedc-0dd8-49cd-9d4d-f6646df3a5bc".parse().unwrap();
        assert_eq!(name.to_string(), "84f7eedc-0dd8-49cd-9d4d-f6646df3a5bc");
    }

    #[test]
    fn cluster_name_rejects_unhyphenated_uuid() {
        assert!("84f7eedc0dd849cd9d4df6646df3a5bc"
            .parse::<ClusterName>()
            .is_err());
        assert!("not-a-uuid".parse::<ClusterName>().is_err());
    }

    #[test]
    fn vote_round_trips_through_i16() {
        for vote in [UserVote::Dislike, UserVote::None, UserVote::Like] {
            assert_eq!(UserVote::from_i16(vote.as_i16()), vote);
        }
    }
}
