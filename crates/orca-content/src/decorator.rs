//! Report decorator: joins a stored report blob with the rule catalog to
//! produce the externally visible report payload.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use orca_common::types::RuleId;

use crate::parser::RuleContentDirectory;

/// One decorated rule hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleReport {
    pub rule_id: RuleId,
    pub description: String,
    pub details: String,
    pub created_at: Option<DateTime<Utc>>,
    pub total_risk: i32,
    pub risk_of_change: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub count: usize,
    pub last_checked_at: DateTime<Utc>,
}

/// Externally visible report for a cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterReportPayload {
    pub meta: ReportMeta,
    pub data: Vec<RuleReport>,
}

/// Rule hits as the upstream engine serializes them inside the stored blob:
/// a top-level `"reports"` array of `{"component", "key"}` objects. The blob
/// is otherwise opaque; any other shape decorates to an empty payload.
#[derive(Debug, Deserialize)]
struct StoredReport {
    #[serde(default)]
    reports: Vec<RuleHit>,
}

#[derive(Debug, Deserialize)]
struct RuleHit {
    component: String,
    key: String,
}

/// Derived severity in [0, 4], monotone in both inputs.
fn total_risk(impact: i32, likelihood: i32) -> i32 {
    ((impact + likelihood) / 2).clamp(0, 4)
}

fn risk_of_change(resolution_risk: i32) -> i32 {
    resolution_risk.clamp(1, 4)
}

/// The catalog publishes dates as `2020-03-06 16:00:00`; older entries used
/// RFC 3339.
fn parse_publish_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Joins a stored report with the catalog. Fired rules without a catalog
/// entry (or with an unknown error key) are omitted from the output and
/// counted.
pub fn decorate(
    catalog: &RuleContentDirectory,
    report: &str,
    last_checked_at: DateTime<Utc>,
) -> ClusterReportPayload {
    let stored: StoredReport = serde_json::from_str(report).unwrap_or_else(|err| {
        tracing::debug!(error = %err, "stored report carries no rule hits");
        StoredReport { reports: vec![] }
    });

    let mut data = Vec::with_capacity(stored.reports.len());
    for hit in &stored.reports {
        let Some(error_key) = catalog
            .get(&hit.component)
            .and_then(|rule| rule.error_keys.get(&hit.key))
        else {
            metrics::counter!("orca_content_missing_rule_total").increment(1);
            tracing::warn!(
                rule = %hit.component,
                error_key = %hit.key,
                "rule fired for cluster is missing from the content catalog, omitting"
            );
            continue;
        };
        data.push(RuleReport {
            rule_id: RuleId(hit.component.clone()),
            description: error_key.metadata.description.clone(),
            details: error_key.generic.clone(),
            created_at: parse_publish_date(&error_key.metadata.publish_date),
            total_risk: total_risk(error_key.metadata.impact, error_key.metadata.likelihood),
            risk_of_change: risk_of_change(error_key.metadata.resolution_risk),
        });
    }

    ClusterReportPayload {
        meta: ReportMeta {
            count: data.len(),
            last_checked_at,
        },
        data,
    }
}
