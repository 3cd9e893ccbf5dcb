//! Incoming message envelope: decoding and shape validation.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::str::FromStr;

use orca_common::types::{ClusterName, ClusterReport, OrgId};

use crate::ConsumerError;

/// Wire envelope produced by the upstream rule engine.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "OrgID")]
    org_id: i64,
    #[serde(rename = "ClusterName")]
    cluster_name: String,
    #[serde(rename = "Report")]
    report: serde_json::Value,
    #[serde(rename = "LastChecked")]
    last_checked: String,
}

/// A fully validated message, ready for the storage write path.
#[derive(Debug, Clone)]
pub struct ValidatedMessage {
    pub org_id: OrgId,
    pub cluster: ClusterName,
    pub report: ClusterReport,
    pub last_checked: DateTime<Utc>,
}

/// Decodes and validates one consumed message. Every rejection carries the
/// reason logged next to the message offset; rejected messages are never
/// redelivered.
pub fn parse_incoming(payload: &[u8], max_report_bytes: usize) -> Result<ValidatedMessage, ConsumerError> {
    let envelope: Envelope = serde_json::from_slice(payload)
        .map_err(|err| ConsumerError::malformed(format!("cannot decode message: {err}")))?;

    if envelope.org_id < 0 {
        return Err(ConsumerError::malformed(format!(
            "OrgID must be non-negative, got {}",
            envelope.org_id
        )));
    }
    let org_id = OrgId(envelope.org_id as u64);

    let cluster = ClusterName::from_str(&envelope.cluster_name)
        .map_err(|err| ConsumerError::malformed(err.to_string()))?;

    if !envelope.report.is_object() {
        return Err(ConsumerError::malformed(
            "Report must be a JSON object".to_string(),
        ));
    }
    let report = envelope.report.to_string();
    if report.len() > max_report_bytes {
        return Err(ConsumerError::malformed(format!(
            "report is {} bytes, limit is {max_report_bytes}",
            report.len()
        )));
    }

    let last_checked = DateTime::parse_from_rfc3339(&envelope.last_checked)
        .map_err(|err| {
            ConsumerError::malformed(format!(
                "LastChecked '{}' is not RFC 3339: {err}",
                envelope.last_checked
            ))
        })?
        .with_timezone(&Utc);

    Ok(ValidatedMessage {
        org_id,
        cluster,
        report: ClusterReport(report),
        last_checked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 1024;

    fn valid() -> String {
        r#"{
            "OrgID": 1,
            "ClusterName": "84f7eedc-0dd8-49cd-9d4d-f6646df3a5bc",
            "Report": {},
            "LastChecked": "2020-01-02T00:00:00Z"
        }"#
        .to_string()
    }

    #[test]
    fn accepts_well_formed_message() {
        let msg = parse_incoming(valid().as_bytes(), LIMIT).unwrap();
        assert_eq!(msg.org_id, OrgId(1));
        assert_eq!(
            msg.cluster.to_string(),
            "84f7eedc-0dd8-49cd-9d4d-f6646df3a5bc"
        );
        assert_eq!(msg.report.0, "{}");
        assert_eq!(msg.last_checked.to_rfc3339(), "2020-01-02T00:00:00+00:00");
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(parse_incoming(b"not json", LIMIT).is_err());
    }

    #[test]
    fn rejects_missing_fields() {
        let err = parse_incoming(br#"{"OrgID": 1}"#, LIMIT).unwrap_err();
        assert!(err.to_string().contains("cannot decode message"));
    }

    #[test]
    fn rejects_negative_org_id() {
        let raw = valid().replace("\"OrgID\": 1", "\"OrgID\": -3");
        assert!(parse_incoming(raw.as_bytes(), LIMIT).is_err());
    }

    #[test]
    fn rejects_malformed_cluster_name() {
        let raw = valid().replace("84f7eedc-0dd8-49cd-9d4d-f6646df3a5bc", "this is not a uuid");
        assert!(parse_incoming(raw.as_bytes(), LIMIT).is_err());
    }

    #[test]
    fn rejects_non_object_report() {
        let raw = valid().replace("\"Report\": {}", "\"Report\": [1, 2]");
        assert!(parse_incoming(raw.as_bytes(), LIMIT).is_err());
    }

    #[test]
    fn rejects_non_rfc3339_timestamp() {
        let raw = valid().replace("2020-01-02T00:00:00Z", "yesterday");
        assert!(parse_incoming(raw.as_bytes(), LIMIT).is_err());
    }

    #[test]
    fn rejects_report_over_the_byte_limit() {
        let raw = valid().replace(
            "\"Report\": {}",
            &format!("\"Report\": {{\"filler\": \"{}\"}}", "x".repeat(LIMIT)),
        );
        let err = parse_incoming(raw.as_bytes(), LIMIT).unwrap_err();
        assert!(err.to_string().contains("limit"));
    }
}
