use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DbBackend, EntityTrait, Statement, Value};
use std::str::FromStr;

use orca_common::types::{ClusterName, RuleId, UserId, UserVote};

use crate::entities::rule_feedback::{Entity, Model};
use crate::error::{Result, StorageError};
use crate::store::{placeholder, Storage};

/// User feedback stored for a (cluster, rule, user) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFeedbackOnRule {
    pub cluster_id: ClusterName,
    pub rule_id: RuleId,
    pub user_id: UserId,
    pub message: String,
    pub user_vote: UserVote,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserFeedbackOnRule {
    fn from_model(row: Model) -> Result<Self> {
        let cluster_id = ClusterName::from_str(&row.cluster_id)
            .map_err(|_| StorageError::not_found(row.cluster_id.clone()))?;
        Ok(Self {
            cluster_id,
            rule_id: RuleId(row.rule_id),
            user_id: UserId(row.user_id),
            message: row.message,
            user_vote: UserVote::from_i16(row.user_vote),
            added_at: row.added_at,
            updated_at: row.updated_at,
        })
    }
}

/// Partial upsert generated from the two update flags; at least one of them
/// is always set. On conflict only the targeted columns and `updated_at` are
/// overwritten, so a vote never erases a stored message and vice versa.
/// `added_at` is written on insert and never touched again.
fn upsert_feedback_sql(
    backend: DbBackend,
    update_vote: bool,
    update_message: bool,
) -> Result<String> {
    let p: Vec<String> = (1..=7)
        .map(|n| placeholder(backend, n))
        .collect::<Result<_>>()?;
    let mut sql = format!(
        "INSERT INTO cluster_rule_user_feedback \
         (cluster_id, rule_id, user_id, user_vote, message, added_at, updated_at) \
         VALUES ({}, {}, {}, {}, {}, {}, {})",
        p[0], p[1], p[2], p[3], p[4], p[5], p[6]
    );

    let mut updates = Vec::new();
    if update_vote {
        updates.push("user_vote = excluded.user_vote");
    }
    if update_message {
        updates.push("message = excluded.message");
    }
    if !updates.is_empty() {
        updates.push("updated_at = excluded.updated_at");
        sql.push_str(" ON CONFLICT (cluster_id, rule_id, user_id) DO UPDATE SET ");
        sql.push_str(&updates.join(", "));
    }
    Ok(sql)
}

impl Storage {
    /// Records the user's vote on a rule for a cluster, leaving any stored
    /// message untouched.
    pub async fn vote_on_rule(
        &self,
        cluster: ClusterName,
        rule: &RuleId,
        user: &UserId,
        vote: UserVote,
    ) -> Result<()> {
        self.upsert_feedback(cluster, rule, user, Some(vote), None)
            .await
    }

    /// Records the user's message on a rule for a cluster, leaving any stored
    /// vote untouched.
    pub async fn add_or_update_feedback_on_rule(
        &self,
        cluster: ClusterName,
        rule: &RuleId,
        user: &UserId,
        message: &str,
    ) -> Result<()> {
        self.upsert_feedback(cluster, rule, user, None, Some(message))
            .await
    }

    async fn upsert_feedback(
        &self,
        cluster: ClusterName,
        rule: &RuleId,
        user: &UserId,
        vote: Option<UserVote>,
        message: Option<&str>,
    ) -> Result<()> {
        self.ensure_open()?;
        let sql = upsert_feedback_sql(self.backend(), vote.is_some(), message.is_some())?;
        let now = Utc::now();
        let stmt = Statement::from_sql_and_values(
            self.backend(),
            &sql,
            [
                Value::from(cluster.as_hyphenated_string()),
                Value::from(rule.0.clone()),
                Value::from(user.0.clone()),
                Value::from(vote.unwrap_or(UserVote::None).as_i16()),
                Value::from(message.unwrap_or_default().to_string()),
                Value::from(now),
                Value::from(now),
            ],
        );
        self.db().execute(stmt).await?;
        metrics::counter!("orca_storage_feedback_on_rules_total").increment(1);
        Ok(())
    }

    /// Reads the feedback row for (cluster, rule, user).
    pub async fn get_user_feedback_on_rule(
        &self,
        cluster: ClusterName,
        rule: &RuleId,
        user: &UserId,
    ) -> Result<UserFeedbackOnRule> {
        self.ensure_open()?;
        let row = Entity::find_by_id((
            cluster.as_hyphenated_string(),
            rule.0.clone(),
            user.0.clone(),
        ))
        .one(self.db())
        .await?
        .ok_or_else(|| StorageError::not_found(format!("{cluster}/{rule}/{user}")))?;
        UserFeedbackOnRule::from_model(row)
    }
}

#[cfg(test)]
mod sql_tests {
    use super::*;

    #[test]
    fn update_set_lists_only_targeted_columns() {
        let vote_only = upsert_feedback_sql(DbBackend::Sqlite, true, false).unwrap();
        assert!(vote_only.contains("user_vote = excluded.user_vote"));
        assert!(!vote_only.contains("message = excluded.message"));
        assert!(vote_only.contains("updated_at = excluded.updated_at"));

        let message_only = upsert_feedback_sql(DbBackend::Postgres, false, true).unwrap();
        assert!(message_only.contains("message = excluded.message"));
        assert!(!message_only.contains("user_vote = excluded.user_vote"));
    }

    #[test]
    fn unknown_driver_is_rejected() {
        assert!(matches!(
            upsert_feedback_sql(DbBackend::MySql, true, true),
            Err(StorageError::UnsupportedDriver(_))
        ));
    }
}
