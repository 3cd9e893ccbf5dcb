use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, QueryFilter, QueryOrder, Statement,
    Value,
};
use std::str::FromStr;

use orca_common::types::{ClusterName, RuleId, RuleToggle, UserId};

use crate::entities::rule_toggle::{Column, Entity, Model};
use crate::error::{Result, StorageError};
use crate::store::{placeholder, Storage};

/// Stored enable/disable state of a rule for a (cluster, user) pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRuleToggle {
    pub cluster_id: ClusterName,
    pub rule_id: RuleId,
    pub user_id: UserId,
    pub disabled: bool,
    pub disabled_at: Option<DateTime<Utc>>,
    pub enabled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl ClusterRuleToggle {
    fn from_model(row: Model) -> Result<Self> {
        let cluster_id = ClusterName::from_str(&row.cluster_id)
            .map_err(|_| StorageError::not_found(row.cluster_id.clone()))?;
        Ok(Self {
            cluster_id,
            rule_id: RuleId(row.rule_id),
            user_id: UserId(row.user_id),
            disabled: row.disabled != 0,
            disabled_at: row.disabled_at,
            enabled_at: row.enabled_at,
            updated_at: row.updated_at,
        })
    }
}

/// Toggle upsert. The inserted row carries a timestamp only in the column
/// matching the direction of the toggle; on conflict COALESCE keeps the
/// stored value of the other column, so disabling and re-enabling preserve
/// the pair's history.
fn upsert_toggle_sql(backend: DbBackend) -> Result<String> {
    let p: Vec<String> = (1..=7)
        .map(|n| placeholder(backend, n))
        .collect::<Result<_>>()?;
    Ok(format!(
        "INSERT INTO cluster_rule_toggle \
         (cluster_id, rule_id, user_id, disabled, disabled_at, enabled_at, updated_at) \
         VALUES ({}, {}, {}, {}, {}, {}, {}) \
         ON CONFLICT (cluster_id, rule_id, user_id) DO UPDATE SET \
         disabled = excluded.disabled, \
         disabled_at = COALESCE(excluded.disabled_at, cluster_rule_toggle.disabled_at), \
         enabled_at = COALESCE(excluded.enabled_at, cluster_rule_toggle.enabled_at), \
         updated_at = excluded.updated_at",
        p[0], p[1], p[2], p[3], p[4], p[5], p[6]
    ))
}

impl Storage {
    /// Disables or re-enables a rule for a cluster on behalf of a user.
    pub async fn toggle_rule_for_cluster(
        &self,
        cluster: ClusterName,
        rule: &RuleId,
        user: &UserId,
        toggle: RuleToggle,
    ) -> Result<()> {
        self.ensure_open()?;
        let sql = upsert_toggle_sql(self.backend())?;
        let now = Utc::now();
        let disabled_at = match toggle {
            RuleToggle::Disable => Some(now),
            RuleToggle::Enable => None,
        };
        let enabled_at = match toggle {
            RuleToggle::Enable => Some(now),
            RuleToggle::Disable => None,
        };
        let stmt = Statement::from_sql_and_values(
            self.backend(),
            &sql,
            [
                Value::from(cluster.as_hyphenated_string()),
                Value::from(rule.0.clone()),
                Value::from(user.0.clone()),
                Value::from(toggle.as_i16()),
                Value::from(disabled_at),
                Value::from(enabled_at),
                Value::from(now),
            ],
        );
        self.db().execute(stmt).await?;
        Ok(())
    }

    /// Rules currently disabled for the cluster, by any user.
    pub async fn list_disabled_rules_for_cluster(
        &self,
        cluster: ClusterName,
    ) -> Result<Vec<ClusterRuleToggle>> {
        self.ensure_open()?;
        let rows = Entity::find()
            .filter(Column::ClusterId.eq(cluster.as_hyphenated_string()))
            .filter(Column::Disabled.eq(1i16))
            .order_by_asc(Column::RuleId)
            .all(self.db())
            .await?;
        rows.into_iter().map(ClusterRuleToggle::from_model).collect()
    }

    /// Removes the toggle row for (cluster, rule, user). Deleting an absent
    /// row is not an error.
    pub async fn delete_from_rule_cluster_toggle(
        &self,
        cluster: ClusterName,
        rule: &RuleId,
        user: &UserId,
    ) -> Result<()> {
        self.ensure_open()?;
        let result = Entity::delete_by_id((
            cluster.as_hyphenated_string(),
            rule.0.clone(),
            user.0.clone(),
        ))
        .exec(self.db())
        .await?;
        if result.rows_affected == 0 {
            tracing::debug!(cluster = %cluster, rule = %rule, "no toggle row to delete");
        }
        Ok(())
    }
}
