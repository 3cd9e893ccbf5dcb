use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Statement, TransactionTrait, Value,
};
use std::str::FromStr;

use orca_common::types::{ClusterName, ClusterReport, OrgId};

use crate::entities::report::{Column, Entity};
use crate::entities::{rule_feedback, rule_toggle};
use crate::error::{Result, StorageError};
use crate::store::{placeholder, Storage};

/// Freshness-guarded upsert, written once per dialect. The conflict target is
/// the globally unique `cluster` column, so re-ingesting a cluster under a
/// different org overwrites the row (the new org wins). The `WHERE` guard
/// keeps `last_checked_at` monotonically non-decreasing under any
/// interleaving of concurrent writers.
fn upsert_report_sql(backend: DbBackend) -> Result<String> {
    let p: Vec<String> = (1..=5)
        .map(|n| placeholder(backend, n))
        .collect::<Result<_>>()?;
    Ok(format!(
        "INSERT INTO report (org_id, cluster, report, reported_at, last_checked_at) \
         VALUES ({}, {}, {}, {}, {}) \
         ON CONFLICT (cluster) DO UPDATE SET \
         org_id = excluded.org_id, \
         report = excluded.report, \
         reported_at = excluded.reported_at, \
         last_checked_at = excluded.last_checked_at \
         WHERE report.last_checked_at <= excluded.last_checked_at",
        p[0], p[1], p[2], p[3], p[4]
    ))
}

impl Storage {
    /// Upserts the report for (org, cluster), subject to the freshness
    /// invariant: a write carrying an older `last_checked_at` than the stored
    /// value is a warned no-op, not an error.
    pub async fn write_report_for_cluster(
        &self,
        org_id: OrgId,
        cluster: ClusterName,
        report: &ClusterReport,
        last_checked_at: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_open()?;
        let sql = upsert_report_sql(self.backend())?;
        let reported_at = Utc::now();
        let stmt = Statement::from_sql_and_values(
            self.backend(),
            &sql,
            [
                Value::from(org_id.0 as i64),
                Value::from(cluster.as_hyphenated_string()),
                Value::from(report.0.clone()),
                Value::from(reported_at),
                Value::from(last_checked_at),
            ],
        );
        let result = self.db().execute(stmt).await?;
        if result.rows_affected() == 0 {
            tracing::warn!(
                org = %org_id,
                cluster = %cluster,
                last_checked_at = %last_checked_at.to_rfc3339(),
                "skipping write of report with older last_checked_at than stored one"
            );
        }
        Ok(())
    }

    /// Reads the report stored for (org, cluster).
    pub async fn read_report_for_cluster(
        &self,
        org_id: OrgId,
        cluster: ClusterName,
    ) -> Result<(ClusterReport, DateTime<Utc>)> {
        self.ensure_open()?;
        let row = Entity::find_by_id((org_id.0 as i64, cluster.as_hyphenated_string()))
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::not_found(format!("{org_id}/{cluster}")))?;
        Ok((ClusterReport(row.report), row.last_checked_at))
    }

    /// Reads the report for a cluster regardless of the owning org. Used by
    /// internal join paths only; the HTTP layer always goes through the
    /// org-scoped read.
    pub async fn read_report_for_cluster_by_cluster_name(
        &self,
        cluster: ClusterName,
    ) -> Result<(ClusterReport, DateTime<Utc>)> {
        self.ensure_open()?;
        let row = Entity::find()
            .filter(Column::Cluster.eq(cluster.as_hyphenated_string()))
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::not_found(cluster.to_string()))?;
        Ok((ClusterReport(row.report), row.last_checked_at))
    }

    /// Reverse lookup of the organization owning a cluster.
    pub async fn get_org_id_by_cluster_id(&self, cluster: ClusterName) -> Result<OrgId> {
        self.ensure_open()?;
        let org: Option<i64> = Entity::find()
            .select_only()
            .column(Column::OrgId)
            .filter(Column::Cluster.eq(cluster.as_hyphenated_string()))
            .into_tuple()
            .one(self.db())
            .await?;
        match org {
            Some(org) => Ok(OrgId(org as u64)),
            None => Err(StorageError::not_found(cluster.to_string())),
        }
    }

    /// All organizations with at least one report, ascending.
    pub async fn list_of_orgs(&self) -> Result<Vec<OrgId>> {
        self.ensure_open()?;
        let orgs: Vec<i64> = Entity::find()
            .select_only()
            .column(Column::OrgId)
            .distinct()
            .order_by_asc(Column::OrgId)
            .into_tuple()
            .all(self.db())
            .await?;
        Ok(orgs.into_iter().map(|org| OrgId(org as u64)).collect())
    }

    /// Clusters reported for the given organization, ascending by name.
    pub async fn list_of_clusters_for_org(&self, org_id: OrgId) -> Result<Vec<ClusterName>> {
        self.ensure_open()?;
        let clusters: Vec<String> = Entity::find()
            .select_only()
            .column(Column::Cluster)
            .filter(Column::OrgId.eq(org_id.0 as i64))
            .order_by_asc(Column::Cluster)
            .into_tuple()
            .all(self.db())
            .await?;
        Ok(clusters
            .into_iter()
            .filter_map(|c| match ClusterName::from_str(&c) {
                Ok(name) => Some(name),
                Err(err) => {
                    tracing::error!(cluster = %c, error = %err, "stored cluster name is not a UUID");
                    None
                }
            })
            .collect())
    }

    /// Total number of report rows.
    pub async fn reports_count(&self) -> Result<u64> {
        self.ensure_open()?;
        Ok(Entity::find().count(self.db()).await?)
    }

    /// Deletes every report of the organization, cascading to the feedback
    /// and toggle tables.
    pub async fn delete_reports_for_org(&self, org_id: OrgId) -> Result<()> {
        self.ensure_open()?;
        let clusters = self.list_of_clusters_for_org(org_id).await?;
        let cluster_ids: Vec<String> = clusters
            .iter()
            .map(ClusterName::as_hyphenated_string)
            .collect();
        let txn = self.db().begin().await?;
        if !cluster_ids.is_empty() {
            rule_feedback::Entity::delete_many()
                .filter(rule_feedback::Column::ClusterId.is_in(cluster_ids.clone()))
                .exec(&txn)
                .await?;
            rule_toggle::Entity::delete_many()
                .filter(rule_toggle::Column::ClusterId.is_in(cluster_ids))
                .exec(&txn)
                .await?;
        }
        Entity::delete_many()
            .filter(Column::OrgId.eq(org_id.0 as i64))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(())
    }

    /// Deletes the cluster's report together with its feedback and toggle
    /// rows.
    pub async fn delete_reports_for_cluster(&self, cluster: ClusterName) -> Result<()> {
        self.ensure_open()?;
        let cluster_id = cluster.as_hyphenated_string();
        let txn = self.db().begin().await?;
        rule_feedback::Entity::delete_many()
            .filter(rule_feedback::Column::ClusterId.eq(cluster_id.clone()))
            .exec(&txn)
            .await?;
        rule_toggle::Entity::delete_many()
            .filter(rule_toggle::Column::ClusterId.eq(cluster_id.clone()))
            .exec(&txn)
            .await?;
        Entity::delete_many()
            .filter(Column::Cluster.eq(cluster_id))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(())
    }
}
