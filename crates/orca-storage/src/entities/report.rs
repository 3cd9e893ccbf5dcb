use sea_orm::entity::prelude::*;

/// Latest analysis report per (org, cluster). `cluster` is additionally
/// unique across all orgs: a cluster belongs to exactly one organization.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "report")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub org_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub cluster: String,
    pub report: String,
    pub reported_at: DateTimeUtc,
    pub last_checked_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
