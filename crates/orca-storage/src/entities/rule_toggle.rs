use sea_orm::entity::prelude::*;

/// Per-user enable/disable flag on a (cluster, rule) pairing. Disabling and
/// re-enabling preserve the row; only the matching timestamp moves.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cluster_rule_toggle")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub cluster_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub rule_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub disabled: i16,
    pub disabled_at: Option<DateTimeUtc>,
    pub enabled_at: Option<DateTimeUtc>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
