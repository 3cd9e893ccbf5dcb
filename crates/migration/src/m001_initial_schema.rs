use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();
        for statement in UP_SQL {
            conn.execute_unprepared(statement).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();
        for statement in DOWN_SQL {
            conn.execute_unprepared(statement).await?;
        }
        Ok(())
    }
}

// The SQL below is restricted to the dialect subset SQLite and PostgreSQL
// share; one statement per entry so both drivers execute it the same way.
const UP_SQL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS report (
        org_id          BIGINT      NOT NULL,
        cluster         CHAR(36)    NOT NULL UNIQUE,
        report          TEXT        NOT NULL,
        reported_at     TIMESTAMPTZ NOT NULL,
        last_checked_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (org_id, cluster)
    )",
    "CREATE INDEX IF NOT EXISTS idx_report_org_id ON report (org_id)",
    "CREATE TABLE IF NOT EXISTS cluster_rule_user_feedback (
        cluster_id CHAR(36)    NOT NULL,
        rule_id    TEXT        NOT NULL,
        user_id    TEXT        NOT NULL,
        user_vote  SMALLINT    NOT NULL,
        message    TEXT        NOT NULL,
        added_at   TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (cluster_id, rule_id, user_id)
    )",
    "CREATE TABLE IF NOT EXISTS cluster_rule_toggle (
        cluster_id  CHAR(36)    NOT NULL,
        rule_id     TEXT        NOT NULL,
        user_id     TEXT        NOT NULL,
        disabled    SMALLINT    NOT NULL,
        disabled_at TIMESTAMPTZ,
        enabled_at  TIMESTAMPTZ,
        updated_at  TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (cluster_id, rule_id, user_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_toggle_disabled ON cluster_rule_toggle (cluster_id, disabled)",
];

const DOWN_SQL: &[&str] = &[
    "DROP TABLE IF EXISTS cluster_rule_toggle",
    "DROP TABLE IF EXISTS cluster_rule_user_feedback",
    "DROP TABLE IF EXISTS report",
];
