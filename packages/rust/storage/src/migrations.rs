//! SQL migration definitions for the VendorRisk database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: vector_documents",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Embedded evidence, one collection per assessed company
CREATE TABLE IF NOT EXISTS vector_documents (
    collection     TEXT NOT NULL,
    id             TEXT NOT NULL,
    text           TEXT NOT NULL,
    metadata_json  TEXT NOT NULL,
    embedding_json TEXT NOT NULL,
    created_at     TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Report history: risk_reports",
            sql: r#"
CREATE TABLE IF NOT EXISTS risk_reports (
    id          TEXT PRIMARY KEY,
    company     TEXT NOT NULL,
    criticality TEXT NOT NULL,
    report_json TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_risk_reports_company
    ON risk_reports(company COLLATE NOCASE, created_at);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
