//! libSQL storage layer.
//!
//! The [`Storage`] struct wraps a local libSQL database holding two things:
//! - embedded evidence documents, grouped into per-company collections
//! - the history of generated risk reports
//!
//! Similarity ranking happens in the caller; this crate only persists and
//! lists rows.

mod migrations;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database, params};
use uuid::Uuid;

use vendorrisk_shared::{
    ChunkMetadata, Criticality, IN_MEMORY_STORAGE, Result, RiskReport, StoredReport,
    VendorRiskError,
};

/// A document row as stored in a vector collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Storage {
    /// Open or create a database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| VendorRiskError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;
        Self::from_database(db).await
    }

    /// Open a throwaway database that lives only as long as this handle.
    pub async fn open_in_memory() -> Result<Self> {
        let db = libsql::Builder::new_local(IN_MEMORY_STORAGE)
            .build()
            .await
            .map_err(db_err)?;
        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self> {
        let conn = db.connect().map_err(db_err)?;
        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    VendorRiskError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Vector documents
    // -----------------------------------------------------------------------

    /// Insert a document, replacing any existing row with the same id in the
    /// collection.
    pub async fn upsert_document(
        &self,
        collection: &str,
        id: &str,
        text: &str,
        metadata: &ChunkMetadata,
        embedding: &[f32],
    ) -> Result<()> {
        let metadata_json = serde_json::to_string(metadata)
            .map_err(|e| VendorRiskError::Storage(format!("encode metadata: {e}")))?;
        let embedding_json = serde_json::to_string(embedding)
            .map_err(|e| VendorRiskError::Storage(format!("encode embedding: {e}")))?;

        self.conn
            .execute(
                "INSERT INTO vector_documents (collection, id, text, metadata_json, embedding_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(collection, id) DO UPDATE SET
                   text = excluded.text,
                   metadata_json = excluded.metadata_json,
                   embedding_json = excluded.embedding_json",
                params![
                    collection,
                    id,
                    text,
                    metadata_json,
                    embedding_json,
                    timestamp(Utc::now())
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// All documents in a collection, in insertion order. Unknown
    /// collections yield an empty list.
    pub async fn list_documents(&self, collection: &str) -> Result<Vec<StoredDocument>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, text, metadata_json, embedding_json
                 FROM vector_documents WHERE collection = ?1 ORDER BY rowid",
                params![collection],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_document(&row)?);
        }
        Ok(results)
    }

    /// Number of documents in a collection.
    pub async fn count_documents(&self, collection: &str) -> Result<usize> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM vector_documents WHERE collection = ?1",
                params![collection],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(row.get::<i64>(0).map_err(db_err)?.max(0) as usize),
            None => Ok(0),
        }
    }

    // -----------------------------------------------------------------------
    // Report history
    // -----------------------------------------------------------------------

    /// Persist a generated report.
    pub async fn insert_report(&self, report: &StoredReport) -> Result<()> {
        let report_json = serde_json::to_string(&report.report)
            .map_err(|e| VendorRiskError::Storage(format!("encode report: {e}")))?;

        self.conn
            .execute(
                "INSERT INTO risk_reports (id, company, criticality, report_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    report.id.to_string(),
                    report.company.as_str(),
                    report.criticality.as_str(),
                    report_json,
                    timestamp(report.created_at)
                ],
            )
            .await
            .map_err(db_err)?;
        tracing::debug!(id = %report.id, company = %report.company, "report saved");
        Ok(())
    }

    /// Reports for `company` (case-insensitive), newest first.
    pub async fn list_reports(&self, company: &str, limit: usize) -> Result<Vec<StoredReport>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, company, criticality, report_json, created_at
                 FROM risk_reports WHERE company = ?1 COLLATE NOCASE
                 ORDER BY created_at DESC, id DESC LIMIT ?2",
                params![company, limit as i64],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_report(&row)?);
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn db_err(e: libsql::Error) -> VendorRiskError {
    VendorRiskError::Storage(e.to_string())
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_document(row: &libsql::Row) -> Result<StoredDocument> {
    let metadata_json = row.get::<String>(2).map_err(db_err)?;
    let embedding_json = row.get::<String>(3).map_err(db_err)?;

    Ok(StoredDocument {
        id: row.get::<String>(0).map_err(db_err)?,
        text: row.get::<String>(1).map_err(db_err)?,
        metadata: serde_json::from_str(&metadata_json)
            .map_err(|e| VendorRiskError::Storage(format!("decode metadata: {e}")))?,
        embedding: serde_json::from_str(&embedding_json)
            .map_err(|e| VendorRiskError::Storage(format!("decode embedding: {e}")))?,
    })
}

fn row_to_report(row: &libsql::Row) -> Result<StoredReport> {
    let id_str = row.get::<String>(0).map_err(db_err)?;
    let criticality_str = row.get::<String>(2).map_err(db_err)?;
    let report_json = row.get::<String>(3).map_err(db_err)?;
    let created_str = row.get::<String>(4).map_err(db_err)?;

    let id = Uuid::parse_str(&id_str)
        .map_err(|e| VendorRiskError::Storage(format!("invalid report id {id_str}: {e}")))?;
    let criticality = criticality_str
        .parse::<Criticality>()
        .map_err(|e| VendorRiskError::Storage(e.to_string()))?;
    let report: RiskReport = serde_json::from_str(&report_json)
        .map_err(|e| VendorRiskError::Storage(format!("decode report: {e}")))?;
    let created_at = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| VendorRiskError::Storage(format!("invalid timestamp {created_str}: {e}")))?;

    Ok(StoredReport {
        id,
        company: row.get::<String>(1).map_err(db_err)?,
        criticality,
        report,
        created_at,
    })
}
