//! Vector index over per-company evidence collections.
//!
//! Documents are embedded once on upsert and stored with their vectors.
//! Queries embed the query text and rank the collection by cosine distance.

use std::cmp::Ordering;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use vendorrisk_llm::Embedder;
use vendorrisk_shared::{ChunkMetadata, Result, RetrievedChunk, VendorRiskError};
use vendorrisk_storage::Storage;

/// Case- and spacing-insensitive key for a company name.
fn company_key(company: &str) -> String {
    company.trim().to_lowercase().replace(' ', "_")
}

/// Collection holding the evidence for `company`.
pub fn collection_name(company: &str) -> String {
    format!("risk_docs_{}", company_key(company))
}

/// Content-derived document id, so re-upserting the same text is a no-op
/// whatever casing the company name arrives in.
pub fn document_id(company: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{}_{}", company_key(company), &digest[..16])
}

/// `1 - cos(a, b)`. Vectors of different length or zero norm are maximally
/// unrelated (distance 1).
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Embedding-backed document store.
#[derive(Clone)]
pub struct VectorIndex {
    storage: Arc<Storage>,
    embedder: Arc<dyn Embedder>,
}

impl VectorIndex {
    pub fn new(storage: Arc<Storage>, embedder: Arc<dyn Embedder>) -> Self {
        Self { storage, embedder }
    }

    /// Embed and store `text` in the company's collection. Returns the id.
    #[instrument(skip_all, fields(company = %company))]
    pub async fn upsert(&self, company: &str, text: &str, metadata: &ChunkMetadata) -> Result<String> {
        let id = document_id(company, text);
        let embedding = self.embed_one(text).await?;

        self.storage
            .upsert_document(&collection_name(company), &id, text, metadata, &embedding)
            .await?;
        debug!(%id, "document upserted");
        Ok(id)
    }

    /// The `top_k` documents closest to `query_text`, nearest first.
    #[instrument(skip_all, fields(company = %company, top_k))]
    pub async fn query(&self, company: &str, query_text: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let documents = self.storage.list_documents(&collection_name(company)).await?;
        if documents.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query = self.embed_one(query_text).await?;
        let mut hits: Vec<RetrievedChunk> = documents
            .into_iter()
            .map(|doc| RetrievedChunk {
                score: cosine_distance(&query, &doc.embedding),
                id: doc.id,
                doc: doc.text,
                metadata: doc.metadata,
            })
            .collect();

        hits.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));
        hits.truncate(top_k);
        debug!(hits = hits.len(), "vector query complete");
        Ok(hits)
    }

    /// Number of documents stored for `company`.
    pub async fn count(&self, company: &str) -> Result<usize> {
        self.storage.count_documents(&collection_name(company)).await
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| VendorRiskError::Llm("embedder returned no vector".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::KeywordEmbedder;

    async fn index() -> VectorIndex {
        let storage = Storage::open_in_memory().await.unwrap();
        VectorIndex::new(Arc::new(storage), Arc::new(KeywordEmbedder))
    }

    fn meta(url: &str) -> ChunkMetadata {
        ChunkMetadata {
            url: url.into(),
            trust_score: 0.9,
        }
    }

    #[test]
    fn names_and_ids() {
        assert_eq!(collection_name("Acme Corp Inc"), "risk_docs_acme_corp_inc");

        let id = document_id("Acme", "hello");
        assert_eq!(id, "acme_2cf24dba5fb0a30e");
        assert_eq!(document_id("ACME", "hello"), id);
        assert_eq!(document_id(" acme ", "hello"), id);
        assert_ne!(document_id("Acme", "hello!"), id);
    }

    #[test]
    fn cosine_distance_edges() {
        assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-9);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-9);
        assert_eq!(cosine_distance(&[1.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let index = index().await;
        let first = index.upsert("Acme", "Acme lawsuit filed", &meta("https://a.gov")).await.unwrap();
        let second = index.upsert("Acme", "Acme lawsuit filed", &meta("https://a.gov")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(index.count("Acme").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn company_casing_shares_one_document() {
        let index = index().await;
        let lower = index.upsert("Acme", "Acme lawsuit", &meta("https://a.gov")).await.unwrap();
        let upper = index.upsert("ACME", "Acme lawsuit", &meta("https://a.gov")).await.unwrap();
        assert_eq!(lower, upper);
        assert_eq!(index.count("acme").await.unwrap(), 1);

        let hits = index.query("Acme", "lawsuit", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, lower);
    }

    #[tokio::test]
    async fn query_ranks_by_similarity() {
        let index = index().await;
        index
            .upsert("Acme", "Acme wins security award for compliance", &meta("https://award.org"))
            .await
            .unwrap();
        index
            .upsert("Acme", "Acme lawsuit over data breach", &meta("https://www.reuters.com/x"))
            .await
            .unwrap();

        let hits = index.query("Acme", "Acme lawsuits breach incidents", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].doc, "Acme lawsuit over data breach");
        assert_eq!(hits[0].metadata.url, "https://www.reuters.com/x");
        assert!(hits[0].score <= hits[1].score);

        let top = index.query("Acme", "award compliance", 1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].metadata.url, "https://award.org");
    }

    #[tokio::test]
    async fn unknown_collection_is_empty() {
        let index = index().await;
        assert!(index.query("Nobody", "anything", 5).await.unwrap().is_empty());
    }
}
