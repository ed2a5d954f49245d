//! Shared types, error model, and configuration for VendorRisk.
//!
//! This crate is the foundation depended on by all other VendorRisk crates.
//! It provides:
//! - [`VendorRiskError`] — the unified error type
//! - Domain types ([`Finding`], [`RiskReport`], [`RetrievedChunk`], [`Criticality`])
//! - Configuration ([`AppConfig`] and its sections, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, EmbeddingConfig, IN_MEMORY_STORAGE, LlmConfig, RetrievalConfig, SearchConfig,
    ServerConfig, StorageConfig, TrustConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, resolve_api_key,
};
pub use error::{Result, VendorRiskError};
pub use types::{
    ChatMessage, ChunkMetadata, CleanDoc, Criticality, Finding, RetrievedChunk, RiskReport,
    StoredReport,
};
