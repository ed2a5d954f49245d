//! Application configuration for VendorRisk.
//!
//! User config lives at `~/.vendorrisk/vendorrisk.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored in the file, only the names of the env vars holding them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VendorRiskError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "vendorrisk.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".vendorrisk";

/// Storage path that selects an ephemeral in-process database.
pub const IN_MEMORY_STORAGE: &str = ":memory:";

// ---------------------------------------------------------------------------
// Config structs (matching vendorrisk.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub trust: TrustConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}

/// `[search]` section: the SERP proxy that fetches raw Google result pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Proxy request endpoint.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Proxy zone name.
    #[serde(default = "default_zone")]
    pub zone: String,

    /// Name of the env var holding the proxy API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Per-request timeout.
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            zone: default_zone(),
            api_key_env: default_search_key_env(),
            timeout_secs: default_search_timeout(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://api.brightdata.com/request".into()
}
fn default_zone() -> String {
    "serp_api1".into()
}
fn default_search_key_env() -> String {
    "BRIGHT_DATA_KEY".into()
}
fn default_search_timeout() -> u64 {
    25
}

/// `[llm]` section: an OpenAI-compatible chat-completions API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_openai_base")]
    pub base_url: String,

    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Sampling temperature for JSON-producing calls.
    #[serde(default = "default_json_temperature")]
    pub json_temperature: f32,

    /// Total model calls allowed when coercing output into JSON.
    #[serde(default = "default_json_attempts")]
    pub max_json_attempts: u32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base(),
            api_key_env: default_openai_key_env(),
            model: default_chat_model(),
            json_temperature: default_json_temperature(),
            max_json_attempts: default_json_attempts(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".into()
}
fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_chat_model() -> String {
    "gpt-4o-mini".into()
}
fn default_json_temperature() -> f32 {
    0.2
}
fn default_json_attempts() -> u32 {
    2
}
fn default_llm_timeout() -> u64 {
    60
}

/// `[embedding]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_openai_base")]
    pub base_url: String,

    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base(),
            api_key_env: default_openai_key_env(),
            model: default_embedding_model(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

/// `[retrieval]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Hits requested per retrieval query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

/// `[trust]` section: the source-domain allowlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Entries starting with `.` match as host suffixes, others as a domain and its subdomains.
    #[serde(default = "default_trusted_domains")]
    pub trusted_domains: Vec<String>,

    /// Host substrings that mark user-generated content.
    #[serde(default = "default_low_trust_markers")]
    pub low_trust_markers: Vec<String>,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            trusted_domains: default_trusted_domains(),
            low_trust_markers: default_low_trust_markers(),
        }
    }
}

fn default_trusted_domains() -> Vec<String> {
    [
        ".gov",
        ".edu",
        ".org",
        ".sec.gov",
        "reuters.com",
        "bloomberg.com",
        "bbc.com",
        "nytimes.com",
        "forbes.com",
        "investopedia.com",
        "wsj.com",
        "techcrunch.com",
        "investor.gov",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_low_trust_markers() -> Vec<String> {
    ["medium", "blogspot", "reddit"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file path, or `:memory:`.
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> String {
    "~/.vendorrisk/vendorrisk.db".into()
}

impl StorageConfig {
    /// Whether the configured path selects an ephemeral database.
    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY_STORAGE
    }

    /// Resolve a leading `~/` against the home directory.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        match self.path.strip_prefix("~/") {
            Some(rest) => {
                let home = dirs::home_dir()
                    .ok_or_else(|| VendorRiskError::config("could not determine home directory"))?;
                Ok(home.join(rest))
            }
            None => Ok(PathBuf::from(&self.path)),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.vendorrisk/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| VendorRiskError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.vendorrisk/vendorrisk.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| VendorRiskError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| VendorRiskError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| VendorRiskError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| VendorRiskError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| VendorRiskError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read an API key from the named env var, failing if it is unset or empty.
pub fn resolve_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(VendorRiskError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}
