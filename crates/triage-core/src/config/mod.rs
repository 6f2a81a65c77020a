//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `TRIAGE_*` environment variables.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;

/// Service configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `TRIAGE_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8000`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Directory for persistent state (pattern file, vector index, embedding
    /// cache). Default: `./.data`.
    pub data_dir: PathBuf,

    /// Path to the entity-name table (JSON, category -> names).
    pub entity_names_path: PathBuf,

    /// Path to the curated weakness table (JSON).
    pub weaknesses_path: PathBuf,

    /// Base URL of the embedding provider (OpenAI-style `/embeddings`).
    pub embedding_base_url: String,

    /// Embedding model name sent to the provider.
    pub embedding_model: String,

    /// API key for the embedding provider, if it requires one.
    pub embedding_api_key: Option<String>,

    /// Dimension of the provider's output vectors. Default: `1024`.
    pub embedding_dimension: usize,

    /// Character budget applied before hashing/embedding. Default: `5500`.
    pub max_embed_chars: usize,

    /// Similarity floor for pattern retrieval (`1/(1+d)` scale, 0 disables).
    pub relevance_threshold: f32,

    /// Number of patterns fetched per enhanced prompt. Default: `5`.
    pub retrieval_k: usize,

    /// Confidence passed through on routing decisions. Default: `0.70`.
    pub rag_min_confidence: f32,

    /// Max weakness patterns matched per question. Default: `2`.
    pub weakness_top_k: usize,

    /// Weaknesses observed less often than this are ignored. Default: `0.15`.
    pub weakness_min_frequency: f32,

    /// Whether the engine polls data files for updates. Default: `true`.
    pub hot_reload: bool,

    /// Max entries in the routing-decision cache. Default: `10_000`.
    pub decision_cache_capacity: u64,

    /// TTL for cached routing decisions, in seconds. Default: `300`.
    pub decision_cache_ttl_secs: u64,
}

/// Default embedding endpoint used when `TRIAGE_EMBEDDING_BASE_URL` is not set.
pub const DEFAULT_EMBEDDING_BASE_URL: &str = "http://localhost:9000/v1";

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            data_dir: PathBuf::from("./.data"),
            entity_names_path: PathBuf::from("./refs/entity_names.json"),
            weaknesses_path: PathBuf::from("./refs/weaknesses.json"),
            embedding_base_url: DEFAULT_EMBEDDING_BASE_URL.to_string(),
            embedding_model: "text-embedding-v3".to_string(),
            embedding_api_key: None,
            embedding_dimension: 1024,
            max_embed_chars: 5500,
            relevance_threshold: 0.0,
            retrieval_k: 5,
            rag_min_confidence: 0.70,
            weakness_top_k: 2,
            weakness_min_frequency: 0.15,
            hot_reload: true,
            decision_cache_capacity: 10_000,
            decision_cache_ttl_secs: 300,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "TRIAGE_PORT";
    const ENV_BIND_ADDR: &'static str = "TRIAGE_BIND_ADDR";
    const ENV_DATA_DIR: &'static str = "TRIAGE_DATA_DIR";
    const ENV_ENTITY_NAMES_PATH: &'static str = "TRIAGE_ENTITY_NAMES_PATH";
    const ENV_WEAKNESSES_PATH: &'static str = "TRIAGE_WEAKNESSES_PATH";
    const ENV_EMBEDDING_BASE_URL: &'static str = "TRIAGE_EMBEDDING_BASE_URL";
    const ENV_EMBEDDING_MODEL: &'static str = "TRIAGE_EMBEDDING_MODEL";
    const ENV_EMBEDDING_API_KEY: &'static str = "TRIAGE_EMBEDDING_API_KEY";
    const ENV_EMBEDDING_DIMENSION: &'static str = "TRIAGE_EMBEDDING_DIMENSION";
    const ENV_MAX_EMBED_CHARS: &'static str = "TRIAGE_MAX_EMBED_CHARS";
    const ENV_RELEVANCE_THRESHOLD: &'static str = "TRIAGE_RELEVANCE_THRESHOLD";
    const ENV_RETRIEVAL_K: &'static str = "TRIAGE_RETRIEVAL_K";
    const ENV_RAG_MIN_CONFIDENCE: &'static str = "TRIAGE_RAG_MIN_CONFIDENCE";
    const ENV_WEAKNESS_TOP_K: &'static str = "TRIAGE_WEAKNESS_TOP_K";
    const ENV_WEAKNESS_MIN_FREQUENCY: &'static str = "TRIAGE_WEAKNESS_MIN_FREQUENCY";
    const ENV_HOT_RELOAD: &'static str = "TRIAGE_HOT_RELOAD";
    const ENV_DECISION_CACHE_CAPACITY: &'static str = "TRIAGE_DECISION_CACHE_CAPACITY";
    const ENV_DECISION_CACHE_TTL_SECS: &'static str = "TRIAGE_DECISION_CACHE_TTL_SECS";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;

        Ok(Self {
            port,
            bind_addr,
            data_dir: Self::parse_path_from_env(Self::ENV_DATA_DIR, defaults.data_dir),
            entity_names_path: Self::parse_path_from_env(
                Self::ENV_ENTITY_NAMES_PATH,
                defaults.entity_names_path,
            ),
            weaknesses_path: Self::parse_path_from_env(
                Self::ENV_WEAKNESSES_PATH,
                defaults.weaknesses_path,
            ),
            embedding_base_url: Self::parse_string_from_env(
                Self::ENV_EMBEDDING_BASE_URL,
                defaults.embedding_base_url,
            ),
            embedding_model: Self::parse_string_from_env(
                Self::ENV_EMBEDDING_MODEL,
                defaults.embedding_model,
            ),
            embedding_api_key: Self::parse_optional_string_from_env(Self::ENV_EMBEDDING_API_KEY),
            embedding_dimension: Self::parse_usize_from_env(
                Self::ENV_EMBEDDING_DIMENSION,
                defaults.embedding_dimension,
            ),
            max_embed_chars: Self::parse_usize_from_env(
                Self::ENV_MAX_EMBED_CHARS,
                defaults.max_embed_chars,
            ),
            relevance_threshold: Self::parse_f32_from_env(
                Self::ENV_RELEVANCE_THRESHOLD,
                defaults.relevance_threshold,
            ),
            retrieval_k: Self::parse_usize_from_env(Self::ENV_RETRIEVAL_K, defaults.retrieval_k),
            rag_min_confidence: Self::parse_f32_from_env(
                Self::ENV_RAG_MIN_CONFIDENCE,
                defaults.rag_min_confidence,
            ),
            weakness_top_k: Self::parse_usize_from_env(
                Self::ENV_WEAKNESS_TOP_K,
                defaults.weakness_top_k,
            ),
            weakness_min_frequency: Self::parse_f32_from_env(
                Self::ENV_WEAKNESS_MIN_FREQUENCY,
                defaults.weakness_min_frequency,
            ),
            hot_reload: Self::parse_bool_from_env(Self::ENV_HOT_RELOAD, defaults.hot_reload),
            decision_cache_capacity: Self::parse_u64_from_env(
                Self::ENV_DECISION_CACHE_CAPACITY,
                defaults.decision_cache_capacity,
            ),
            decision_cache_ttl_secs: Self::parse_u64_from_env(
                Self::ENV_DECISION_CACHE_TTL_SECS,
                defaults.decision_cache_ttl_secs,
            ),
        })
    }

    /// Validates paths and basic invariants (does not create directories).
    ///
    /// The entity and weakness files are checked by the decision engine at
    /// construction; here only shape errors are caught early.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.exists() && !self.data_dir.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.data_dir.clone(),
            });
        }

        for path in [&self.entity_names_path, &self.weaknesses_path] {
            if path.exists() && !path.is_file() {
                return Err(ConfigError::NotAFile { path: path.clone() });
            }
        }

        for (name, value) in [
            ("relevance_threshold", self.relevance_threshold),
            ("rag_min_confidence", self.rag_min_confidence),
            ("weakness_min_frequency", self.weakness_min_frequency),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_usize_from_env(var_name: &str, default: usize) -> usize {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_u64_from_env(var_name: &str, default: u64) -> u64 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_f32_from_env(var_name: &str, default: f32) -> f32 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_bool_from_env(var_name: &str, default: bool) -> bool {
        env::var(var_name)
            .ok()
            .and_then(|v| match v.trim() {
                "1" | "true" | "yes" => Some(true),
                "0" | "false" | "no" => Some(false),
                _ => None,
            })
            .unwrap_or(default)
    }
}
