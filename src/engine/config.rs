// Recall Engine — Configuration
//
// RetrievalConfig is read from a TOML file (every field optional) and then
// overlaid with environment variables, so a bare `.env`-style deployment
// works without any file at all.

use crate::atoms::constants::*;
use crate::atoms::error::{EngineError, EngineResult};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Embedding service used by the local fast path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Base URL for the embedding API (Ollama: http://localhost:11434)
    pub base_url: String,
    /// Embedding model name (e.g., "nomic-embed-text", "all-minilm")
    pub model: String,
    /// Expected embedding dimensions (768 for nomic-embed-text, 384 for all-minilm)
    pub dims: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig {
            base_url: DEFAULT_EMBEDDING_BASE_URL.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dims: DEFAULT_EMBEDDING_DIMS,
        }
    }
}

/// Remote memory-search service used as the fallback path.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Graph nodes the service may expand when graph search is on.
    pub max_nodes: usize,
    /// Ask the service to re-rank its results.
    pub rank_results: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            base_url: DEFAULT_REMOTE_BASE_URL.into(),
            api_key: None,
            timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
            max_nodes: DEFAULT_MAX_GRAPH_NODES,
            rank_results: true,
        }
    }
}

// Hand-written so the API key never reaches a log line.
impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_nodes", &self.max_nodes)
            .field("rank_results", &self.rank_results)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Use local embedder + collections when ready. When false every search
    /// goes straight to the remote service.
    pub local_fast_path: bool,
    pub default_limit: usize,
    /// Candidates requested from each tier before the merge.
    /// `None` means "same as the request limit".
    pub limit_per_tier: Option<usize>,
    pub embed_timeout_ms: u64,
    pub tier_query_timeout_ms: u64,
    pub history_capacity: usize,
    pub readiness_timeout_ms: u64,
    pub readiness_poll_ms: u64,
    pub embedding: EmbeddingConfig,
    pub remote: RemoteConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        RetrievalConfig {
            local_fast_path: true,
            default_limit: DEFAULT_MAX_MEMORIES,
            limit_per_tier: None,
            embed_timeout_ms: DEFAULT_EMBED_TIMEOUT_MS,
            tier_query_timeout_ms: DEFAULT_TIER_QUERY_TIMEOUT_MS,
            history_capacity: SEARCH_HISTORY_CAPACITY,
            readiness_timeout_ms: DEFAULT_READINESS_TIMEOUT_MS,
            readiness_poll_ms: DEFAULT_READINESS_POLL_MS,
            embedding: EmbeddingConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl RetrievalConfig {
    /// `<config_dir>/tiered-recall/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> EngineResult<Self> {
        let config: RetrievalConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file does not
    /// exist, then apply environment overrides and validate.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => {
                info!("[config] Loaded {}", path.display());
                Self::from_toml_str(&content)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("[config] No config at {} — using defaults", path.display());
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from the default path (or pure defaults + env when there is none).
    pub fn load_default() -> EngineResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => {
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary variable source.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_REMOTE_API_KEY).filter(|k| !k.trim().is_empty()) {
            self.remote.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_REMOTE_BASE_URL).filter(|u| !u.trim().is_empty()) {
            self.remote.base_url = url;
        }
        if let Some(flag) = lookup(ENV_LOCAL_FAST_PATH) {
            match parse_flag(&flag) {
                Some(enabled) => self.local_fast_path = enabled,
                None => warn!("[config] Ignoring {}={:?} — not a boolean", ENV_LOCAL_FAST_PATH, flag),
            }
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        let checks: [(&str, bool); 7] = [
            ("default_limit", self.default_limit == 0),
            ("limit_per_tier", self.limit_per_tier == Some(0)),
            ("embed_timeout_ms", self.embed_timeout_ms == 0),
            ("tier_query_timeout_ms", self.tier_query_timeout_ms == 0),
            ("history_capacity", self.history_capacity == 0),
            ("readiness_poll_ms", self.readiness_poll_ms == 0),
            ("remote.timeout_secs", self.remote.timeout_secs == 0),
        ];
        if let Some((field, _)) = checks.iter().find(|(_, bad)| *bad) {
            return Err(EngineError::Config(format!("{} must be greater than zero", field)));
        }
        if self.embedding.base_url.trim().is_empty() {
            return Err(EngineError::Config("embedding.base_url is empty".into()));
        }
        Ok(())
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_millis(self.embed_timeout_ms)
    }

    pub fn tier_query_timeout(&self) -> Duration {
        Duration::from_millis(self.tier_query_timeout_ms)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn readiness_poll(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_ms)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
