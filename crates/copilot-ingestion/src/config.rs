//! Pipeline configuration, loaded from environment variables (spec §6).

use config::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// Chunking knobs (spec §4.5, §6).
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkConfig {
    #[serde(default = "default_parent_target_tokens")]
    pub parent_target_tokens: usize,
    #[serde(default = "default_parent_max_tokens")]
    pub parent_max_tokens: usize,
    #[serde(default = "default_child_target_tokens")]
    pub child_target_tokens: usize,
    #[serde(default = "default_child_overlap_ratio")]
    pub child_overlap_ratio: f32,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            parent_target_tokens: default_parent_target_tokens(),
            parent_max_tokens: default_parent_max_tokens(),
            child_target_tokens: default_child_target_tokens(),
            child_overlap_ratio: default_child_overlap_ratio(),
        }
    }
}

fn default_parent_target_tokens() -> usize {
    768
}
fn default_parent_max_tokens() -> usize {
    2048
}
fn default_child_target_tokens() -> usize {
    192
}
fn default_child_overlap_ratio() -> f32 {
    0.15
}

/// Enrichment knobs (spec §4.6, §6).
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichConfig {
    #[serde(default)]
    pub enable_llm_enricher: bool,
    #[serde(default)]
    pub enable_hypothetical_questions: bool,
    #[serde(default = "default_top_k_keywords")]
    pub top_k_keywords: usize,
    #[serde(default = "default_max_entities")]
    pub max_entities_per_chunk: usize,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            enable_llm_enricher: false,
            enable_hypothetical_questions: false,
            top_k_keywords: default_top_k_keywords(),
            max_entities_per_chunk: default_max_entities(),
        }
    }
}

fn default_top_k_keywords() -> usize {
    10
}
fn default_max_entities() -> usize {
    25
}

/// Per-stage time budgets (spec §5).
#[derive(Debug, Clone, Deserialize)]
pub struct StageTimeouts {
    #[serde(default = "default_load_timeout_secs")]
    pub load_secs: u64,
    #[serde(default = "default_parse_timeout_secs")]
    pub parse_secs: u64,
    #[serde(default = "default_structure_timeout_secs")]
    pub structure_secs: u64,
    #[serde(default = "default_chunk_timeout_secs")]
    pub chunk_secs: u64,
    #[serde(default = "default_enrich_timeout_secs")]
    pub enrich_secs: u64,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            load_secs: default_load_timeout_secs(),
            parse_secs: default_parse_timeout_secs(),
            structure_secs: default_structure_timeout_secs(),
            chunk_secs: default_chunk_timeout_secs(),
            enrich_secs: default_enrich_timeout_secs(),
        }
    }
}

fn default_load_timeout_secs() -> u64 {
    60
}
fn default_parse_timeout_secs() -> u64 {
    120
}
fn default_structure_timeout_secs() -> u64 {
    30
}
fn default_chunk_timeout_secs() -> u64 {
    30
}
fn default_enrich_timeout_secs() -> u64 {
    180
}

impl StageTimeouts {
    pub fn load(&self) -> Duration {
        Duration::from_secs(self.load_secs)
    }
    pub fn parse(&self) -> Duration {
        Duration::from_secs(self.parse_secs)
    }
    pub fn structure(&self) -> Duration {
        Duration::from_secs(self.structure_secs)
    }
    pub fn chunk(&self) -> Duration {
        Duration::from_secs(self.chunk_secs)
    }
    pub fn enrich(&self) -> Duration {
        Duration::from_secs(self.enrich_secs)
    }
}

/// In-memory buffering threshold for the Load stage (spec §4.2).
pub const BUFFER_THRESHOLD_BYTES: u64 = 50 * 1024 * 1024;

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub chunk: ChunkConfig,
    #[serde(default)]
    pub enrich: EnrichConfig,
    #[serde(default)]
    pub stage_timeouts: StageTimeouts,
    /// Worker pool size for the orchestrator (spec §5, default 4).
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
    /// Maximum retry attempts for transient stage failures (spec §4.1).
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
}

fn default_worker_pool_size() -> usize {
    4
}

fn default_max_retry_attempts() -> u32 {
    5
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk: ChunkConfig::default(),
            enrich: EnrichConfig::default(),
            stage_timeouts: StageTimeouts::default(),
            worker_pool_size: default_worker_pool_size(),
            max_retry_attempts: default_max_retry_attempts(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from the environment, overlaying defaults.
    /// Recognizes the flat variable names of spec §6:
    /// `CHUNK_PARENT_TARGET_TOKENS`, `CHUNK_PARENT_MAX_TOKENS`,
    /// `CHUNK_CHILD_TARGET_TOKENS`, `CHUNK_CHILD_OVERLAP_RATIO`,
    /// `KEYWORD_TOP_K`, `ENRICH_LLM_ENABLED`, `ENRICH_HQ_ENABLED`,
    /// `STAGE_TIMEOUT_LOAD`, `STAGE_TIMEOUT_PARSE`, `STAGE_TIMEOUT_STRUCTURE`,
    /// `STAGE_TIMEOUT_CHUNK`, `STAGE_TIMEOUT_ENRICH`.
    ///
    /// These var names don't share a common prefix/separator, so each is
    /// read individually rather than through a single `Environment` source;
    /// the `config` crate is still used to parse and validate each value.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = env_usize("CHUNK_PARENT_TARGET_TOKENS")? {
            config.chunk.parent_target_tokens = v;
        }
        if let Some(v) = env_usize("CHUNK_PARENT_MAX_TOKENS")? {
            config.chunk.parent_max_tokens = v;
        }
        if let Some(v) = env_usize("CHUNK_CHILD_TARGET_TOKENS")? {
            config.chunk.child_target_tokens = v;
        }
        if let Some(v) = env_f32("CHUNK_CHILD_OVERLAP_RATIO")? {
            config.chunk.child_overlap_ratio = v;
        }
        if let Some(v) = env_usize("KEYWORD_TOP_K")? {
            config.enrich.top_k_keywords = v;
        }
        if let Some(v) = env_bool("ENRICH_LLM_ENABLED")? {
            config.enrich.enable_llm_enricher = v;
        }
        if let Some(v) = env_bool("ENRICH_HQ_ENABLED")? {
            config.enrich.enable_hypothetical_questions = v;
        }
        if let Some(v) = env_u64("STAGE_TIMEOUT_LOAD")? {
            config.stage_timeouts.load_secs = v;
        }
        if let Some(v) = env_u64("STAGE_TIMEOUT_PARSE")? {
            config.stage_timeouts.parse_secs = v;
        }
        if let Some(v) = env_u64("STAGE_TIMEOUT_STRUCTURE")? {
            config.stage_timeouts.structure_secs = v;
        }
        if let Some(v) = env_u64("STAGE_TIMEOUT_CHUNK")? {
            config.stage_timeouts.chunk_secs = v;
        }
        if let Some(v) = env_u64("STAGE_TIMEOUT_ENRICH")? {
            config.stage_timeouts.enrich_secs = v;
        }

        Ok(config)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_usize(name: &str) -> Result<Option<usize>, ConfigError> {
    env_var(name)
        .map(|v| v.parse().map_err(|_| ConfigError::Message(format!("invalid {name}"))))
        .transpose()
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
    env_var(name)
        .map(|v| v.parse().map_err(|_| ConfigError::Message(format!("invalid {name}"))))
        .transpose()
}

fn env_f32(name: &str) -> Result<Option<f32>, ConfigError> {
    env_var(name)
        .map(|v| v.parse().map_err(|_| ConfigError::Message(format!("invalid {name}"))))
        .transpose()
}

fn env_bool(name: &str) -> Result<Option<bool>, ConfigError> {
    env_var(name)
        .map(|v| match v.to_ascii_lowercase().as_str() {
            "on" | "true" | "1" | "yes" => Ok(true),
            "off" | "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::Message(format!("invalid {name}"))),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_self_consistent() {
        let config = PipelineConfig::default();
        assert!(config.chunk.parent_target_tokens <= config.chunk.parent_max_tokens);
        assert!(config.chunk.child_target_tokens < config.chunk.parent_target_tokens);
        assert_eq!(config.worker_pool_size, 4);
        assert_eq!(config.max_retry_attempts, 5);
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let config = PipelineConfig::load().unwrap();
        assert_eq!(config.enrich.top_k_keywords, 10);
    }
}
