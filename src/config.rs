use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::chunker::DEFAULT_MAX_CHUNK_SIZE;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub guardian: GuardianConfig,
    #[serde(default)]
    pub assets: Option<AssetsConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
        }
    }
}

fn default_max_chunk_size() -> usize {
    DEFAULT_MAX_CHUNK_SIZE
}

/// Scoring bonuses for the matcher. The defaults mirror the weights the
/// pipeline has always shipped with; they are configuration, not tuned
/// values with a documented rationale.
#[derive(Debug, Deserialize, Clone)]
pub struct MatchingConfig {
    #[serde(default = "default_tag_bonus")]
    pub tag_bonus: i64,
    #[serde(default = "default_description_bonus")]
    pub description_bonus: i64,
    #[serde(default = "default_source_label_bonus")]
    pub source_label_bonus: i64,
    #[serde(default = "default_mood_bonus")]
    pub mood_bonus: i64,
    #[serde(default = "default_match_limit")]
    pub default_limit: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            tag_bonus: default_tag_bonus(),
            description_bonus: default_description_bonus(),
            source_label_bonus: default_source_label_bonus(),
            mood_bonus: default_mood_bonus(),
            default_limit: default_match_limit(),
        }
    }
}

fn default_tag_bonus() -> i64 {
    10
}
fn default_description_bonus() -> i64 {
    5
}
fn default_source_label_bonus() -> i64 {
    3
}
fn default_mood_bonus() -> i64 {
    7
}
fn default_match_limit() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct GuardianConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for GuardianConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            timeout_secs: default_timeout_secs(),
            max_content_chars: default_max_content_chars(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_content_chars() -> usize {
    15_000
}
fn default_max_concurrent() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssetsConfig {
    pub path: PathBuf,
}

impl GuardianConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.max_chunk_size == 0 {
        anyhow::bail!("chunking.max_chunk_size must be > 0");
    }

    // Validate matching
    if config.matching.default_limit < 1 {
        anyhow::bail!("matching.default_limit must be >= 1");
    }

    // Validate guardian
    if config.guardian.max_concurrent < 1 {
        anyhow::bail!("guardian.max_concurrent must be >= 1");
    }
    if config.guardian.is_enabled() && config.guardian.model.is_none() {
        anyhow::bail!(
            "guardian.model must be specified when provider is '{}'",
            config.guardian.provider
        );
    }

    match config.guardian.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown guardian provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(config)
}
