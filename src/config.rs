use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::RagError;

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/docqa.toml";

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Environment variable holding the service credential.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            embedding: EmbeddingConfig::default(),
            answer: AnswerConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            index: IndexConfig::default(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            url: default_url(),
            timeout_secs: default_embedding_timeout(),
            max_retries: 0,
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_embedding_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnswerConfig {
    #[serde(default = "default_answer_model")]
    pub model: String,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_answer_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            model: default_answer_model(),
            url: default_url(),
            temperature: default_temperature(),
            timeout_secs: default_answer_timeout(),
            max_retries: 0,
        }
    }
}

fn default_answer_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f64 {
    0.2
}
fn default_answer_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    900
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
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
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
        }
    }
}

fn default_index_path() -> PathBuf {
    PathBuf::from("./rag_index.json")
}

impl Config {
    /// Check value ranges. Called after file parsing and again after CLI
    /// overrides are applied.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| -> anyhow::Error { RagError::Configuration(msg.to_string()).into() };

        if self.api_key_env.trim().is_empty() {
            return Err(invalid("api_key_env must not be empty"));
        }
        if self.chunking.max_chars == 0 {
            return Err(invalid("chunking.max_chars must be > 0"));
        }
        if self.retrieval.top_k < 1 {
            return Err(invalid("retrieval.top_k must be >= 1"));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(invalid("embedding.model must not be empty"));
        }
        if self.embedding.url.trim().is_empty() {
            return Err(invalid("embedding.url must not be empty"));
        }
        if self.embedding.timeout_secs == 0 {
            return Err(invalid("embedding.timeout_secs must be > 0"));
        }
        if self.answer.model.trim().is_empty() {
            return Err(invalid("answer.model must not be empty"));
        }
        if self.answer.url.trim().is_empty() {
            return Err(invalid("answer.url must not be empty"));
        }
        if self.answer.timeout_secs == 0 {
            return Err(invalid("answer.timeout_secs must be > 0"));
        }
        if !(0.0..=2.0).contains(&self.answer.temperature) {
            return Err(invalid("answer.temperature must be in [0.0, 2.0]"));
        }
        Ok(())
    }

    /// Read the credential from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(RagError::Configuration(format!(
                "{} environment variable not set",
                self.api_key_env
            ))
            .into()),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    config.validate()?;
    Ok(config)
}

/// Load the explicit config file, or the default one if present, or fall
/// back to built-in defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => load_config(path),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_config(default_path)
            } else {
                Ok(Config::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_behavior() {
        let cfg = Config::default();
        assert_eq!(cfg.api_key_env, "OPENAI_API_KEY");
        assert_eq!(cfg.embedding.model, "text-embedding-3-small");
        assert_eq!(cfg.answer.model, "gpt-4o-mini");
        assert_eq!(cfg.answer.temperature, 0.2);
        assert_eq!(cfg.chunking.max_chars, 900);
        assert_eq!(cfg.retrieval.top_k, 3);
        assert_eq!(cfg.index.path, PathBuf::from("./rag_index.json"));
        assert_eq!(cfg.embedding.max_retries, 0);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[chunking]
max_chars = 400

[index]
path = "/tmp/idx.json"
"#,
        )
        .unwrap();
        assert_eq!(cfg.chunking.max_chars, 400);
        assert_eq!(cfg.index.path, PathBuf::from("/tmp/idx.json"));
        assert_eq!(cfg.retrieval.top_k, 3);
        assert_eq!(cfg.embedding.url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let mut cfg = Config::default();
        cfg.chunking.max_chars = 0;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let mut cfg = Config::default();
        cfg.answer.temperature = 3.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_top_level_key() {
        let result: Result<Config, _> = toml::from_str("db_path = \"x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_api_key_names_variable() {
        let cfg = Config {
            api_key_env: "DOCQA_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Config::default()
        };
        let err = cfg.api_key().unwrap_err();
        assert!(err
            .to_string()
            .contains("DOCQA_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docqa.toml");
        std::fs::write(&path, "[retrieval]\ntop_k = 5\n").unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.retrieval.top_k, 5);
    }

    #[test]
    fn test_load_config_invalid_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docqa.toml");
        std::fs::write(&path, "[retrieval]\ntop_k = 0\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
