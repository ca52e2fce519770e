//! TOML configuration for providers, chunking, retrieval, and routing.
//!
//! The config file is optional: the built-in defaults target the OpenAI
//! providers with `text-embedding-ada-002` / `gpt-3.5-turbo`. A file is
//! only needed to switch providers (e.g. a local Ollama instance) or to
//! tune chunking/routing parameters.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub routing: RoutingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            dims: default_dims(),
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_generation_model(),
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of top-ranked passages handed to the generation provider.
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

#[derive(Debug, Deserialize, Clone)]
pub struct RoutingConfig {
    /// When multiplexing, tools whose routing score is within this distance
    /// of the best score are also selected.
    #[serde(default = "default_closeness_threshold")]
    pub closeness_threshold: f64,
    /// Query every close-scoring tool and keep the highest-confidence
    /// answer, instead of the default single-tool selection.
    #[serde(default)]
    pub multiplex: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            closeness_threshold: default_closeness_threshold(),
            multiplex: false,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_generation_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_generation_timeout_secs() -> u64 {
    120
}
fn default_max_tokens() -> usize {
    700
}
fn default_top_k() -> usize {
    4
}
fn default_closeness_threshold() -> f64 {
    0.05
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_tokens == 0 {
        anyhow::bail!("chunking.max_tokens must be > 0");
    }
    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }
    if !(0.0..=1.0).contains(&config.routing.closeness_threshold) {
        anyhow::bail!("routing.closeness_threshold must be in [0.0, 1.0]");
    }

    match config.embedding.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be openai or ollama.",
            other
        ),
    }
    match config.generation.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be openai or ollama.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("rqa.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_defaults_match_original_models() {
        let config = Config::default();
        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert_eq!(config.embedding.dims, 1536);
        assert_eq!(config.generation.model, "gpt-3.5-turbo");
        assert_eq!(config.retrieval.top_k, 4);
        assert!(!config.routing.multiplex);
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let (_tmp, path) = write_config("");
        let config = load_config(&path).unwrap();
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert_eq!(config.chunking.max_tokens, 700);
    }

    #[test]
    fn test_partial_override() {
        let (_tmp, path) = write_config(
            r#"
[embedding]
provider = "ollama"
model = "nomic-embed-text"
dims = 768
url = "http://localhost:11434"

[routing]
multiplex = true
"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.embedding.provider, "ollama");
        assert_eq!(config.embedding.dims, 768);
        assert!(config.routing.multiplex);
        // Untouched sections keep their defaults
        assert_eq!(config.generation.provider, "openai");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let (_tmp, path) = write_config("[embedding]\nprovider = \"cohere\"\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let (_tmp, path) = write_config("[retrieval]\ntop_k = 0\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let (_tmp, path) = write_config("[routing]\ncloseness_threshold = 1.5\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_missing_file_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = load_config(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
