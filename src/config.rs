use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the newsvec pipeline.
#[derive(Debug)]
pub struct Config {
    /// Base URL of the Qdrant instance receiving article points.
    pub qdrant_url: String,
    /// Name of the Qdrant collection used for article storage.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Character budget applied to embedding input before submission.
    pub embedding_char_budget: usize,
    /// API key for the hosted OpenAI embeddings endpoint.
    pub openai_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible embeddings endpoint.
    pub openai_base_url: String,
    /// Base URL of the local Ollama runtime.
    pub ollama_url: String,
    /// Enrichment provider used for the LLM collaborator calls.
    pub enrichment_provider: EnrichmentProvider,
    /// Model identifier used for enrichment completions.
    pub enrichment_model: Option<String>,
    /// Root directory of the persona-partitioned stage trees.
    pub data_dir: PathBuf,
}

/// Supported embedding backends for the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Hosted OpenAI embeddings API.
    OpenAI,
}

/// Supported enrichment backends for the LLM collaborators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnrichmentProvider {
    /// No provider configured; enrichment runs deterministic fallbacks.
    None,
    /// Local Ollama runtime.
    Ollama,
}

const DEFAULT_COLLECTION: &str = "news_vectors";
const DEFAULT_CHAR_BUDGET: usize = 32_000;
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_DATA_DIR: &str = "data";

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let embedding_provider: EmbeddingProvider =
            load_env("EMBEDDING_PROVIDER")?.parse().map_err(|()| {
                ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string())
            })?;
        let enrichment_provider: EnrichmentProvider = load_env_optional("ENRICHMENT_PROVIDER")
            .map(|value| {
                value
                    .parse()
                    .map_err(|()| ConfigError::InvalidValue("ENRICHMENT_PROVIDER".to_string()))
            })
            .transpose()?
            .unwrap_or(EnrichmentProvider::None);

        let openai_api_key = load_env_optional("OPENAI_API_KEY");
        if embedding_provider == EmbeddingProvider::OpenAI && openai_api_key.is_none() {
            return Err(ConfigError::MissingVariable("OPENAI_API_KEY".to_string()));
        }

        let enrichment_model = load_env_optional("ENRICHMENT_MODEL");
        if enrichment_provider == EnrichmentProvider::Ollama && enrichment_model.is_none() {
            return Err(ConfigError::MissingVariable("ENRICHMENT_MODEL".to_string()));
        }

        Ok(Self {
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_collection_name: load_env_optional("QDRANT_COLLECTION_NAME")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            embedding_provider,
            embedding_model: load_env("EMBEDDING_MODEL")?,
            embedding_dimension: load_env("EMBEDDING_DIMENSION")?
                .parse()
                .map_err(|_| ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()))?,
            embedding_char_budget: load_env_optional("EMBEDDING_CHAR_BUDGET")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("EMBEDDING_CHAR_BUDGET".to_string()))
                })
                .transpose()?
                .unwrap_or(DEFAULT_CHAR_BUDGET),
            openai_api_key,
            openai_base_url: load_env_optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            enrichment_provider,
            enrichment_model,
            data_dir: load_env_optional("NEWSVEC_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for EnrichmentProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
///
/// Returns the cached value when called more than once. A missing or invalid
/// variable is fatal to the run and surfaces before any stage does work.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    if let Some(existing) = CONFIG.get() {
        return Ok(existing);
    }
    let config = Config::from_env()?;
    Ok(CONFIG.get_or_init(|| config))
}
