use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::application::PromptTemplates;
use crate::domain::DomainError;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Deployment settings read from `config.yaml`. Every field has a default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
    pub corpus: CorpusConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    /// Optional YAML file overriding the prompt templates.
    pub prompts_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub path: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/reviews.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "embedding-001".to_string(),
            dimension: 768,
            base_url: GEMINI_BASE_URL.to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
    /// Default for `POST /api/chat` when the request does not say.
    pub stream: bool,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            temperature: None,
            stream: true,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalBackend {
    #[default]
    Pinecone,
    Qdrant,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub backend: RetrievalBackend,
    pub pinecone: PineconeConfig,
    pub qdrant: QdrantConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            backend: RetrievalBackend::default(),
            pinecone: PineconeConfig::default(),
            qdrant: QdrantConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PineconeConfig {
    /// Data-plane host of the index, e.g. `rag-abc123.svc.us-east-1.pinecone.io`.
    pub index_host: String,
    pub namespace: Option<String>,
    pub api_version: String,
    pub timeout_seconds: u64,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            index_host: String::new(),
            namespace: None,
            api_version: "2024-07".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    pub url: String,
    pub collection: String,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            collection: "rag".to_string(),
        }
    }
}

/// Settings plus prompt templates.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptTemplates,
}

impl AppConfig {
    /// Loads from `APP_CONFIG` (or `config/config.yaml`), then applies
    /// environment overrides. A missing file means defaults.
    pub fn load() -> Result<Self, DomainError> {
        let path = std::env::var("APP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut app = Self::from_path(Path::new(&path))?;
        app.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(app)
    }

    pub fn from_path(path: &Path) -> Result<Self, DomainError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let yaml = read(path)?;
        let mut app = Self::from_yaml(&yaml)?;

        if let Some(prompts_path) = app.config.prompts_path.clone() {
            let prompts_path = match path.parent() {
                Some(dir) if prompts_path.is_relative() && !prompts_path.exists() => {
                    dir.join(prompts_path)
                }
                _ => prompts_path,
            };
            app.prompts = serde_yaml::from_str(&read(&prompts_path)?).map_err(|e| {
                DomainError::config(format!("invalid prompts {}: {}", prompts_path.display(), e))
            })?;
        }

        Ok(app)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, DomainError> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| DomainError::config(format!("invalid config: {}", e)))?;
        Ok(Self {
            config,
            prompts: PromptTemplates::default(),
        })
    }

    /// Applies `SERVER_HOST`, `SERVER_PORT`, `PINECONE_INDEX_HOST` and
    /// `QDRANT_URL` when `lookup` returns them.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), DomainError> {
        if let Some(host) = lookup("SERVER_HOST") {
            self.config.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.config.server.port = port
                .parse()
                .map_err(|_| DomainError::config(format!("invalid SERVER_PORT: {}", port)))?;
        }
        if let Some(host) = lookup("PINECONE_INDEX_HOST") {
            self.config.retrieval.pinecone.index_host = host;
        }
        if let Some(url) = lookup("QDRANT_URL") {
            self.config.retrieval.qdrant.url = url;
        }
        Ok(())
    }
}

fn read(path: &Path) -> Result<String, DomainError> {
    std::fs::read_to_string(path)
        .map_err(|e| DomainError::config(format!("failed to read {}: {}", path.display(), e)))
}

/// Provider credentials, taken only from the environment.
#[derive(Clone, Default)]
pub struct Secrets {
    pub gemini_api_key: Option<String>,
    pub pinecone_api_key: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            pinecone_api_key: non_empty("PINECONE_API_KEY"),
        }
    }

    pub fn gemini(&self) -> Result<&str, DomainError> {
        self.gemini_api_key
            .as_deref()
            .ok_or_else(|| DomainError::config("GEMINI_API_KEY is not set"))
    }

    pub fn pinecone(&self) -> Result<&str, DomainError> {
        self.pinecone_api_key
            .as_deref()
            .ok_or_else(|| DomainError::config("PINECONE_API_KEY is not set"))
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Secrets")
            .field("gemini_api_key", &mask(&self.gemini_api_key))
            .field("pinecone_api_key", &mask(&self.pinecone_api_key))
            .finish()
    }
}
