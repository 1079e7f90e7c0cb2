//! Configuration management for Tutor.
//!
//! Configuration is merged from (lowest to highest precedence):
//! - Built-in defaults
//! - The workspace config file (`.tutor/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! The resulting [`AppConfig`] is created once at startup and shared
//! read-only by every component that needs it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".tutor";

/// Providers the LLM factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 2] = ["openai", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .tutor/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active chat model provider ("openai", "ollama")
    pub provider: String,

    /// Chat model identifier
    pub model: String,

    /// Explicit API key for the chat model provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log output format
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Embedding provider used by the vector index
    pub embedding: EmbeddingSettings,

    /// External web search provider
    pub search: SearchSettings,

    /// Answer pipeline tuning
    pub rag: RagSettings,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Model identifier configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::OpenAI { model, .. } | ProviderConfig::Ollama { model, .. } => model,
        }
    }

    /// Custom endpoint, if one is configured.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAI { endpoint, .. } => endpoint.as_deref(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }

    /// Request timeout in seconds, if one is configured.
    pub fn timeout_secs(&self) -> Option<u64> {
        match self {
            ProviderConfig::Ollama { timeout, .. } => *timeout,
            ProviderConfig::OpenAI { .. } => None,
        }
    }
}

/// Embedding provider settings (`embedding:` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingSettings {
    /// Provider name ("openai", "ollama", "mock")
    pub provider: String,

    /// Embedding model identifier
    pub model: String,

    /// Expected vector dimensions
    pub dimensions: usize,

    /// Custom endpoint URL
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Number of texts embedded per request during ingestion
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            endpoint: None,
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            batch_size: 64,
        }
    }
}

/// External web search settings (`search:` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchSettings {
    /// Whether the pipeline queries the web at all
    pub enabled: bool,

    /// Provider name ("serpapi")
    pub provider: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Provider base URL
    pub endpoint: String,

    /// Search engine requested from the provider
    pub engine: String,

    pub google_domain: String,

    /// Country code
    pub gl: String,

    /// Interface language
    pub hl: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "serpapi".to_string(),
            api_key_env: "SERPAPI_API_KEY".to_string(),
            endpoint: "https://serpapi.com".to_string(),
            engine: "google".to_string(),
            google_domain: "google.com".to_string(),
            gl: "us".to_string(),
            hl: "en".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Answer pipeline settings (`rag:` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RagSettings {
    /// Knowledge base queried by the retriever
    pub knowledge_base: String,

    /// Number of distinct chunks placed in the prompt
    pub top_k: usize,

    /// Candidates requested from the index per distinct chunk wanted
    pub oversample_factor: usize,

    /// Sampling temperature for the answer model
    pub temperature: f32,

    /// Prompt definition used to compose the model input
    pub prompt_id: String,

    /// History length after which `chat` starts a new conversation
    pub max_history_messages: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            knowledge_base: "documents".to_string(),
            top_k: 5,
            oversample_factor: 2,
            temperature: 0.0,
            prompt_id: "rag.cot.en".to_string(),
            max_history_messages: 20,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    embedding: Option<EmbeddingSettings>,
    search: Option<SearchSettings>,
    rag: Option<RagSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<LogFormat>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            api_key: None,
            log_level: None,
            log_format: LogFormat::Pretty,
            verbose: false,
            no_color: false,
            llm: None,
            embedding: EmbeddingSettings::default(),
            search: SearchSettings::default(),
            rag: RagSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and environment variables.
    ///
    /// Environment variables:
    /// - `TUTOR_WORKSPACE`: Override workspace path
    /// - `TUTOR_CONFIG`: Path to config file
    /// - `TUTOR_PROVIDER`: Chat model provider
    /// - `TUTOR_MODEL`: Chat model identifier
    /// - `TUTOR_API_KEY`: API key for the chat model provider
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use tutor_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration with an explicit workspace and config file.
    ///
    /// Both take precedence over `TUTOR_WORKSPACE` and `TUTOR_CONFIG` and
    /// are resolved before the config file is merged. A config file that
    /// was named explicitly must exist.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        let explicit_workspace =
            workspace.or_else(|| std::env::var_os("TUTOR_WORKSPACE").map(PathBuf::from));
        if let Some(workspace) = &explicit_workspace {
            config.workspace = workspace.clone();
        }

        config.config_file =
            config_file.or_else(|| std::env::var_os("TUTOR_CONFIG").map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        match config.config_file.clone() {
            Some(path) if !path.exists() => {
                return Err(AppError::Config(format!(
                    "Config file does not exist: {:?}",
                    path
                )));
            }
            Some(path) => config = config.merge_yaml(&path)?,
            None => {
                let default_path = config.state_dir().join("config.yaml");
                if default_path.exists() {
                    config = config.merge_yaml(&default_path)?;
                }
            }
        }

        // `workspace.path` in the file never beats a flag or TUTOR_WORKSPACE
        if let Some(workspace) = explicit_workspace {
            config.workspace = workspace;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("TUTOR_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("TUTOR_MODEL") {
            config.model = model;
        }

        config.api_key = non_empty_env("TUTOR_API_KEY");

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into a copy of this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;
        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }
            result.llm = Some(llm);
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(search) = config_file.search {
            result.search = search;
        }

        if let Some(rag) = config_file.rag {
            result.rag = rag;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config
    /// file. The workspace and config file path are passed to
    /// [`AppConfig::load_from`] instead, since they decide which file is merged.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .tutor directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .tutor directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Get a provider's configuration block, if the config file defines one.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Resolve the API key for a chat model provider.
    ///
    /// `TUTOR_API_KEY` wins; otherwise the provider's `apiKeyEnv` is read,
    /// falling back to `OPENAI_API_KEY` for the OpenAI provider.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => non_empty_env(api_key_env),
            Some(ProviderConfig::Ollama { .. }) => None,
            None if provider == "openai" => non_empty_env("OPENAI_API_KEY"),
            None => None,
        }
    }

    /// Resolve the API key for the embedding provider.
    pub fn resolve_embedding_api_key(&self) -> Option<String> {
        self.embedding.api_key_env.as_deref().and_then(non_empty_env)
    }

    /// Resolve the API key for the web search provider.
    pub fn resolve_search_api_key(&self) -> Option<String> {
        non_empty_env(&self.search.api_key_env)
    }

    /// Validate configuration for the active provider and pipeline settings.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.rag.top_k == 0 {
            return Err(AppError::Config("rag.topK must be at least 1".to_string()));
        }

        if self.rag.oversample_factor == 0 {
            return Err(AppError::Config(
                "rag.oversampleFactor must be at least 1".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.rag.temperature) {
            return Err(AppError::Config(format!(
                "rag.temperature must be between 0.0 and 2.0, got {}",
                self.rag.temperature
            )));
        }

        if self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "embedding.batchSize must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Read an environment variable, treating empty values as unset.
fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.rag.top_k, 5);
        assert_eq!(config.rag.oversample_factor, 2);
        assert_eq!(config.rag.temperature, 0.0);
        assert!(!config.verbose);
        assert!(!config.no_color);
    }

    #[test]
    fn test_state_dir() {
        let config = AppConfig::default();
        assert!(config.state_dir().ends_with(".tutor"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "ollama");
        assert_eq!(overridden.model, "llama3.2");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml_sections() {
        let yaml = r#"
llm:
  activeProvider: ollama
  providers:
    ollama:
      endpoint: http://localhost:11434
      model: mistral
      timeout: 60
    openai:
      apiKeyEnv: MY_OPENAI_KEY
      model: gpt-4o
rag:
  topK: 8
  promptId: rag.cot.fr
search:
  enabled: false
logging:
  level: debug
  format: json
"#;
        let merged = AppConfig::default().merge_yaml_str(yaml).unwrap();

        assert_eq!(merged.provider, "ollama");
        assert_eq!(merged.model, "mistral");
        assert_eq!(merged.rag.top_k, 8);
        assert_eq!(merged.rag.prompt_id, "rag.cot.fr");
        // Unspecified fields keep their defaults
        assert_eq!(merged.rag.oversample_factor, 2);
        assert!(!merged.search.enabled);
        assert_eq!(merged.search.api_key_env, "SERPAPI_API_KEY");
        assert_eq!(merged.log_level.as_deref(), Some("debug"));
        assert_eq!(merged.log_format, LogFormat::Json);

        let ollama = merged.get_provider_config("ollama").unwrap();
        assert!(matches!(ollama, ProviderConfig::Ollama { .. }));
        assert_eq!(ollama.timeout_secs(), Some(60));

        let openai = merged.get_provider_config("openai").unwrap();
        assert!(matches!(openai, ProviderConfig::OpenAI { .. }));
        assert_eq!(openai.endpoint(), None);
    }

    #[test]
    fn test_merge_invalid_yaml_fails() {
        let result = AppConfig::default().merge_yaml_str("rag:\n  topK: lots\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_file_from_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "rag:\n  knowledgeBase: politics\n").unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.rag.knowledge_base, "politics");
    }

    #[test]
    fn test_load_from_explicit_config_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("custom.yaml");
        std::fs::write(&path, "rag:\n  topK: 9\n").unwrap();

        let config = AppConfig::load_from(Some(temp.path().to_path_buf()), Some(path.clone()))
            .unwrap()
            .with_overrides(None, None, None, false, false);

        assert_eq!(config.rag.top_k, 9);
        assert_eq!(config.config_file, Some(path));
    }

    #[test]
    fn test_load_from_workspace_reads_its_state_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(STATE_DIR)).unwrap();
        std::fs::write(
            temp.path().join(STATE_DIR).join("config.yaml"),
            "workspace:\n  path: /elsewhere\nrag:\n  knowledgeBase: politics\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(temp.path().to_path_buf()), None).unwrap();

        assert_eq!(config.workspace, temp.path());
        assert_eq!(config.rag.knowledge_base, "politics");
    }

    #[test]
    fn test_load_from_missing_config_file_fails() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = temp.path().join("nope.yaml");

        let result = AppConfig::load_from(Some(temp.path().to_path_buf()), Some(missing));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = AppConfig::default();
        config.rag.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_temperature() {
        let mut config = AppConfig::default();
        config.rag.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_defaults() {
        assert!(AppConfig::default().validate().is_ok());
    }
}
