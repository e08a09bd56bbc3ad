use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for crate::ArchGraphError {
    fn from(err: ConfigError) -> Self {
        crate::ArchGraphError::Config(err.to_string())
    }
}

/// Main configuration for ArchGraph
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArchGraphConfig {
    /// Text-completion service used by the coverage gate
    #[serde(default)]
    pub llm: LLMConfig,

    /// Thresholds and limits for topology inference
    #[serde(default)]
    pub topology: TopologyConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// LLM configuration for the gated inference loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Enable external inference (false = deterministic stages only)
    #[serde(default)]
    pub enabled: bool,

    /// LLM provider: "openai", "ollama", "lmstudio", "openai-compatible"
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Model identifier
    #[serde(default)]
    pub model: Option<String>,

    /// Base URL override for OpenAI-compatible endpoints
    #[serde(default)]
    pub base_url: Option<String>,

    /// API key (OpenAI or authenticated gateways)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Context window size
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Transport-level retries per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_llm_provider(),
            model: None,
            base_url: None,
            api_key: None,
            context_window: default_context_window(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Coverage thresholds and builder limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Target ratio of relationship pairs covered by an interaction, in [0, 1]
    #[serde(default = "default_min_rel_coverage")]
    pub min_rel_coverage: f64,

    /// Maximum gate-loop iterations
    #[serde(default = "default_max_gate_retries")]
    pub max_gate_retries: u32,

    /// Cap on callee names retained per interaction
    #[serde(default = "default_max_symbols")]
    pub max_symbols_per_interaction: usize,

    /// Relationship edges and member symbols sampled per side for inference context
    #[serde(default = "default_context_samples")]
    pub context_samples: usize,

    /// Maximum interactions per atomic flow
    #[serde(default = "default_max_flow_length")]
    pub max_flow_length: usize,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            min_rel_coverage: default_min_rel_coverage(),
            max_gate_retries: default_max_gate_retries(),
            max_symbols_per_interaction: default_max_symbols(),
            context_samples: default_context_samples(),
            max_flow_length: default_max_flow_length(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_context_window() -> usize {
    128000
}
fn default_max_tokens() -> usize {
    4096
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    2
}
fn default_min_rel_coverage() -> f64 {
    0.9
}
fn default_max_gate_retries() -> u32 {
    3
}
fn default_max_symbols() -> usize {
    20
}
fn default_context_samples() -> usize {
    5
}
fn default_max_flow_length() -> usize {
    3
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// Configuration manager with file discovery and environment overrides
pub struct ConfigManager {
    config: ArchGraphConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.archgraph.toml)
    /// 3. Sensible defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        let config = Self::apply_env_overrides(config, |key| std::env::var(key).ok());
        Self::validate_config(&config)?;

        info!(
            config_file = ?config_path,
            llm_enabled = config.llm.enabled,
            min_rel_coverage = config.topology.min_rel_coverage,
            max_gate_retries = config.topology.max_gate_retries,
            "Configuration loaded"
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load an explicit config file; environment overrides still apply.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let config = Self::read_toml_file(path)?;
        let config = Self::apply_env_overrides(config, |key| std::env::var(key).ok());
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    pub fn config(&self) -> &ArchGraphConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn into_config(self) -> ArchGraphConfig {
        self.config
    }

    /// Load .env file if it exists
    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".archgraph.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .archgraph.env: {}", e);
                }
            }
        }
    }

    /// Find and load config file
    /// Search order:
    /// 1. ./.archgraph.toml (current directory)
    /// 2. ~/.archgraph/config.toml (user config)
    /// 3. Use defaults
    fn load_config_file() -> Result<(ArchGraphConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".archgraph.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".archgraph").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        info!("No config file found, using defaults");
        Ok((ArchGraphConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<ArchGraphConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply environment variable overrides from `lookup`.
    pub fn apply_env_overrides<F>(mut config: ArchGraphConfig, lookup: F) -> ArchGraphConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("ARCHGRAPH_LLM_PROVIDER") {
            config.llm.provider = provider;
            config.llm.enabled = true;
        }
        if let Some(model) = lookup("ARCHGRAPH_LLM_MODEL") {
            config.llm.model = Some(model);
        }
        if let Some(url) = lookup("ARCHGRAPH_LLM_BASE_URL") {
            config.llm.base_url = Some(url);
        }
        if let Some(key) = lookup("ARCHGRAPH_LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Some(raw) = lookup("ARCHGRAPH_MIN_REL_COVERAGE") {
            match raw.parse::<f64>() {
                Ok(v) => config.topology.min_rel_coverage = v,
                Err(_) => warn!("Ignoring invalid ARCHGRAPH_MIN_REL_COVERAGE: {}", raw),
            }
        }
        if let Some(raw) = lookup("ARCHGRAPH_MAX_GATE_RETRIES") {
            match raw.parse::<u32>() {
                Ok(v) => config.topology.max_gate_retries = v,
                Err(_) => warn!("Ignoring invalid ARCHGRAPH_MAX_GATE_RETRIES: {}", raw),
            }
        }
        if let Some(level) = lookup("ARCHGRAPH_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = lookup("ARCHGRAPH_LOG_FORMAT") {
            config.logging.format = format;
        }
        config
    }

    pub fn validate_config(config: &ArchGraphConfig) -> Result<(), ConfigError> {
        let topology = &config.topology;
        if !(0.0..=1.0).contains(&topology.min_rel_coverage) {
            return Err(ConfigError::ValidationError(format!(
                "min_rel_coverage must be within [0, 1], got {}",
                topology.min_rel_coverage
            )));
        }
        if topology.max_gate_retries == 0 {
            return Err(ConfigError::ValidationError(
                "max_gate_retries must be at least 1".to_string(),
            ));
        }
        if topology.max_flow_length == 0 {
            return Err(ConfigError::ValidationError(
                "max_flow_length must be at least 1".to_string(),
            ));
        }
        if config.llm.enabled && config.llm.model.is_none() {
            return Err(ConfigError::ValidationError(
                "llm.model is required when llm.enabled = true".to_string(),
            ));
        }
        Ok(())
    }
}
