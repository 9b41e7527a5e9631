//! Configuration for Topogen
//!
//! Loaded from `~/.topogen/config.toml` when present, then overridden by
//! `TOPOGEN_*` environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Structured-generation provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    OpenAI,
    /// Ollama local LLM server (OpenAI-compatible API)
    #[default]
    Ollama,
}

impl std::fmt::Display for GenerationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationProvider::OpenAI => write!(f, "openai"),
            GenerationProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for GenerationProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(GenerationProvider::OpenAI),
            "ollama" => Ok(GenerationProvider::Ollama),
            _ => Err(format!("Unknown provider type: {}", s)),
        }
    }
}

/// Generative backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: GenerationProvider,
    #[serde(default = "default_model")]
    pub model: String,
    /// Overrides the provider's default chat-completions URL
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-oss".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    600
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::default(),
            model: default_model(),
            endpoint: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Topology service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct TopologyServiceConfig {
    #[serde(default = "default_topology_url")]
    pub base_url: String,
    #[serde(default = "default_generate_path")]
    pub generate_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_topology_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_generate_path() -> String {
    "/api/topology/generate".to_string()
}

impl Default for TopologyServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_topology_url(),
            generate_path: default_generate_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Half-open placement rectangle, `[x_min, x_max) x [y_min, y_max)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
pub struct CanvasBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for CanvasBounds {
    fn default() -> Self {
        Self {
            x_min: 200.0,
            x_max: 600.0,
            y_min: 200.0,
            y_max: 500.0,
        }
    }
}

/// Placement and naming of generated entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct LayoutConfig {
    #[serde(default)]
    pub canvas: CanvasBounds,
    /// Synthetic domain appended to generated hostnames
    #[serde(default = "default_domain_suffix")]
    pub domain_suffix: String,
}

fn default_domain_suffix() -> String {
    "local".to_string()
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasBounds::default(),
            domain_suffix: default_domain_suffix(),
        }
    }
}

/// How overlapping expansion calls for the same entity are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionGuard {
    /// Serialize calls per entity id and reuse the first result
    #[default]
    PerEntity,
    /// No coordination; the last attachment wins
    LastWriteWins,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ExpansionConfig {
    #[serde(default)]
    pub guard: ExpansionGuard,
    /// Used when an organization declares no core functions
    #[serde(default = "default_core_functions")]
    pub default_core_functions: Vec<String>,
}

fn default_core_functions() -> Vec<String> {
    vec!["general business operations".to_string()]
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            guard: ExpansionGuard::default(),
            default_core_functions: default_core_functions(),
        }
    }
}

/// Largest seed TOML can represent (its integers are signed 64-bit)
pub const MAX_SEED: u64 = i64::MAX as u64;

/// Core configuration for Topogen
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
pub struct TopogenConfig {
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub topology: TopologyServiceConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub expansion: ExpansionConfig,
    /// Seed for layout and addressing; OS entropy when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

impl TopogenConfig {
    /// Default config file location, `~/.topogen/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".topogen")
            .join("config.toml")
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path`, or return defaults if the file does not exist
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` (or the default location) and apply env overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `TOPOGEN_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("TOPOGEN_LLM_PROVIDER") {
            self.generation.provider = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "TOPOGEN_LLM_PROVIDER".to_string(),
                value,
            })?;
        }
        if let Some(value) = lookup("TOPOGEN_LLM_MODEL") {
            self.generation.model = value;
        }
        if let Some(value) = lookup("TOPOGEN_LLM_ENDPOINT") {
            self.generation.endpoint = Some(value);
        }
        if let Some(value) = lookup("TOPOGEN_TOPOLOGY_URL") {
            self.topology.base_url = value;
        }
        if let Some(value) = lookup("TOPOGEN_SEED") {
            let seed = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "TOPOGEN_SEED".to_string(),
                value,
            })?;
            self.set_seed(seed)?;
        }
        Ok(())
    }

    /// Set the seed, rejecting values a TOML file cannot hold
    pub fn set_seed(&mut self, seed: u64) -> Result<(), ConfigError> {
        if seed > MAX_SEED {
            return Err(ConfigError::InvalidValue {
                key: "seed".to_string(),
                value: seed.to_string(),
            });
        }
        self.seed = Some(seed);
        Ok(())
    }
}
