//! Configuration for the chat relay.

use config::{Config as ConfigLoader, ConfigError, Environment, File, Source};
use relay_common::GenerationConfig;
use serde::Deserialize;

/// Variables consulted, in order, when no key comes from the layered sources.
/// The second is the name existing deployments store the secret under.
pub const FALLBACK_API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GEMINI_API_KEY_CHLOE"];

/// Main configuration structure for the chat relay.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path the relay endpoint is mounted at.
    #[serde(default = "default_path")]
    pub path: String,
    /// Map request errors to 400 and provider errors to 502 instead of 500.
    #[serde(default)]
    pub sharpen_status_codes: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
            sharpen_status_codes: false,
        }
    }
}

/// Gemini provider configuration.
#[derive(Clone, Deserialize)]
pub struct ProviderConfig {
    /// Gemini API key. Absence is reported per request, not at startup.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
        }
    }
}

// Keeps the key out of logs.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl ProviderConfig {
    /// The configured key, treating an empty string as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_path() -> String {
    "/api/chat".to_string()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_model() -> String {
    "gemini-1.5-pro".to_string()
}
fn default_max_output_tokens() -> u32 {
    500
}
fn default_temperature() -> f32 {
    0.9
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (RELAY__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    ///
    /// If none of them provides an API key, the first of
    /// `FALLBACK_API_KEY_VARS` that is set is used.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::from_sources(File::with_name("config").required(false), environment())?;
        Ok(config.with_fallback_api_key(fallback_api_key(|var| std::env::var(var).ok())))
    }

    fn from_sources<F>(file: F, env: Environment) -> Result<Self, ConfigError>
    where
        F: Source + Send + Sync + 'static,
    {
        let config: Config = ConfigLoader::builder()
            // Set defaults
            .set_default("api.host", default_host())?
            .set_default("api.port", default_port() as i64)?
            .set_default("api.path", default_path())?
            .set_default("provider.base_url", default_base_url())?
            .set_default("provider.model", default_model())?
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;

        config.validate()
    }

    /// Reject values the router cannot be built with.
    fn validate(self) -> Result<Self, ConfigError> {
        if !self.api.path.starts_with('/') {
            return Err(ConfigError::Message(format!(
                "api.path must start with '/', got '{}'",
                self.api.path
            )));
        }
        Ok(self)
    }

    /// Use `key` when no non-empty API key is configured.
    pub fn with_fallback_api_key(mut self, key: Option<String>) -> Self {
        if self.provider.api_key().is_none() {
            self.provider.api_key = key.filter(|k| !k.is_empty());
        }
        self
    }
}

/// Environment variables in RELAY__SECTION__KEY format.
fn environment() -> Environment {
    Environment::with_prefix("RELAY")
        .separator("__")
        .try_parsing(true)
}

fn fallback_api_key(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    FALLBACK_API_KEY_VARS
        .iter()
        .filter_map(|var| lookup(var))
        .find(|key| !key.is_empty())
}
