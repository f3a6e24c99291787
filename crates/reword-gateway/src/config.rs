//! Service configuration.
//!
//! Values come from the process environment, after an optional `.env` file
//! has been loaded. Every setting except `OPENAI_API_KEY` has a default, and a
//! value that fails to parse falls back to that default. Replaced values are
//! kept in [`AppConfig::fallbacks`] and logged by [`AppConfig::log_fallbacks`]
//! once the subscriber is installed.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `OPENAI_API_KEY` | *(required)* |
//! | `OPENAI_BASE_URL` | `https://api.openai.com/v1` |
//! | `ASSISTANT_MODEL` | `gpt-3.5-turbo` |
//! | `MODERATOR_MODEL` | `gpt-4` |
//! | `SERVER_PORT` | `8080` |
//! | `LOG_LEVEL` | `info` |
//! | `LOG_FORMAT` | `json` |
//! | `MAX_TOKENS` | `500` |
//! | `TEMPERATURE` | `0.7` |
//! | `RATE_LIMIT_PER_MIN` | `60` |
//! | `REQUEST_TIMEOUT` | `30s` |
//! | `ENABLE_METRICS` | `true` |
//! | `CACHE_ENABLED` | `false` |
//! | `CACHE_TTL` | `1h` |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use config::{Config, Environment};
use reword_foundation::llm::OpenAiConfig;
use reword_kernel::{GenerationParams, RoleModels};
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is required")]
    MissingApiKey,

    #[error("failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),
}

/// Log output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// A variable whose value could not be parsed and was replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFallback {
    pub variable: &'static str,
    pub value: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub assistant_model: String,
    pub moderator_model: String,
    pub server_port: u16,
    pub log_level: LevelFilter,
    pub log_format: LogFormat,
    pub max_tokens: u32,
    pub temperature: f32,
    pub rate_limit_per_min: u32,
    pub request_timeout: Duration,
    pub enable_metrics: bool,
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
    /// Values replaced by defaults while loading. Loading happens before the
    /// subscriber exists, so these are reported by [`log_fallbacks`](Self::log_fallbacks).
    pub fallbacks: Vec<ConfigFallback>,
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let source = Config::builder()
            .add_source(Environment::default())
            .build()?;
        Self::from_source(&source)
    }

    /// Build from explicit `(VARIABLE, value)` pairs instead of the environment.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        for (key, value) in pairs {
            builder = builder.set_override(key.to_ascii_lowercase(), *value)?;
        }
        Self::from_source(&builder.build()?)
    }

    fn from_source(source: &Config) -> Result<Self, ConfigError> {
        let raw = |key: &str| {
            source
                .get_string(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let openai_api_key = raw("openai_api_key").ok_or(ConfigError::MissingApiKey)?;
        let mut fallbacks = Vec::new();
        let fb = &mut fallbacks;

        Ok(Self {
            openai_api_key,
            openai_base_url: raw("openai_base_url")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            assistant_model: raw("assistant_model").unwrap_or_else(|| "gpt-3.5-turbo".to_string()),
            moderator_model: raw("moderator_model").unwrap_or_else(|| "gpt-4".to_string()),
            server_port: parse_or(raw("server_port"), "SERVER_PORT", 8080, fb),
            log_level: parse_or(raw("log_level"), "LOG_LEVEL", LevelFilter::INFO, fb),
            log_format: parse_or(raw("log_format"), "LOG_FORMAT", LogFormat::Json, fb),
            max_tokens: parse_or(raw("max_tokens"), "MAX_TOKENS", 500, fb),
            temperature: parse_or(raw("temperature"), "TEMPERATURE", 0.7, fb),
            rate_limit_per_min: parse_or(raw("rate_limit_per_min"), "RATE_LIMIT_PER_MIN", 60, fb),
            request_timeout: duration_or(raw("request_timeout"), "REQUEST_TIMEOUT", Duration::from_secs(30), fb),
            enable_metrics: bool_or(raw("enable_metrics"), "ENABLE_METRICS", true, fb),
            cache_enabled: bool_or(raw("cache_enabled"), "CACHE_ENABLED", false, fb),
            cache_ttl: duration_or(raw("cache_ttl"), "CACHE_TTL", Duration::from_secs(3600), fb),
            fallbacks,
        })
    }

    /// Emit one warning per value that fell back to its default.
    pub fn log_fallbacks(&self) {
        for fallback in &self.fallbacks {
            warn!(
                variable = fallback.variable,
                value = %fallback.value,
                "invalid configuration value, using default"
            );
        }
    }

    pub fn role_models(&self) -> RoleModels {
        RoleModels::new(&self.assistant_model, &self.moderator_model)
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    pub fn openai_config(&self) -> OpenAiConfig {
        OpenAiConfig::new(&self.openai_api_key)
            .with_base_url(&self.openai_base_url)
            .with_models(self.role_models())
            .with_params(self.generation_params())
            .with_timeout(self.request_timeout)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("openai_api_key", &"<redacted>")
            .field("openai_base_url", &self.openai_base_url)
            .field("assistant_model", &self.assistant_model)
            .field("moderator_model", &self.moderator_model)
            .field("server_port", &self.server_port)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("rate_limit_per_min", &self.rate_limit_per_min)
            .field("request_timeout", &self.request_timeout)
            .field("enable_metrics", &self.enable_metrics)
            .field("cache_enabled", &self.cache_enabled)
            .field("cache_ttl", &self.cache_ttl)
            .field("fallbacks", &self.fallbacks)
            .finish()
    }
}

fn parse_or<T: FromStr>(
    raw: Option<String>,
    name: &'static str,
    default: T,
    fallbacks: &mut Vec<ConfigFallback>,
) -> T {
    let Some(value) = raw else { return default };
    match value.parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            fallbacks.push(ConfigFallback { variable: name, value });
            default
        }
    }
}

fn bool_or(
    raw: Option<String>,
    name: &'static str,
    default: bool,
    fallbacks: &mut Vec<ConfigFallback>,
) -> bool {
    let Some(value) = raw else { return default };
    match value.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => true,
        "0" | "f" | "false" | "no" | "off" => false,
        _ => {
            fallbacks.push(ConfigFallback { variable: name, value });
            default
        }
    }
}

fn duration_or(
    raw: Option<String>,
    name: &'static str,
    default: Duration,
    fallbacks: &mut Vec<ConfigFallback>,
) -> Duration {
    let Some(value) = raw else { return default };
    match humantime::parse_duration(&value) {
        Ok(parsed) => parsed,
        Err(_) => {
            fallbacks.push(ConfigFallback { variable: name, value });
            default
        }
    }
}
