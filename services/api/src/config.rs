use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// OpenAI-compatible providers the evaluator can talk to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
}

impl Provider {
    fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "gemini" => Provider::Gemini,
            _ => Provider::OpenAI,
        }
    }

    pub fn api_base(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1/",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    fn key_var(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub chat_model: String,
    pub log_level: Level,
    pub prompts_path: PathBuf,
    /// When set, the offline evaluator answers every call and no key is needed.
    pub demo_mode: bool,
    pub fallback_seed: Option<u64>,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Parses an optional variable, reporting the variable name on failure.
fn parse_var<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("'{raw}': {e}"))),
        Err(_) => Ok(None),
    }
}

fn parse_flag(name: &str) -> Result<bool, ConfigError> {
    let Ok(raw) = env::var(name) else {
        return Ok(false);
    };
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("'{raw}' is not a boolean"),
        )),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address =
            parse_var::<SocketAddr>("BIND_ADDRESS")?.unwrap_or_else(|| ([0, 0, 0, 0], 3000).into());
        let log_level = parse_var::<Level>("RUST_LOG")?.unwrap_or(Level::INFO);

        let config = Self {
            bind_address,
            provider: Provider::from_name(&var_or("LLM_PROVIDER", "openai")),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
            chat_model: var_or("CHAT_MODEL", "gpt-4o"),
            log_level,
            prompts_path: PathBuf::from(var_or("PROMPTS_PATH", "./prompts")),
            demo_mode: parse_flag("DEMO_MODE")?,
            fallback_seed: parse_var::<u64>("FALLBACK_SEED")?,
        };

        if !config.demo_mode && config.api_key().is_none() {
            return Err(ConfigError::MissingVar(format!(
                "{} must be set for '{:?}' provider unless DEMO_MODE is on",
                config.provider.key_var(),
                config.provider
            )));
        }
        Ok(config)
    }

    /// The key for the configured provider, if one was supplied.
    pub fn api_key(&self) -> Option<&str> {
        match self.provider {
            Provider::OpenAI => self.openai_api_key.as_deref(),
            Provider::Gemini => self.gemini_api_key.as_deref(),
        }
    }
}
