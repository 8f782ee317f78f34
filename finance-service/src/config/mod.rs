//! Configuration module for finance-service.

use secrecy::Secret;
use service_core::config::{self as core_config, get_env, is_production, parse_env};
use service_core::error::AppError;
use std::env;

/// OpenRouter's OpenAI-compatible chat-completions endpoint.
pub const DEFAULT_AI_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Fast model that handles tabular statement text well.
pub const DEFAULT_AI_MODEL: &str = "google/gemini-flash-1.5";

const DEFAULT_UPLOAD_MAX_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FinanceConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub ai: AiConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

impl FinanceConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = is_production();

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "finance-service".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", 2)?,
            },
            ai: AiConfig {
                api_url: get_env("AI_API_URL", Some(DEFAULT_AI_API_URL), is_prod)?,
                api_key: Secret::new(get_env("AI_API_KEY", None, is_prod)?),
                model: get_env("AI_MODEL", Some(DEFAULT_AI_MODEL), is_prod)?,
                timeout_secs: parse_env("AI_TIMEOUT_SECS", 120)?,
            },
            upload: UploadConfig {
                max_bytes: parse_env("UPLOAD_MAX_BYTES", DEFAULT_UPLOAD_MAX_BYTES)?,
            },
        })
    }
}
