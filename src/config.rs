//! Configuration management for JK Hub
//!
//! Loads configuration from environment variables (and a `.env` file
//! when present).

use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;

/// GigaChat API configuration
#[derive(Debug, Clone)]
pub struct GigaChatConfig {
    /// OAuth client ID
    pub client_id: SecretString,
    /// OAuth client secret
    pub client_secret: SecretString,
    /// OAuth scope (e.g. GIGACHAT_API_PERS)
    pub scope: String,
    /// OAuth token endpoint
    pub auth_url: String,
    /// Base URL for the chat completions API
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Verify TLS certificates (the GigaChat endpoints use the Russian
    /// trusted root CA, which is absent from most cert stores)
    pub verify_ssl_certs: bool,
}

/// Tavily web search configuration
#[derive(Debug, Clone)]
pub struct TavilyConfig {
    /// API key for Tavily Search
    pub api_key: SecretString,
    /// Maximum results requested per search
    pub max_results: u8,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Telegram bot configuration
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token from BotFather
    pub bot_token: SecretString,
    /// Channel ID posts are published to (e.g. "@jekardos" or "-100...")
    pub channel_id: Option<String>,
    /// Invite link advertised in generated posts
    pub chat_invite_link: String,
}

/// Post generation configuration
#[derive(Debug, Clone)]
pub struct PostConfig {
    /// Target post length requested from the model
    pub max_post_length: usize,
}

/// File storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Published post history file
    pub history_file: PathBuf,
    /// Community store file (users, counters)
    pub community_file: PathBuf,
    /// GigaChat token cache file
    pub token_cache_file: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level filter
    pub level: String,
    /// Log format (pretty, json)
    pub format: String,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// GigaChat settings
    pub gigachat: GigaChatConfig,
    /// Tavily search settings
    pub tavily: TavilyConfig,
    /// Telegram bot settings
    pub telegram: TelegramConfig,
    /// Post generation settings
    pub post: PostConfig,
    /// File storage settings
    pub storage: StorageConfig,
    /// Logging settings
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Ok(Config {
            gigachat: GigaChatConfig {
                client_id: SecretString::from(std::env::var("GIGACHAT_CLIENT_ID")?),
                client_secret: SecretString::from(std::env::var("GIGACHAT_CLIENT_SECRET")?),
                scope: std::env::var("GIGACHAT_SCOPE")
                    .unwrap_or_else(|_| "GIGACHAT_API_PERS".to_string()),
                auth_url: std::env::var("GIGACHAT_AUTH_URL").unwrap_or_else(|_| {
                    "https://ngw.devices.sberbank.ru:9443/api/v2/oauth".to_string()
                }),
                base_url: std::env::var("GIGACHAT_API_BASE").unwrap_or_else(|_| {
                    "https://gigachat.devices.sberbank.ru/api/v1".to_string()
                }),
                model: std::env::var("GIGACHAT_MODEL_NAME")
                    .unwrap_or_else(|_| "GigaChat-2".to_string()),
                timeout_secs: std::env::var("GIGACHAT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
                verify_ssl_certs: std::env::var("GIGACHAT_VERIFY_SSL_CERTS")
                    .map(|v| v.to_lowercase() == "true")
                    .unwrap_or(false),
            },
            tavily: TavilyConfig {
                api_key: SecretString::from(std::env::var("TAVILY_API_KEY")?),
                max_results: std::env::var("TAVILY_MAX_RESULTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
                timeout_secs: std::env::var("TAVILY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            },
            telegram: TelegramConfig {
                bot_token: SecretString::from(std::env::var("TELEGRAM_BOT_TOKEN")?),
                channel_id: std::env::var("TELEGRAM_CHANNEL_ID").ok(),
                chat_invite_link: std::env::var("TELEGRAM_CHAT_INVITE_LINK")
                    .unwrap_or_else(|_| "https://t.me/JekardosCoinForever".to_string()),
            },
            post: PostConfig {
                max_post_length: std::env::var("MAX_POST_LENGTH")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(450),
            },
            storage: StorageConfig {
                history_file: PathBuf::from(
                    std::env::var("POST_HISTORY_FILE")
                        .unwrap_or_else(|_| "published_posts.json".to_string()),
                ),
                community_file: PathBuf::from(
                    std::env::var("COMMUNITY_FILE")
                        .unwrap_or_else(|_| "community_store.json".to_string()),
                ),
                token_cache_file: PathBuf::from(
                    std::env::var("TOKEN_CACHE_FILE")
                        .unwrap_or_else(|_| "gigachat_token_cache.json".to_string()),
                ),
            },
            log: LogConfig {
                level: std::env::var("RUST_LOG")
                    .unwrap_or_else(|_| "info,jk_hub=debug".to_string()),
                format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            },
        })
    }

    /// Create a minimal config for tests and CLI commands that don't
    /// need real credentials
    pub fn minimal() -> Self {
        Config {
            gigachat: GigaChatConfig {
                client_id: SecretString::from(""),
                client_secret: SecretString::from(""),
                scope: "GIGACHAT_API_PERS".to_string(),
                auth_url: "https://ngw.devices.sberbank.ru:9443/api/v2/oauth".to_string(),
                base_url: "https://gigachat.devices.sberbank.ru/api/v1".to_string(),
                model: "GigaChat-2".to_string(),
                timeout_secs: 120,
                verify_ssl_certs: false,
            },
            tavily: TavilyConfig {
                api_key: SecretString::from(""),
                max_results: 5,
                timeout_secs: 30,
            },
            telegram: TelegramConfig {
                bot_token: SecretString::from(""),
                channel_id: None,
                chat_invite_link: "https://t.me/JekardosCoinForever".to_string(),
            },
            post: PostConfig {
                max_post_length: 450,
            },
            storage: StorageConfig {
                history_file: PathBuf::from("published_posts.json"),
                community_file: PathBuf::from("community_store.json"),
                token_cache_file: PathBuf::from("gigachat_token_cache.json"),
            },
            log: LogConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    /// Validate that all required configuration is present
    pub fn validate(&self) -> Result<()> {
        if self.gigachat.client_id.expose_secret().is_empty()
            || self.gigachat.client_secret.expose_secret().is_empty()
        {
            return Err(Error::Config(
                "GIGACHAT_CLIENT_ID and GIGACHAT_CLIENT_SECRET are required".to_string(),
            ));
        }
        if self.tavily.api_key.expose_secret().is_empty() {
            return Err(Error::Config("TAVILY_API_KEY is required".to_string()));
        }
        if self.telegram.bot_token.expose_secret().is_empty() {
            return Err(Error::Config("TELEGRAM_BOT_TOKEN is required".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_fails_validation() {
        let config = Config::minimal();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::minimal();
        assert_eq!(config.post.max_post_length, 450);
        assert_eq!(config.tavily.max_results, 5);
        assert_eq!(
            config.storage.token_cache_file,
            PathBuf::from("gigachat_token_cache.json")
        );
    }
}
