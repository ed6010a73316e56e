//! GigaChat OAuth token management
//!
//! Tokens are obtained from the OAuth endpoint with Basic-encoded
//! client credentials and cached in a single JSON file. A cached token
//! is reused until its `expires_at` (unix seconds) passes; a missing,
//! corrupt, or expired cache triggers a fresh fetch.

use crate::config::GigaChatConfig;
use crate::error::{Error, Result};
use base64::Engine;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Cached token persisted to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedToken {
    access_token: String,
    /// Expiry as unix timestamp in seconds
    expires_at: u64,
}

/// Token response from the OAuth endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_at: Option<u64>,
}

/// Manages GigaChat access tokens with file-based caching
#[derive(Clone)]
pub struct TokenManager {
    client: Client,
    config: GigaChatConfig,
    cache_path: PathBuf,
}

impl TokenManager {
    /// Create a new token manager
    pub fn new(config: GigaChatConfig, cache_path: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_ssl_certs)
            .build()?;

        Ok(TokenManager {
            client,
            config,
            cache_path: cache_path.into(),
        })
    }

    /// Get a valid access token, from cache when possible
    pub async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.cached_token() {
            debug!("Using cached GigaChat token");
            return Ok(token);
        }

        self.fetch_token().await
    }

    /// Delete the cache file so the next request fetches a fresh token
    pub fn invalidate(&self) {
        if self.cache_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.cache_path) {
                warn!("Failed to remove token cache: {}", e);
            } else {
                info!("Cached GigaChat token invalidated");
            }
        }
    }

    /// Read the cache file and return the token if it is still valid
    fn cached_token(&self) -> Option<String> {
        let raw = std::fs::read_to_string(&self.cache_path).ok()?;
        // A corrupt cache file is treated as a miss
        let cached: CachedToken = serde_json::from_str(&raw).ok()?;

        if unix_now() < cached.expires_at {
            Some(cached.access_token)
        } else {
            None
        }
    }

    /// Fetch a new token from the OAuth endpoint and cache it
    async fn fetch_token(&self) -> Result<String> {
        info!("Requesting new GigaChat token from {}", self.config.auth_url);

        let credentials = format!(
            "{}:{}",
            self.config.client_id.expose_secret(),
            self.config.client_secret.expose_secret()
        );
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());

        let response = self
            .client
            .post(&self.config.auth_url)
            .header("Authorization", format!("Basic {}", encoded))
            .header("Accept", "application/json")
            .header("RqUID", Uuid::new_v4().to_string())
            .form(&[("scope", self.config.scope.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "Token request failed ({}): {}",
                status, body
            )));
        }

        let token_data: TokenResponse = response.json().await?;

        let (access_token, expires_at) = match (token_data.access_token, token_data.expires_at) {
            (Some(token), Some(expires)) => (token, expires),
            _ => {
                return Err(Error::Auth(
                    "Token response missing access_token or expires_at".to_string(),
                ))
            }
        };

        self.write_cache(&CachedToken {
            access_token: access_token.clone(),
            expires_at,
        })?;

        info!("GigaChat token obtained and cached");
        Ok(access_token)
    }

    fn write_cache(&self, token: &CachedToken) -> Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.cache_path, serde_json::to_string(token)?)?;
        Ok(())
    }

    /// Path of the cache file
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(auth_url: String) -> GigaChatConfig {
        GigaChatConfig {
            client_id: SecretString::from("client-id"),
            client_secret: SecretString::from("client-secret"),
            scope: "GIGACHAT_API_PERS".to_string(),
            auth_url,
            base_url: "http://unused".to_string(),
            model: "GigaChat-2".to_string(),
            timeout_secs: 5,
            verify_ssl_certs: true,
        }
    }

    #[tokio::test]
    async fn fetches_and_caches_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/oauth"))
            .and(header_exists("RqUID"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh-token",
                "expires_at": unix_now() + 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token.json");
        let manager = TokenManager::new(
            test_config(format!("{}/api/v2/oauth", server.uri())),
            &cache,
        )
        .unwrap();

        let token = manager.access_token().await.unwrap();
        assert_eq!(token, "fresh-token");

        // Second call must be served from the cache (mock expects 1 hit)
        let token = manager.access_token().await.unwrap();
        assert_eq!(token, "fresh-token");
        assert!(cache.exists());
    }

    #[tokio::test]
    async fn refetches_when_cache_expired() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new-token",
                "expires_at": unix_now() + 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token.json");
        std::fs::write(
            &cache,
            serde_json::to_string(&CachedToken {
                access_token: "stale-token".to_string(),
                expires_at: unix_now() - 10,
            })
            .unwrap(),
        )
        .unwrap();

        let manager = TokenManager::new(test_config(server.uri()), &cache).unwrap();
        let token = manager.access_token().await.unwrap();
        assert_eq!(token, "new-token");
    }

    #[tokio::test]
    async fn corrupt_cache_is_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "recovered-token",
                "expires_at": unix_now() + 3600
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token.json");
        std::fs::write(&cache, "{not json").unwrap();

        let manager = TokenManager::new(test_config(server.uri()), &cache).unwrap();
        let token = manager.access_token().await.unwrap();
        assert_eq!(token, "recovered-token");
    }

    #[tokio::test]
    async fn missing_fields_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"tok": "x"})),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let manager =
            TokenManager::new(test_config(server.uri()), dir.path().join("token.json")).unwrap();
        let err = manager.access_token().await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn invalidate_removes_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token.json");
        std::fs::write(&cache, "{}").unwrap();

        let manager =
            TokenManager::new(test_config("http://unused".to_string()), &cache).unwrap();
        manager.invalidate();
        assert!(!cache.exists());
    }
}
