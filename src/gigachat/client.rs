//! GigaChat chat-completions client

use crate::config::GigaChatConfig;
use crate::error::{Error, Result};
use crate::gigachat::auth::TokenManager;
use crate::gigachat::types::*;
use reqwest::Client;
use tracing::{debug, info, warn};

/// GigaChat API client
///
/// Wraps the chat-completions endpoint with Bearer authentication.
/// On a 401 response the cached token is invalidated and the request
/// retried once with a fresh token.
#[derive(Clone)]
pub struct GigaChatClient {
    client: Client,
    config: GigaChatConfig,
    tokens: TokenManager,
}

impl GigaChatClient {
    /// Create a new GigaChat client
    pub fn new(config: GigaChatConfig, tokens: TokenManager) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_ssl_certs)
            .build()?;

        Ok(GigaChatClient {
            client,
            config,
            tokens,
        })
    }

    /// Get the configured model
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Access the token manager (for CLI token commands)
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Create a chat completion
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        options: GenerationOptions,
    ) -> Result<ChatCompletionResponse> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            stream: Some(false),
            tools: None,
            tool_choice: None,
        };

        self.send_request(request).await
    }

    /// Create a chat completion with tools/functions
    pub async fn chat_with_tools(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        options: GenerationOptions,
    ) -> Result<ChatCompletionResponse> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            stream: Some(false),
            tools: Some(tools),
            tool_choice: Some(ToolChoice::Mode("auto".to_string())),
        };

        self.send_request(request).await
    }

    /// Send a request, refreshing the token once on 401
    async fn send_request(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        match self.send_once(&request).await {
            Err(Error::Unauthorized(msg)) => {
                warn!("GigaChat rejected token ({}), refreshing and retrying", msg);
                self.tokens.invalidate();
                self.send_once(&request).await
            }
            other => other,
        }
    }

    async fn send_once(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let token = self.tokens.access_token().await?;

        debug!("Sending request to GigaChat: model={}", request.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            let body = response.json::<ChatCompletionResponse>().await?;

            if let Some(ref usage) = body.usage {
                info!(
                    "GigaChat response: model={}, tokens={}",
                    body.model, usage.total_tokens
                );
            }

            Ok(body)
        } else {
            let error_text = response.text().await.unwrap_or_default();

            match status.as_u16() {
                401 => Err(Error::Unauthorized(error_text)),
                429 => {
                    warn!("Rate limit exceeded: {}", error_text);
                    Err(Error::RateLimit(error_text))
                }
                _ => Err(Error::GigaChat(format!(
                    "API error ({}): {}",
                    status, error_text
                ))),
            }
        }
    }
}
