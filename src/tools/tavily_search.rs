//! Tavily web search tool
//!
//! Web search using the Tavily Search API. The model gets the first
//! three result snippets joined with newlines.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use super::traits::{Tool, ToolResult};
use crate::config::TavilyConfig;
use crate::error::{Error, Result};

/// Tavily search endpoint
const TAVILY_API_URL: &str = "https://api.tavily.com/search";

/// How many snippets are forwarded to the model
const SNIPPET_LIMIT: usize = 3;

/// Tavily API response structures
#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    content: String,
}

/// Web search tool backed by Tavily
pub struct TavilySearchTool {
    client: Client,
    config: TavilyConfig,
    base_url: String,
}

impl TavilySearchTool {
    /// Create a new Tavily search tool
    pub fn new(config: TavilyConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            config,
            base_url: TAVILY_API_URL.to_string(),
        }
    }

    /// Override the API endpoint (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Perform a web search, returning non-empty snippets
    async fn search(&self, query: &str) -> Result<Vec<String>> {
        let body = serde_json::json!({
            "api_key": self.config.api_key.expose_secret(),
            "query": query,
            "max_results": self.config.max_results,
        });

        let response = self.client.post(&self.base_url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Search(format!(
                "Tavily request failed ({}): {}",
                status, text
            )));
        }

        let parsed: TavilyResponse = response.json().await?;

        Ok(parsed
            .results
            .into_iter()
            .map(|r| r.content)
            .filter(|c| !c.is_empty())
            .collect())
    }
}

#[async_trait]
impl Tool for TavilySearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Выполняет поиск в интернете по заданному запросу. Используй этот инструмент, \
         когда нужна актуальная информация, которой нет в базовых знаниях."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Поисковый запрос"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidInput("Missing 'query' parameter".to_string()))?;

        info!("Running web search: {}", query);

        match self.search(query).await {
            Ok(snippets) if snippets.is_empty() => {
                Ok(ToolResult::success("Поиск не дал релевантных результатов."))
            }
            Ok(snippets) => Ok(ToolResult::success(
                snippets
                    .iter()
                    .take(SNIPPET_LIMIT)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n"),
            )),
            Err(e) => {
                warn!("Web search failed: {}", e);
                Ok(ToolResult::failure("Не удалось выполнить поиск в интернете."))
            }
        }
    }
}
