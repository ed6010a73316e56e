//! Message moderation tool
//!
//! Sends the moderation prompt to the model and returns the toxicity
//! verdict as JSON. Any model or parse failure degrades to a benign
//! verdict so moderation never blocks the chat.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info};

use super::traits::{Tool, ToolResult};
use crate::agent::prompts;
use crate::error::{Error, Result};
use crate::gigachat::{GenerationOptions, GigaChatClient, Message};
use crate::moderation::{parse_verdict, Verdict};

/// Analyzes chat messages for toxicity
pub struct AnalyzeMessageTool {
    client: Arc<GigaChatClient>,
}

impl AnalyzeMessageTool {
    pub fn new(client: Arc<GigaChatClient>) -> Self {
        Self { client }
    }

    /// Obtain a verdict for a message, falling back to benign on failure
    pub async fn analyze(&self, message_text: &str) -> Verdict {
        let snippet: String = message_text.chars().take(100).collect();
        info!("Analyzing message: '{}...'", snippet);

        let prompt = prompts::moderation_prompt(message_text);
        let response = self
            .client
            .chat(vec![Message::user(prompt)], GenerationOptions::precise())
            .await;

        match response {
            Ok(body) => {
                let content = body
                    .choices
                    .first()
                    .map(|c| c.message.content.as_str())
                    .unwrap_or_default();
                if content.is_empty() {
                    return Verdict::fallback("Не удалось получить ответ от модели.");
                }
                let verdict = parse_verdict(content);
                info!("Moderation verdict: {:?}", verdict);
                verdict
            }
            Err(e) => {
                error!("Message analysis failed: {}", e);
                Verdict::fallback(format!("Исключение при анализе: {}", e))
            }
        }
    }
}

#[async_trait]
impl Tool for AnalyzeMessageTool {
    fn name(&self) -> &str {
        "analyze_message"
    }

    fn description(&self) -> &str {
        "Анализирует сообщение на токсичность, спам и неадекватное поведение. \
         Используй этот инструмент для модерации сообщений в чате."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message_text": {
                    "type": "string",
                    "description": "Текст сообщения для анализа"
                }
            },
            "required": ["message_text"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let message_text = args
            .get("message_text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidInput("Missing 'message_text' parameter".to_string()))?;

        let verdict = self.analyze(message_text).await;
        Ok(ToolResult::success(serde_json::to_string(&verdict)?))
    }
}
