//! Question answering tool backed by the community knowledge prompt

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info};

use super::traits::{Tool, ToolResult};
use crate::agent::prompts;
use crate::error::{Error, Result};
use crate::gigachat::{GenerationOptions, GigaChatClient, Message};

/// Answers user questions about JK Coin, TON and related topics
pub struct AnswerQuestionTool {
    client: Arc<GigaChatClient>,
}

impl AnswerQuestionTool {
    pub fn new(client: Arc<GigaChatClient>) -> Self {
        Self { client }
    }

    /// Produce an answer, degrading to a "contact the admins" message
    pub async fn answer(&self, question: &str) -> String {
        let snippet: String = question.chars().take(100).collect();
        info!("Answering question: {}...", snippet);

        let prompt = prompts::answer_prompt(question);
        let response = self
            .client
            .chat(vec![Message::user(prompt)], GenerationOptions::balanced())
            .await;

        match response {
            Ok(body) => {
                let content = body
                    .choices
                    .first()
                    .map(|c| c.message.content.trim())
                    .unwrap_or_default();
                if content.is_empty() {
                    "Не удалось сгенерировать ответ. Обратитесь к администраторам.".to_string()
                } else {
                    format!("Ответ на вопрос:\n{}", content)
                }
            }
            Err(e) => {
                error!("Failed to answer question: {}", e);
                format!("Ошибка генерации ответа: {}", e)
            }
        }
    }
}

#[async_trait]
impl Tool for AnswerQuestionTool {
    fn name(&self) -> &str {
        "answer_question"
    }

    fn description(&self) -> &str {
        "Отвечает на вопросы пользователей, используя базу знаний сообщества. \
         Используй этот инструмент для ответов на технические вопросы и FAQ."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "Вопрос пользователя"
                }
            },
            "required": ["question"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let question = args
            .get("question")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidInput("Missing 'question' parameter".to_string()))?;

        Ok(ToolResult::success(self.answer(question).await))
    }
}
