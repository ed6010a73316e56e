//! Post generation tool
//!
//! Terminal tool: once it runs successfully the agent loop ends and its
//! output is returned to the user as the final draft.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::traits::{Tool, ToolResult};
use crate::error::{Error, Result};
use crate::post::PostComposer;

/// Name under which the tool is registered (also listed as terminal in
/// the loop config)
pub const GENERATE_POST_TOOL: &str = "generate_telegram_post";

/// Composes the final channel post from model-provided content
pub struct GeneratePostTool {
    composer: PostComposer,
}

impl GeneratePostTool {
    /// Create the tool around a configured composer
    pub fn new(composer: PostComposer) -> Self {
        Self { composer }
    }
}

#[async_trait]
impl Tool for GeneratePostTool {
    fn name(&self) -> &str {
        GENERATE_POST_TOOL
    }

    fn description(&self) -> &str {
        "Генерирует ФИНАЛЬНЫЙ черновик поста для Telegram-канала на заданную тему. \
         Параметр 'content_ideas' ДОЛЖЕН содержать ВЕСЬ основной текст поста, включая \
         его главный заголовок. Пост автоматически дополняется призывом к действию, \
         хештегами и подписью. После вызова этого инструмента работа агента завершена, \
         и сгенерированный пост возвращается как окончательный результат."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "topic": {
                    "type": "string",
                    "description": "Тема поста"
                },
                "content_ideas": {
                    "type": "string",
                    "description": "Полный основной текст поста, включая заголовок"
                }
            },
            "required": ["topic"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let topic = args
            .get("topic")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidInput("Missing 'topic' parameter".to_string()))?;
        let content_ideas = args
            .get("content_ideas")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        info!(
            "Composing post for topic '{}' ({} chars of content)",
            topic,
            content_ideas.chars().count()
        );

        if content_ideas.trim().is_empty() {
            warn!("Model called the post tool without content_ideas");
        }

        let post = self.composer.compose(topic, content_ideas);

        info!("Post composed, final length: {} chars", post.chars().count());
        Ok(ToolResult::success(post))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::{EMPTY_CONTENT_APOLOGY, SIGNATURE};

    fn tool() -> GeneratePostTool {
        GeneratePostTool::new(PostComposer::new("https://t.me/JekardosCoinForever"))
    }

    #[tokio::test]
    async fn composes_full_post() {
        let result = tool()
            .execute(serde_json::json!({
                "topic": "поход",
                "content_ideas": "Готовимся к походу: список снаряжения и советы."
            }))
            .await
            .unwrap();

        assert!(result.success);
        let post = result.content.unwrap();
        assert!(post.starts_with("Готовимся к походу"));
        assert!(post.ends_with(SIGNATURE));
    }

    #[tokio::test]
    async fn empty_content_yields_apology() {
        let result = tool()
            .execute(serde_json::json!({"topic": "поход"}))
            .await
            .unwrap();
        assert_eq!(result.content.as_deref(), Some(EMPTY_CONTENT_APOLOGY));
    }

    #[tokio::test]
    async fn missing_topic_is_invalid_input() {
        let err = tool()
            .execute(serde_json::json!({"content_ideas": "текст"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
