//! Community statistics tools
//!
//! Two thin tools over the community store: per-user stats and the
//! top-10 activity rating.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::traits::{Tool, ToolResult};
use crate::error::{Error, Result};
use crate::storage::CommunityStore;

/// Returns the formatted stats block for a single user
pub struct GetUserStatsTool {
    store: Arc<CommunityStore>,
}

impl GetUserStatsTool {
    pub fn new(store: Arc<CommunityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetUserStatsTool {
    fn name(&self) -> &str {
        "get_user_stats"
    }

    fn description(&self) -> &str {
        "Получает статистику пользователя из базы данных. \
         Используй этот инструмент для получения информации об активности пользователя."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "user_id": {
                    "type": "string",
                    "description": "Telegram ID пользователя"
                }
            },
            "required": ["user_id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        // Models send IDs as strings or numbers interchangeably
        let user_id = match args.get("user_id") {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
        .ok_or_else(|| Error::InvalidInput("Missing or invalid 'user_id' parameter".to_string()))?;

        info!("Fetching stats for user {}", user_id);
        Ok(ToolResult::success(self.store.user_stats(user_id)))
    }
}

/// Returns the formatted top-10 activity rating
pub struct GetCommunityRatingTool {
    store: Arc<CommunityStore>,
}

impl GetCommunityRatingTool {
    pub fn new(store: Arc<CommunityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetCommunityRatingTool {
    fn name(&self) -> &str {
        "get_community_rating"
    }

    fn description(&self) -> &str {
        "Получает рейтинг сообщества (топ-10 активных участников). \
         Используй этот инструмент для отображения рейтинга активности."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: Value) -> Result<ToolResult> {
        info!("Fetching community rating");
        Ok(ToolResult::success(self.store.community_rating()))
    }
}
