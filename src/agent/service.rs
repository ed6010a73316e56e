//! Agent facade
//!
//! Wires the model client, the tool registry and the post composer into
//! the operations the bot and the CLI call: post creation, question
//! answering and moderation.

use std::sync::Arc;

use tracing::{info, warn};

use crate::agent::prompts;
use crate::agent::runner::{run_loop, LoopConfig};
use crate::config::TavilyConfig;
use crate::gigachat::{GenerationOptions, GigaChatClient, Message};
use crate::moderation::Verdict;
use crate::post::PostComposer;
use crate::storage::CommunityStore;
use crate::tools::{
    AnalyzeMessageTool, AnswerQuestionTool, GeneratePostTool, GetCommunityRatingTool,
    GetUserStatsTool, TavilySearchTool, ToolRegistry,
};

/// A post draft shorter than this is treated as a failed generation
const MIN_POST_LENGTH: usize = 50;

/// The community agent: one instance serves the whole bot
pub struct Agent {
    client: Arc<GigaChatClient>,
    tools: ToolRegistry,
    loop_config: LoopConfig,
    moderator: AnalyzeMessageTool,
    answerer: AnswerQuestionTool,
    composer: PostComposer,
    target_post_length: usize,
}

impl Agent {
    /// Assemble the agent with its full tool set
    pub fn new(
        client: Arc<GigaChatClient>,
        store: Arc<CommunityStore>,
        tavily: TavilyConfig,
        chat_invite_link: &str,
        target_post_length: usize,
    ) -> Self {
        let composer = PostComposer::new(chat_invite_link);

        let mut tools = ToolRegistry::new();
        tools.register(TavilySearchTool::new(tavily));
        tools.register(GeneratePostTool::new(composer.clone()));
        tools.register(AnalyzeMessageTool::new(client.clone()));
        tools.register(AnswerQuestionTool::new(client.clone()));
        tools.register(GetUserStatsTool::new(store.clone()));
        tools.register(GetCommunityRatingTool::new(store));

        Agent {
            moderator: AnalyzeMessageTool::new(client.clone()),
            answerer: AnswerQuestionTool::new(client.clone()),
            client,
            tools,
            loop_config: LoopConfig::community(),
            composer,
            target_post_length,
        }
    }

    /// Expose the registry (for the CLI tool listing)
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Create a channel post on a topic.
    ///
    /// Runs the tool-calling loop first; if the loop produces something
    /// too short or apologetic, falls back to direct generation.
    pub async fn create_post(&self, topic: &str) -> String {
        info!("Starting post generation for topic: '{}'", topic);

        let messages = vec![
            Message::system(prompts::SYSTEM_PROMPT),
            Message::user(topic),
        ];

        match run_loop(&self.client, &self.tools, messages, &self.loop_config).await {
            Ok(run) => {
                info!(
                    "Agent loop finished: outcome={:?}, iterations={}, tool_calls={}, tokens={}",
                    run.outcome, run.iterations, run.tool_calls, run.total_usage.total_tokens
                );
                let text = run.response;
                if text.chars().count() > MIN_POST_LENGTH && !text.starts_with("Извините") {
                    text
                } else {
                    warn!("Agent loop produced no usable post, generating directly");
                    self.generate_post_directly(topic).await
                }
            }
            Err(e) => {
                warn!("Agent loop failed: {}", e);
                self.generate_post_directly(topic).await
            }
        }
    }

    /// One-shot post generation without the tool loop
    pub async fn generate_post_directly(&self, topic: &str) -> String {
        info!("Direct post generation for topic: '{}'", topic);

        let prompt = prompts::direct_post_prompt(topic, self.target_post_length);
        let response = self
            .client
            .chat(vec![Message::user(prompt)], GenerationOptions::creative())
            .await;

        match response {
            Ok(body) => {
                let content = body
                    .choices
                    .first()
                    .map(|c| c.message.content.trim())
                    .unwrap_or_default();
                if content.is_empty() {
                    "Извините, не удалось сгенерировать пост.".to_string()
                } else {
                    self.composer.compose(topic, content)
                }
            }
            Err(e) => {
                warn!("Direct post generation failed: {}", e);
                format!("Извините, произошла ошибка: {}.", e)
            }
        }
    }

    /// Answer a community question
    pub async fn answer(&self, question: &str) -> String {
        self.answerer.answer(question).await
    }

    /// Moderate a chat message
    pub async fn moderate(&self, message_text: &str) -> Verdict {
        self.moderator.analyze(message_text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GigaChatConfig;
    use crate::gigachat::TokenManager;
    use crate::post::SIGNATURE;
    use secrecy::SecretString;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn unix_now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    async fn mock_oauth(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/oauth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "t1",
                "expires_at": unix_now() + 3600
            })))
            .mount(server)
            .await;
    }

    fn agent_for(server: &MockServer, dir: &tempfile::TempDir) -> Agent {
        let config = GigaChatConfig {
            client_id: SecretString::from("id"),
            client_secret: SecretString::from("secret"),
            scope: "GIGACHAT_API_PERS".to_string(),
            auth_url: format!("{}/oauth", server.uri()),
            base_url: server.uri(),
            model: "GigaChat-2".to_string(),
            timeout_secs: 5,
            verify_ssl_certs: true,
        };
        let tokens = TokenManager::new(config.clone(), dir.path().join("token.json")).unwrap();
        let client = Arc::new(GigaChatClient::new(config, tokens).unwrap());
        let store = Arc::new(CommunityStore::open(dir.path().join("community.json")));
        let tavily = TavilyConfig {
            api_key: SecretString::from("key"),
            max_results: 5,
            timeout_secs: 5,
        };
        Agent::new(client, store, tavily, "https://t.me/JekardosCoinForever", 450)
    }

    fn stop_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "model": "GigaChat-2",
            "created": 1700000000u64,
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
    }

    #[tokio::test]
    async fn long_loop_answer_is_returned_as_is() {
        let server = MockServer::start().await;
        mock_oauth(&server).await;
        let post = "Большой пост о выживании в тайге: берите с собой нож, огниво и запас еды. \
                    Jekardos Coin поддерживает путешественников.";
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(stop_body(post)))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let agent = agent_for(&server, &dir);

        let result = agent.create_post("выживание в тайге").await;
        assert_eq!(result, post);
    }

    #[tokio::test]
    async fn short_loop_answer_falls_back_to_direct_generation() {
        let server = MockServer::start().await;
        mock_oauth(&server).await;
        // First response is too short; the direct-generation call then
        // returns a proper draft
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(stop_body("коротко")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(stop_body(
                "Полноценный пост о навигации по звёздам для путешественников.",
            )))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let agent = agent_for(&server, &dir);

        let result = agent.create_post("навигация").await;
        assert!(result.starts_with("Полноценный пост"));
        assert!(result.ends_with(SIGNATURE));
    }

    #[tokio::test]
    async fn moderation_benign_on_model_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let agent = agent_for(&server, &dir);

        let verdict = agent.moderate("привет").await;
        assert!(!verdict.is_toxic);
    }

    #[tokio::test]
    async fn registry_has_all_six_tools() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let agent = agent_for(&server, &dir);

        let mut names = agent.tools().names();
        names.sort();
        assert_eq!(
            names,
            vec![
                "analyze_message",
                "answer_question",
                "generate_telegram_post",
                "get_community_rating",
                "get_user_stats",
                "web_search",
            ]
        );
    }
}
