//! Bounded tool-calling loop
//!
//! Calls the model, executes requested tools, feeds results back, and
//! repeats until the model stops, a terminal tool fires, or a limit is
//! hit. Terminal tools end the loop immediately with their output as
//! the final response.

use tracing::{debug, info, warn};

use crate::agent::loop_guard::LoopGuard;
use crate::error::Result;
use crate::gigachat::{GenerationOptions, GigaChatClient, Message, Usage};
use crate::tools::{ToolCall, ToolRegistry};

/// Limits and behavior of one loop run
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Maximum model round-trips before the loop is stopped
    pub max_iterations: u32,
    /// Maximum total tool calls across all iterations
    pub max_tool_calls: u32,
    /// Generation options for every model call
    pub generation_options: GenerationOptions,
    /// Text returned when the loop exits without a final response
    pub fallback_message: String,
    /// Tools whose successful result ends the loop immediately
    pub terminal_tools: Vec<String>,
}

impl LoopConfig {
    /// Limits used by the community agent
    pub fn community() -> Self {
        Self {
            max_iterations: 20,
            max_tool_calls: 15,
            generation_options: GenerationOptions::balanced(),
            fallback_message: "Извините, агент не смог сгенерировать пост.".to_string(),
            terminal_tools: vec![crate::tools::GENERATE_POST_TOOL.to_string()],
        }
    }
}

/// How a loop run finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// Model produced a final answer without further tool calls
    Completed,
    /// A terminal tool produced the final answer
    TerminalTool(String),
    /// Hit `max_iterations` without a stop signal
    MaxIterationsExceeded,
    /// Model returned no choices or empty content
    EmptyResponse,
    /// Model API returned an error
    LlmError(String),
}

/// Result of a loop run
pub struct LoopRun {
    /// Final response text
    pub response: String,
    /// How the loop ended
    pub outcome: LoopOutcome,
    /// Iterations consumed
    pub iterations: u32,
    /// Tool calls made
    pub tool_calls: u32,
    /// Token usage accumulated across all model calls
    pub total_usage: Usage,
}

/// Run the tool-calling loop over a prepared conversation
pub async fn run_loop(
    client: &GigaChatClient,
    tools: &ToolRegistry,
    mut messages: Vec<Message>,
    config: &LoopConfig,
) -> Result<LoopRun> {
    let tool_definitions = tools.definitions();

    let mut iteration: u32 = 0;
    let mut tool_calls_made: u32 = 0;
    let mut loop_guard = LoopGuard::default();
    let mut total_usage = Usage::default();

    loop {
        iteration += 1;
        info!("Agent loop iteration {}/{}", iteration, config.max_iterations);

        if iteration > config.max_iterations {
            warn!("Agent loop exceeded max iterations");
            return Ok(LoopRun {
                response: config.fallback_message.clone(),
                outcome: LoopOutcome::MaxIterationsExceeded,
                iterations: iteration - 1,
                tool_calls: tool_calls_made,
                total_usage,
            });
        }

        let use_tools = tool_calls_made < config.max_tool_calls && !tool_definitions.is_empty();

        let response = if use_tools {
            client
                .chat_with_tools(
                    messages.clone(),
                    tool_definitions.clone(),
                    config.generation_options.clone(),
                )
                .await
        } else {
            client
                .chat(messages.clone(), config.generation_options.clone())
                .await
        };

        let response = match response {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Model call failed in agent loop: {}", e);
                return Ok(LoopRun {
                    response: config.fallback_message.clone(),
                    outcome: LoopOutcome::LlmError(e.to_string()),
                    iterations: iteration,
                    tool_calls: tool_calls_made,
                    total_usage,
                });
            }
        };

        if let Some(ref usage) = response.usage {
            total_usage.prompt_tokens += usage.prompt_tokens;
            total_usage.completion_tokens += usage.completion_tokens;
            total_usage.total_tokens += usage.total_tokens;
        }

        let Some(choice) = response.choices.first() else {
            return Ok(LoopRun {
                response: config.fallback_message.clone(),
                outcome: LoopOutcome::EmptyResponse,
                iterations: iteration,
                tool_calls: tool_calls_made,
                total_usage,
            });
        };

        // Tool calls requested by the model
        if use_tools {
            if let Some(requested) = choice.message.tool_calls.clone().filter(|c| !c.is_empty()) {
                info!(
                    "Model requested {} tool calls (total so far: {})",
                    requested.len(),
                    tool_calls_made
                );
                messages.push(choice.message.clone());

                for tc in &requested {
                    // The budget caps executed calls even within one batch;
                    // the model still gets a result for every call id.
                    if tool_calls_made >= config.max_tool_calls {
                        warn!(
                            "Tool call budget exhausted, skipping {}",
                            tc.function.name
                        );
                        messages.push(Message::tool(
                            &tc.id,
                            "Лимит вызовов инструментов исчерпан.",
                        ));
                        continue;
                    }
                    tool_calls_made += 1;

                    let args: serde_json::Value = serde_json::from_str(&tc.function.arguments)
                        .unwrap_or_else(|e| {
                            warn!(
                                "Unparseable arguments for tool {}: {}",
                                tc.function.name, e
                            );
                            serde_json::json!({})
                        });

                    info!(
                        "Executing tool: {} (call #{}/{})",
                        tc.function.name, tool_calls_made, config.max_tool_calls
                    );

                    let call = ToolCall {
                        id: tc.id.clone(),
                        name: tc.function.name.clone(),
                        arguments: args,
                    };

                    let rendered = match tools.execute(&call).await {
                        Ok(result) => {
                            // A terminal tool's success is the final answer
                            if result.success
                                && config.terminal_tools.iter().any(|t| t == &call.name)
                            {
                                let response = result.content.unwrap_or_default();
                                info!("Terminal tool '{}' ended the loop", call.name);
                                return Ok(LoopRun {
                                    response,
                                    outcome: LoopOutcome::TerminalTool(call.name),
                                    iterations: iteration,
                                    tool_calls: tool_calls_made,
                                    total_usage,
                                });
                            }
                            result.to_string()
                        }
                        Err(e) => {
                            warn!("Tool {} failed: {}", call.name, e);
                            format!("Tool error: {}", e)
                        }
                    };

                    debug!("Tool {} result: {}", call.name, rendered);
                    messages.push(Message::tool(&tc.id, &rendered));

                    if let Some(hint) = loop_guard.record(&call.name, &rendered) {
                        warn!("Loop guard triggered for tool '{}'", call.name);
                        messages.push(Message::user(hint));
                    }
                }

                continue;
            }
        }

        // No tool calls: content is the final response
        if !choice.message.content.is_empty() {
            let content = choice.message.content.clone();
            debug!("Agent reply: {}", content.chars().take(500).collect::<String>());
            return Ok(LoopRun {
                response: content,
                outcome: LoopOutcome::Completed,
                iterations: iteration,
                tool_calls: tool_calls_made,
                total_usage,
            });
        }

        warn!(
            "Model returned empty response, finish_reason: {:?}",
            choice.finish_reason
        );
        return Ok(LoopRun {
            response: config.fallback_message.clone(),
            outcome: LoopOutcome::EmptyResponse,
            iterations: iteration,
            tool_calls: tool_calls_made,
            total_usage,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GigaChatConfig;
    use crate::gigachat::TokenManager;
    use crate::post::PostComposer;
    use crate::tools::GeneratePostTool;
    use secrecy::SecretString;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn unix_now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn client_for(server: &MockServer, dir: &tempfile::TempDir) -> GigaChatClient {
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
        GigaChatClient::new(config, tokens).unwrap()
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

    fn tool_call_body(name: &str, arguments: &str) -> serde_json::Value {
        serde_json::json!({
            "model": "GigaChat-2",
            "created": 1700000000u64,
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{
                        "id": "call-1",
                        "type": "function",
                        "function": {"name": name, "arguments": arguments}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })
    }

    fn batch_tool_call_body(name: &str, count: usize) -> serde_json::Value {
        let calls: Vec<serde_json::Value> = (0..count)
            .map(|i| {
                serde_json::json!({
                    "id": format!("call-{}", i),
                    "type": "function",
                    "function": {"name": name, "arguments": "{}"}
                })
            })
            .collect();
        serde_json::json!({
            "model": "GigaChat-2",
            "created": 1700000000u64,
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "", "tool_calls": calls},
                "finish_reason": "tool_calls"
            }]
        })
    }

    fn registry() -> ToolRegistry {
        let mut tools = ToolRegistry::new();
        tools.register(GeneratePostTool::new(PostComposer::new(
            "https://t.me/JekardosCoinForever",
        )));
        tools
    }

    #[tokio::test]
    async fn plain_answer_completes_in_one_iteration() {
        let server = MockServer::start().await;
        mock_oauth(&server).await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(stop_body("готово")))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = client_for(&server, &dir);

        let run = run_loop(
            &client,
            &registry(),
            vec![Message::user("привет")],
            &LoopConfig::community(),
        )
        .await
        .unwrap();

        assert_eq!(run.response, "готово");
        assert_eq!(run.outcome, LoopOutcome::Completed);
        assert_eq!(run.iterations, 1);
        assert_eq!(run.tool_calls, 0);
    }

    #[tokio::test]
    async fn terminal_tool_ends_loop_with_its_output() {
        let server = MockServer::start().await;
        mock_oauth(&server).await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tool_call_body(
                crate::tools::GENERATE_POST_TOOL,
                r#"{"topic": "поход", "content_ideas": "Собираем рюкзак правильно."}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = client_for(&server, &dir);

        let run = run_loop(
            &client,
            &registry(),
            vec![Message::user("сделай пост про поход")],
            &LoopConfig::community(),
        )
        .await
        .unwrap();

        assert!(run.response.starts_with("Собираем рюкзак"));
        assert_eq!(
            run.outcome,
            LoopOutcome::TerminalTool(crate::tools::GENERATE_POST_TOOL.to_string())
        );
        assert_eq!(run.tool_calls, 1);
    }

    #[tokio::test]
    async fn unknown_tool_result_feeds_back_and_loop_continues() {
        let server = MockServer::start().await;
        mock_oauth(&server).await;
        // First call requests an unknown tool, second call stops
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(tool_call_body("nonexistent_tool", "{}")),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(stop_body("ответ без инструмента")))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = client_for(&server, &dir);

        let run = run_loop(
            &client,
            &registry(),
            vec![Message::user("вопрос")],
            &LoopConfig::community(),
        )
        .await
        .unwrap();

        assert_eq!(run.response, "ответ без инструмента");
        assert_eq!(run.iterations, 2);
        assert_eq!(run.tool_calls, 1);
    }

    #[tokio::test]
    async fn llm_error_yields_fallback_message() {
        let server = MockServer::start().await;
        mock_oauth(&server).await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = client_for(&server, &dir);

        let config = LoopConfig::community();
        let run = run_loop(&client, &registry(), vec![Message::user("q")], &config)
            .await
            .unwrap();

        assert_eq!(run.response, config.fallback_message);
        assert!(matches!(run.outcome, LoopOutcome::LlmError(_)));
    }

    #[tokio::test]
    async fn tool_call_budget_caps_a_single_batch() {
        let server = MockServer::start().await;
        mock_oauth(&server).await;
        // One response carrying more calls than the whole budget allows
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(batch_tool_call_body("nonexistent_tool", 18)),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(stop_body("итог")))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = client_for(&server, &dir);

        let config = LoopConfig::community();
        let run = run_loop(&client, &registry(), vec![Message::user("q")], &config)
            .await
            .unwrap();

        assert_eq!(run.tool_calls, config.max_tool_calls);
        assert_eq!(run.response, "итог");
        assert_eq!(run.outcome, LoopOutcome::Completed);
    }

    #[tokio::test]
    async fn max_iterations_exits_with_fallback() {
        let server = MockServer::start().await;
        mock_oauth(&server).await;
        // The model never stops asking for a non-terminal tool
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(tool_call_body("nonexistent_tool", "{}")),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = client_for(&server, &dir);

        let config = LoopConfig {
            max_iterations: 2,
            max_tool_calls: 100,
            ..LoopConfig::community()
        };
        let run = run_loop(&client, &registry(), vec![Message::user("q")], &config)
            .await
            .unwrap();

        assert_eq!(run.outcome, LoopOutcome::MaxIterationsExceeded);
        assert_eq!(run.response, config.fallback_message);
        assert_eq!(run.iterations, 2);
        assert_eq!(run.tool_calls, 2);
    }

    #[test]
    fn community_limits() {
        let config = LoopConfig::community();
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.max_tool_calls, 15);
        assert!(config
            .terminal_tools
            .contains(&crate::tools::GENERATE_POST_TOOL.to_string()));
    }
}
