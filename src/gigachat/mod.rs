//! GigaChat integration: OAuth token management and chat completions

mod auth;
mod client;
mod types;

pub use auth::TokenManager;
pub use client::GigaChatClient;
pub use types::{
    AssistantToolCall, ChatCompletionRequest, ChatCompletionResponse, Choice, FunctionCall,
    FunctionDefinition, FunctionName, GenerationOptions, Message, Role, ToolChoice,
    ToolDefinition, Usage,
};
