//! Agent tools
//!
//! The six community tools plus the trait and registry plumbing that
//! exposes them to the model.

mod analyze_message;
mod answer_question;
mod community;
mod generate_post;
mod registry;
mod tavily_search;
mod traits;

pub use analyze_message::AnalyzeMessageTool;
pub use answer_question::AnswerQuestionTool;
pub use community::{GetCommunityRatingTool, GetUserStatsTool};
pub use generate_post::{GeneratePostTool, GENERATE_POST_TOOL};
pub use registry::ToolRegistry;
pub use tavily_search::TavilySearchTool;
pub use traits::{Tool, ToolCall, ToolResult};
