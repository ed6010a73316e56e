//! The community agent: prompts, the bounded tool-calling loop and the
//! facade the bot and CLI talk to.

mod loop_guard;
pub mod prompts;
mod runner;
mod service;

pub use runner::{run_loop, LoopConfig, LoopOutcome, LoopRun};
pub use service::Agent;
