//! # JK Hub
//!
//! Telegram community-assistant bot for the JK Coin community.
//!
//! ## Features
//!
//! - **GigaChat Native:** OAuth token caching and chat completions
//! - **Tool-Calling Agent:** bounded loop over six community tools
//! - **Post Generation:** length-bounded channel posts with publish confirmation
//! - **Moderation:** LLM toxicity screening of free-form chat messages
//! - **Telegram Native:** first-class Telegram Bot API support

pub mod agent;
pub mod config;
pub mod error;
pub mod gigachat;
pub mod moderation;
pub mod post;
pub mod storage;
pub mod tools;

pub use config::Config;
pub use error::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
