//! JK Hub CLI
//!
//! Command-line access to the agent without Telegram: generate posts,
//! ask questions, run moderation, search, and manage the GigaChat token
//! cache.

use clap::{Parser, Subcommand};
use jk_hub::agent::Agent;
use jk_hub::config::Config;
use jk_hub::gigachat::{GigaChatClient, TokenManager};
use jk_hub::storage::CommunityStore;
use jk_hub::tools::{TavilySearchTool, Tool};
use jk_hub::{Error, Result, VERSION};
use secrecy::ExposeSecret;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "jk-hub",
    version = VERSION,
    about = "JK Hub - community assistant for the JK Coin Telegram chat",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a channel post on a topic
    Post {
        /// Post topic
        topic: String,
        /// Skip the tool-calling loop and generate directly
        #[arg(long)]
        direct: bool,
    },

    /// Ask the community assistant a question
    Ask {
        /// The question
        question: String,
    },

    /// Run the toxicity analysis on a message
    Analyze {
        /// Message text to analyze
        text: String,
    },

    /// Run a web search through the search tool
    Search {
        /// Search query
        query: String,
    },

    /// Manage the GigaChat token cache
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Fetch a token (from cache or the OAuth endpoint) and print its expiry
    Show,
    /// Drop the cached token
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log.level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Post { topic, direct } => {
            let agent = build_agent(&config)?;
            let post = if direct {
                agent.generate_post_directly(&topic).await
            } else {
                agent.create_post(&topic).await
            };
            println!("{}", post);
        }
        Commands::Ask { question } => {
            let agent = build_agent(&config)?;
            println!("{}", agent.answer(&question).await);
        }
        Commands::Analyze { text } => {
            let agent = build_agent(&config)?;
            let verdict = agent.moderate(&text).await;
            println!("{}", verdict.to_pretty_json());
        }
        Commands::Search { query } => {
            let tool = TavilySearchTool::new(config.tavily.clone());
            let result = tool
                .execute(serde_json::json!({ "query": query }))
                .await?;
            println!("{}", result);
        }
        Commands::Token { action } => match action {
            TokenAction::Show => {
                let client = build_client(&config)?;
                let token = client.tokens().access_token().await?;
                let preview: String = token.chars().take(12).collect();
                println!("Token acquired: {}... (cached at {})", preview, config.storage.token_cache_file.display());
            }
            TokenAction::Clear => {
                let client = build_client(&config)?;
                client.tokens().invalidate();
                println!("Token cache cleared.");
            }
        },
    }

    Ok(())
}

fn build_client(config: &Config) -> Result<GigaChatClient> {
    if config.gigachat.client_id.expose_secret().is_empty() {
        return Err(Error::Config(
            "GIGACHAT_CLIENT_ID and GIGACHAT_CLIENT_SECRET are required".to_string(),
        ));
    }
    let tokens = TokenManager::new(
        config.gigachat.clone(),
        config.storage.token_cache_file.clone(),
    )?;
    GigaChatClient::new(config.gigachat.clone(), tokens)
}

fn build_agent(config: &Config) -> Result<Agent> {
    let client = Arc::new(build_client(config)?);
    let store = Arc::new(CommunityStore::open(config.storage.community_file.clone()));
    Ok(Agent::new(
        client,
        store,
        config.tavily.clone(),
        &config.telegram.chat_invite_link,
        config.post.max_post_length,
    ))
}
