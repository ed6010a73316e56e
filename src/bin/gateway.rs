//! JK Hub Telegram gateway
//!
//! Long-polling bot for the JK Coin community: post generation with a
//! publish confirmation keyboard, stats and rating commands, question
//! answering and passive moderation of free-form chat messages.

use jk_hub::agent::Agent;
use jk_hub::config::Config;
use jk_hub::gigachat::{GigaChatClient, TokenManager};
use jk_hub::storage::{CommunityStore, PostHistory, SeenUser};
use jk_hub::Result;

use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode, Recipient};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Question markers used on free-form messages
const QUESTION_WORDS: [&str; 7] = ["как", "что", "где", "когда", "почему", "помоги", "подскажи"];

/// Help text shown by /help
const HELP_TEXT: &str = "\
🤖 **JK Community Hub Bot** - Интеллектуальный помощник сообщества

**Основные команды:**
/generate [тема] - Создание поста для канала
/stats - Ваша личная статистика
/rating - Рейтинг активных участников
/ask [вопрос] - Задать вопрос боту
/analyze [текст] - Анализ сообщения на токсичность

**Поддержка:** Обращайтесь к администраторам для сложных вопросов.";

/// Application state shared across handlers
struct AppState {
    config: Config,
    agent: Agent,
    store: Arc<CommunityStore>,
    history: PostHistory,
    /// Drafts awaiting the publish/cancel decision, keyed by user ID
    pending_posts: RwLock<HashMap<i64, String>>,
}

impl AppState {
    fn new(config: Config) -> Result<Self> {
        let tokens = TokenManager::new(
            config.gigachat.clone(),
            config.storage.token_cache_file.clone(),
        )?;
        let client = Arc::new(GigaChatClient::new(config.gigachat.clone(), tokens)?);
        let store = Arc::new(CommunityStore::open(config.storage.community_file.clone()));
        let history = PostHistory::new(config.storage.history_file.clone());

        let agent = Agent::new(
            client,
            store.clone(),
            config.tavily.clone(),
            &config.telegram.chat_invite_link,
            config.post.max_post_length,
        );

        Ok(AppState {
            config,
            agent,
            store,
            history,
            pending_posts: RwLock::new(HashMap::new()),
        })
    }

    /// Register the sender and count their message
    fn record_user(&self, msg: &Message) {
        let Some(user) = msg.from.as_ref() else {
            return;
        };
        let seen = SeenUser {
            telegram_id: user.id.0 as i64,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        };
        if let Err(e) = self.store.record_message(&seen) {
            warn!("Failed to record user message: {}", e);
        }
    }
}

/// Whether a free-form message looks like a question worth answering
fn looks_like_question(text: &str) -> bool {
    if text.contains('?') {
        return true;
    }
    let lowered = text.to_lowercase();
    QUESTION_WORDS.iter().any(|w| lowered.contains(w))
}

/// Resolve the publish target from the configured channel ID
fn channel_recipient(channel_id: &str) -> Recipient {
    match channel_id.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(channel_id.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    let filter = tracing_subscriber::EnvFilter::try_new(&config.log.level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if config.log.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting JK Hub gateway v{}", jk_hub::VERSION);
    config.validate()?;

    if config.telegram.channel_id.is_none() {
        warn!("TELEGRAM_CHANNEL_ID is not set, publishing will be disabled");
    }

    let bot = Bot::new(config.telegram.bot_token.expose_secret());
    let state = Arc::new(AppState::new(config)?);

    match bot.get_me().await {
        Ok(me) => info!(
            "Telegram bot started: @{}",
            me.username.as_deref().unwrap_or("unknown")
        ),
        Err(e) => {
            error!("Failed to reach Telegram: {}", e);
            return Err(jk_hub::Error::Telegram(e.to_string()));
        }
    }

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(message_handler))
        .branch(Update::filter_callback_query().endpoint(callback_handler));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Gateway shutdown complete");
    Ok(())
}

/// Handle incoming messages (commands and free-form chat)
async fn message_handler(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text().map(str::to_string) else {
        return Ok(());
    };

    state.record_user(&msg);

    if text.starts_with('/') {
        return handle_command(bot, msg, state, &text).await;
    }

    handle_free_form(bot, msg, state, &text).await
}

/// Dispatch a slash command
async fn handle_command(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    text: &str,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id;

    let parts: Vec<&str> = text.splitn(2, ' ').collect();
    let cmd = parts[0].trim_start_matches('/').to_lowercase();
    let cmd = cmd.split('@').next().unwrap_or(&cmd);
    let args = parts.get(1).map(|s| s.trim().to_string()).unwrap_or_default();

    match cmd {
        "start" => {
            bot.send_message(
                chat_id,
                "Привет! Я Нейро Jekardos. Чтобы сгенерировать пост, \
                 используйте команду /generate [тема поста].",
            )
            .await?;
        }
        "help" => {
            bot.send_message(chat_id, HELP_TEXT)
                .parse_mode(ParseMode::Markdown)
                .await?;
        }
        "generate" => {
            if args.is_empty() {
                bot.send_message(
                    chat_id,
                    "Пожалуйста, укажите тему. Например: /generate пост о подготовке к походу в горы.",
                )
                .await?;
                return Ok(());
            }
            handle_generate(bot, msg, state, &args).await?;
        }
        "stats" => {
            let user_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(0);
            let stats = state.store.user_stats(user_id);
            bot.send_message(chat_id, format!("📊 **Ваша статистика:**\n\n{}", stats))
                .parse_mode(ParseMode::Markdown)
                .await?;
        }
        "rating" => {
            let rating = state.store.community_rating();
            bot.send_message(chat_id, format!("🏆 **Рейтинг сообщества:**\n\n{}", rating))
                .parse_mode(ParseMode::Markdown)
                .await?;
        }
        "ask" => {
            if args.is_empty() {
                bot.send_message(
                    chat_id,
                    "Пожалуйста, укажите вопрос. Например: /ask Как работает TON блокчейн?",
                )
                .await?;
                return Ok(());
            }
            bot.send_message(chat_id, format!("🤔 Обрабатываю ваш вопрос: '{}'...", args))
                .await?;
            let answer = state.agent.answer(&args).await;
            bot.send_message(chat_id, format!("💡 **Ответ:**\n\n{}", answer))
                .parse_mode(ParseMode::Markdown)
                .await?;
        }
        "analyze" => {
            if args.is_empty() {
                bot.send_message(
                    chat_id,
                    "Пожалуйста, укажите текст для анализа. Например: /analyze Этот текст нужно проверить",
                )
                .await?;
                return Ok(());
            }
            let preview: String = args.chars().take(50).collect();
            bot.send_message(chat_id, format!("🔍 Анализирую текст: '{}...'", preview))
                .await?;
            let verdict = state.agent.moderate(&args).await;
            bot.send_message(
                chat_id,
                format!(
                    "📊 **Результат анализа:**\n```json\n{}\n```",
                    verdict.to_pretty_json()
                ),
            )
            .parse_mode(ParseMode::Markdown)
            .await?;
        }
        _ => {
            bot.send_message(
                chat_id,
                "Извините, я не знаю такой команды. Используйте /help для списка команд.",
            )
            .await?;
        }
    }

    Ok(())
}

/// Generate a post draft and offer the publish/cancel keyboard
async fn handle_generate(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    topic: &str,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    let user_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(0);

    bot.send_message(
        chat_id,
        format!(
            "Генерирую пост на тему: '{}'. Это может занять до минуты...",
            topic
        ),
    )
    .await?;
    bot.send_chat_action(chat_id, teloxide::types::ChatAction::Typing)
        .await?;

    let post_text = state.agent.create_post(topic).await;

    state
        .pending_posts
        .write()
        .await
        .insert(user_id, post_text.clone());

    let keyboard = InlineKeyboardMarkup::new([[
        InlineKeyboardButton::callback("✅ Опубликовать", "publish"),
        InlineKeyboardButton::callback("❌ Отмена", "cancel"),
    ]]);

    bot.send_message(chat_id, post_text)
        .reply_markup(keyboard)
        .await?;

    Ok(())
}

/// Handle the publish/cancel decision on a draft
async fn callback_handler(bot: Bot, q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();
    let user_id = q.from.id.0 as i64;

    let post_text = state.pending_posts.write().await.remove(&user_id);
    let Some(post_text) = post_text else {
        bot.edit_message_text(chat_id, message_id, "Ошибка: Данные поста не найдены.")
            .await?;
        return Ok(());
    };

    if q.data.as_deref() != Some("publish") {
        bot.edit_message_text(chat_id, message_id, "❌ Генерация поста отменена.")
            .await?;
        return Ok(());
    }

    let Some(channel_id) = state.config.telegram.channel_id.as_deref() else {
        bot.edit_message_text(
            chat_id,
            message_id,
            "Ошибка: ID канала Telegram не установлен в переменных окружения.",
        )
        .await?;
        return Ok(());
    };

    match bot
        .send_message(channel_recipient(channel_id), post_text.clone())
        .await
    {
        Ok(_) => {
            if let Err(e) = state.history.append(&post_text) {
                warn!("Failed to save post to history: {}", e);
            }
            info!("Post published to channel by user {}", user_id);
            bot.edit_message_text(chat_id, message_id, "✅ Пост успешно опубликован в канале!")
                .await?;
        }
        Err(e) => {
            error!("Failed to publish post: {}", e);
            bot.edit_message_text(
                chat_id,
                message_id,
                format!("❌ Не удалось опубликовать. Ошибка: {}", e),
            )
            .await?;
        }
    }

    Ok(())
}

/// Moderate a free-form message, answer it if it looks like a question,
/// otherwise acknowledge it
async fn handle_free_form(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    text: &str,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id;

    let verdict = state.agent.moderate(text).await;
    if verdict.warrants_warning() {
        bot.send_message(
            chat_id,
            format!(
                "⚠️ **Внимание:** {} Пожалуйста, будьте вежливы и уважительны.",
                verdict.reason
            ),
        )
        .parse_mode(ParseMode::Markdown)
        .await?;
        return Ok(());
    }

    if looks_like_question(text) {
        let answer = state.agent.answer(text).await;
        bot.send_message(chat_id, format!("💡 **Ответ:**\n\n{}", answer))
            .parse_mode(ParseMode::Markdown)
            .await?;
        return Ok(());
    }

    bot.send_message(
        chat_id,
        "✅ Сообщение получено и обработано. Спасибо за активность в сообществе!",
    )
    .await?;

    Ok(())
}
