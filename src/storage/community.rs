//! Community store: user profiles and activity counters
//!
//! A local JSON document store. Users are registered on first contact;
//! every message bumps their counters. Backs the stats and rating
//! tools.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};

/// A registered community member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Telegram user ID
    pub telegram_id: i64,
    /// Telegram username (or a `user_<id>` placeholder)
    pub username: String,
    /// First name
    #[serde(default)]
    pub first_name: String,
    /// Last name
    #[serde(default)]
    pub last_name: String,
    /// When the user was first seen
    pub registration_date: DateTime<Utc>,
    /// Activity score (one point per message)
    pub activity_score: u32,
    /// JK coins earned
    pub jk_earned: u32,
    /// Messages recorded
    pub messages: u32,
}

/// Identity of a user as seen on an incoming update
#[derive(Debug, Clone)]
pub struct SeenUser {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CommunityData {
    users: HashMap<i64, UserProfile>,
}

/// JSON-file-backed store of community members
pub struct CommunityStore {
    path: PathBuf,
    data: Mutex<CommunityData>,
}

impl CommunityStore {
    /// Open the store, loading existing data if the file is readable
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Community store is corrupt, starting fresh: {}", e);
                CommunityData::default()
            }),
            Err(_) => CommunityData::default(),
        };

        CommunityStore {
            path,
            data: Mutex::new(data),
        }
    }

    /// Register the user if unseen and count one message
    pub fn record_message(&self, user: &SeenUser) -> Result<()> {
        let mut data = self.data.lock().expect("community store lock poisoned");

        let profile = data
            .users
            .entry(user.telegram_id)
            .or_insert_with(|| {
                info!(
                    "New community member registered: {} ({})",
                    user.username.as_deref().unwrap_or("-"),
                    user.telegram_id
                );
                UserProfile {
                    telegram_id: user.telegram_id,
                    username: user
                        .username
                        .clone()
                        .unwrap_or_else(|| format!("user_{}", user.telegram_id)),
                    first_name: user.first_name.clone(),
                    last_name: user.last_name.clone().unwrap_or_default(),
                    registration_date: Utc::now(),
                    activity_score: 0,
                    jk_earned: 0,
                    messages: 0,
                }
            });

        profile.messages += 1;
        profile.activity_score += 1;

        self.save(&data)
    }

    /// Formatted stats block for one user
    pub fn user_stats(&self, user_id: i64) -> String {
        let data = self.data.lock().expect("community store lock poisoned");

        match data.users.get(&user_id) {
            Some(profile) => {
                let rank = rank_of(&data, user_id)
                    .map(|r| format!("#{}", r))
                    .unwrap_or_else(|| "N/A".to_string());
                format!(
                    "Статистика пользователя {}:\n- Сообщений: {}\n- Активность: {}\n- JK заработано: {}\n- Рейтинг: {}",
                    user_id, profile.messages, profile.activity_score, profile.jk_earned, rank
                )
            }
            None => format!(
                "Статистика пользователя {}:\n- Сообщений: 0\n- Активность: 0\n- JK заработано: 0\n- Рейтинг: N/A",
                user_id
            ),
        }
    }

    /// Formatted top-10 activity rating
    pub fn community_rating(&self) -> String {
        let data = self.data.lock().expect("community store lock poisoned");

        let mut members: Vec<&UserProfile> = data.users.values().collect();
        members.sort_by(|a, b| b.activity_score.cmp(&a.activity_score));

        if members.is_empty() {
            return "Рейтинг сообщества JK Coin пока пуст. Напишите что-нибудь в чат!"
                .to_string();
        }

        let mut out = String::from("Рейтинг сообщества JK Coin:\n");
        for (i, profile) in members.iter().take(10).enumerate() {
            out.push_str(&format!(
                "{}. {} - {} очков\n",
                i + 1,
                profile.username,
                profile.activity_score
            ));
        }
        out.push_str("\nРейтинг обновляется автоматически.");
        out
    }

    /// Number of registered users
    pub fn user_count(&self) -> usize {
        self.data
            .lock()
            .expect("community store lock poisoned")
            .users
            .len()
    }

    fn save(&self, data: &CommunityData) -> Result<()> {
        std::fs::write(&self.path, serde_json::to_string_pretty(data)?).map_err(|e| {
            Error::Storage(format!("cannot write {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}

/// 1-based rank of a user by activity score
fn rank_of(data: &CommunityData, user_id: i64) -> Option<usize> {
    let mut members: Vec<&UserProfile> = data.users.values().collect();
    members.sort_by(|a, b| b.activity_score.cmp(&a.activity_score));
    members
        .iter()
        .position(|p| p.telegram_id == user_id)
        .map(|i| i + 1)
}
