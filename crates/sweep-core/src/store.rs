use std::{collections::HashMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::domain::{ChatId, MessageId};
use crate::policy::TimeRange;

/// Auto-deletion of the bot's own replies (menus, confirmations).
///
/// The [5, 3600] second bounds are enforced at the settings input boundary,
/// not here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoDeletePolicy {
    pub enabled: bool,
    pub delete_after_secs: u32,
}

impl Default for AutoDeletePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            delete_after_secs: 30,
        }
    }
}

impl fmt::Display for AutoDeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.enabled {
            return write!(f, "Disabled");
        }
        write!(f, "{} seconds", self.delete_after_secs)
    }
}

/// A live self-delete timer for one outbound message.
///
/// The generation lets a replacement scheduling invalidate a task that
/// captured the old entry.
#[derive(Clone, Debug)]
pub struct TimerEntry {
    pub generation: u64,
    pub cancel: CancellationToken,
}

/// Per-chat moderation settings plus the chat's live self-delete timers.
///
/// Serde derives are the durability hook: the settings serialize cleanly,
/// the runtime-only timer map does not travel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatConfig {
    pub whitelist: Vec<String>,
    pub time_range: TimeRange,
    pub auto_delete: AutoDeletePolicy,
    #[serde(skip)]
    pub live_timers: HashMap<MessageId, TimerEntry>,
}

impl ChatConfig {
    fn with_defaults(defaults: &ChatDefaults) -> Self {
        Self {
            whitelist: defaults.whitelist.clone(),
            time_range: TimeRange::default(),
            auto_delete: defaults.auto_delete,
            live_timers: HashMap::new(),
        }
    }

    /// Case-insensitive allow-list membership.
    pub fn is_whitelisted(&self, handle: &str) -> bool {
        contains_handle(&self.whitelist, handle)
    }
}

/// Case-insensitive membership test over a list of `@handles`.
pub fn contains_handle(list: &[String], handle: &str) -> bool {
    if handle.is_empty() {
        return false;
    }
    let lower = handle.to_lowercase();
    list.iter().any(|w| w.to_lowercase() == lower)
}

/// Defaults applied when a chat is seen for the first time.
#[derive(Clone, Debug)]
pub struct ChatDefaults {
    pub whitelist: Vec<String>,
    pub auto_delete: AutoDeletePolicy,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            whitelist: vec!["@gif".to_string(), "@vid".to_string(), "@music".to_string()],
            auto_delete: AutoDeletePolicy::default(),
        }
    }
}

impl ChatDefaults {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            whitelist: cfg.default_whitelist.clone(),
            auto_delete: AutoDeletePolicy {
                enabled: cfg.auto_delete_enabled,
                delete_after_secs: cfg.auto_delete_seconds,
            },
        }
    }
}

/// Process-wide registry of per-chat configuration.
///
/// The outer lock guards entry creation, so each chat gets exactly one
/// aggregate; the per-chat lock serializes read-modify-write sections of
/// concurrent handlers for the same chat without contending across chats.
pub struct ConfigRegistry {
    defaults: ChatDefaults,
    chats: Mutex<HashMap<ChatId, Arc<Mutex<ChatConfig>>>>,
}

impl ConfigRegistry {
    pub fn new(defaults: ChatDefaults) -> Self {
        Self {
            defaults,
            chats: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a chat's aggregate, creating it with defaults on first use.
    pub async fn get_or_create(&self, chat_id: ChatId) -> Arc<Mutex<ChatConfig>> {
        let mut chats = self.chats.lock().await;
        chats
            .entry(chat_id)
            .or_insert_with(|| Arc::new(Mutex::new(ChatConfig::with_defaults(&self.defaults))))
            .clone()
    }
}
