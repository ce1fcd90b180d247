use async_trait::async_trait;
use chrono::NaiveTime;
use tracing::{error, warn};

use crate::domain::{ChatId, MessageRef, UserId};
use crate::Result;

/// Why the platform refused to delete a message.
///
/// `NotFound` and `Forbidden` are distinguished because they are expected
/// under concurrent moderation and only worth a warning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteFailure {
    /// Already gone (or never existed).
    NotFound,
    /// The bot lacks the right to delete this message.
    Forbidden,
    Other(String),
}

impl std::fmt::Display for DeleteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeleteFailure::NotFound => write!(f, "message to delete not found"),
            DeleteFailure::Forbidden => write!(f, "message can't be deleted"),
            DeleteFailure::Other(e) => write!(f, "{e}"),
        }
    }
}

/// Inline keyboard (menu buttons), row-major.
#[derive(Clone, Debug)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

impl InlineKeyboard {
    /// One button per row, the layout every settings menu uses.
    pub fn single_column(buttons: Vec<InlineButton>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }
}

/// Messaging capability the core consumes (Telegram in production).
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef>;

    async fn delete_message(&self, msg: MessageRef) -> std::result::Result<(), DeleteFailure>;

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()>;
}

/// Chat-membership lookups.
#[async_trait]
pub trait AdminPort: Send + Sync {
    /// Whether the user is an administrator or the owner of the chat.
    async fn is_admin(&self, chat_id: ChatId, user_id: UserId) -> Result<bool>;

    /// Whether the bot itself has administrator rights in the chat.
    async fn bot_is_admin(&self, chat_id: ChatId) -> Result<bool>;
}

/// Injected wall clock; policy code never reads time on its own.
pub trait Clock: Send + Sync {
    fn now_time(&self) -> NaiveTime;
}

/// Local server time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_time(&self) -> NaiveTime {
        chrono::Local::now().time()
    }
}

/// Delete a message, absorbing platform failures.
///
/// Returns whether the message is known to have been removed.
pub async fn delete_silently(messenger: &dyn MessagingPort, msg: MessageRef) -> bool {
    match messenger.delete_message(msg).await {
        Ok(()) => true,
        Err(DeleteFailure::NotFound) => {
            warn!(
                "message {} in chat {} already deleted or not found",
                msg.message_id.0, msg.chat_id.0
            );
            false
        }
        Err(DeleteFailure::Forbidden) => {
            warn!(
                "no permission to delete message {} in chat {}",
                msg.message_id.0, msg.chat_id.0
            );
            false
        }
        Err(DeleteFailure::Other(e)) => {
            error!(
                "failed to delete message {} in chat {}: {e}",
                msg.message_id.0, msg.chat_id.0
            );
            false
        }
    }
}
