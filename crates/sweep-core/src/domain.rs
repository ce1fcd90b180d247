/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Kind of chat a message arrived in. Moderation only applies to groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    pub fn is_group(self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup)
    }
}

/// Marker the platform sets on a message that is the direct result of an
/// inline query. The relaying bot's username is not always reported.
#[derive(Clone, Debug)]
pub struct ViaBot {
    pub username: Option<String>,
}

/// Messenger-agnostic projection of an incoming chat message, carrying the
/// structural fields the moderation pass cares about.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    pub message_id: MessageId,
    pub sender: Option<UserId>,
    pub via_bot: Option<ViaBot>,
    pub has_inline_keyboard: bool,
    pub text: Option<String>,
    pub caption: Option<String>,
}

impl InboundMessage {
    pub fn msg_ref(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat_id,
            message_id: self.message_id,
        }
    }

    /// Text body or media caption, whichever the message carries.
    pub fn text_or_caption(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }
}
