//! Telegram update handlers.
//!
//! Each handler validates admin rights where required, feeds the settings
//! dialog while it is waiting for input, and passes everything else to the
//! moderation engine.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};

use sweep_core::domain::{ChatId, ChatKind, InboundMessage, MessageId, UserId, ViaBot};

use crate::router::AppState;

mod callback;
mod commands;
mod settings_input;

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    callback::handle_callback(q, state).await
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return commands::handle_command(msg, state).await;
        }
    }

    let chat_id = ChatId(msg.chat.id.0);

    // Free text is consumed by the settings dialog only while it is waiting
    // for input, and only from admins; everything else gets moderated.
    if msg.text().is_some() {
        let cursor = state.flow.get(chat_id).await;
        if cursor.state.captures_text() {
            if let Some(user) = msg.from() {
                let is_admin = state
                    .admin
                    .is_admin(chat_id, UserId(user.id.0 as i64))
                    .await
                    .unwrap_or(false);
                if is_admin {
                    return settings_input::handle_text_input(msg, state).await;
                }
            }
        }
    }

    let inbound = to_inbound(&msg);
    state.engine.evaluate(&inbound).await;
    Ok(())
}

fn to_inbound(msg: &Message) -> InboundMessage {
    let chat_kind = if msg.chat.is_private() {
        ChatKind::Private
    } else if msg.chat.is_group() {
        ChatKind::Group
    } else if msg.chat.is_supergroup() {
        ChatKind::Supergroup
    } else {
        ChatKind::Channel
    };

    InboundMessage {
        chat_id: ChatId(msg.chat.id.0),
        chat_kind,
        message_id: MessageId(msg.id.0),
        sender: msg.from().map(|u| UserId(u.id.0 as i64)),
        via_bot: msg.via_bot.as_ref().map(|bot| ViaBot {
            username: bot.username.clone(),
        }),
        has_inline_keyboard: msg.reply_markup().is_some(),
        text: msg.text().map(|t| t.to_string()),
        caption: msg.caption().map(|t| t.to_string()),
    }
}
