//! Telegram adapter (teloxide).
//!
//! This crate implements the `sweep-core` messaging and admin ports over
//! the Telegram Bot API.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode},
    ApiError, RequestError,
};

pub mod handlers;
pub mod router;
pub mod views;

use sweep_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    errors::Error,
    ports::{AdminPort, DeleteFailure, InlineKeyboard, MessagingPort},
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn tg_user(user_id: UserId) -> teloxide::types::UserId {
        teloxide::types::UserId(user_id.0 as u64)
    }

    fn map_err(e: RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    fn markup(keyboard: InlineKeyboard) -> InlineKeyboardMarkup {
        let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|b| InlineKeyboardButton::callback(b.label, b.callback_data))
                    .collect()
            })
            .collect();
        InlineKeyboardMarkup::new(rows)
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), html.to_string())
            .parse_mode(ParseMode::Html)
            .await
            .map_err(Self::map_err)?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), html.to_string())
            .parse_mode(ParseMode::Html)
            .reply_markup(Self::markup(keyboard))
            .await
            .map_err(Self::map_err)?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn delete_message(&self, msg: MessageRef) -> std::result::Result<(), DeleteFailure> {
        match self
            .bot
            .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
            .await
        {
            Ok(_) => Ok(()),
            Err(RequestError::Api(ApiError::MessageToDeleteNotFound)) => {
                Err(DeleteFailure::NotFound)
            }
            Err(RequestError::Api(ApiError::MessageCantBeDeleted)) => Err(DeleteFailure::Forbidden),
            Err(e) => Err(DeleteFailure::Other(format!("telegram error: {e}"))),
        }
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()> {
        let mut req = self.bot.answer_callback_query(callback_id.to_string());
        if let Some(t) = text {
            req = req.text(t.to_string());
        }
        if show_alert {
            req = req.show_alert(true);
        }
        req.await.map_err(Self::map_err)?;
        Ok(())
    }
}

#[async_trait]
impl AdminPort for TelegramMessenger {
    async fn is_admin(&self, chat_id: ChatId, user_id: UserId) -> Result<bool> {
        let member = self
            .bot
            .get_chat_member(Self::tg_chat(chat_id), Self::tg_user(user_id))
            .await
            .map_err(Self::map_err)?;
        Ok(member.is_privileged())
    }

    async fn bot_is_admin(&self, chat_id: ChatId) -> Result<bool> {
        let me = self.bot.get_me().await.map_err(Self::map_err)?;
        let member = self
            .bot
            .get_chat_member(Self::tg_chat(chat_id), me.id)
            .await
            .map_err(Self::map_err)?;
        Ok(member.is_privileged())
    }
}
