use std::sync::Arc;

use teloxide::prelude::*;

use tracing::error;

use sweep_core::domain::{ChatId, MessageId, MessageRef, UserId};
use sweep_core::ports::delete_silently;
use sweep_core::workflow::Screen;

use crate::router::AppState;
use crate::views;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let (cmd, _args) = parse_command(text);

    match cmd.as_str() {
        "start" => cmd_start(msg, state).await,
        "settings" => cmd_settings(msg, state).await,
        _ => Ok(()),
    }
}

/// Admin gate for command entry points. A non-admin's command message is
/// removed so the menus stay admin-only; one-to-one chats pass through
/// (there is nobody to be an admin of).
async fn ensure_admin(msg: &Message, state: &AppState) -> bool {
    if msg.chat.is_private() {
        return true;
    }
    let Some(user) = msg.from() else {
        return false;
    };

    let chat_id = ChatId(msg.chat.id.0);
    let is_admin = state
        .admin
        .is_admin(chat_id, UserId(user.id.0 as i64))
        .await
        .unwrap_or(false);

    if !is_admin {
        delete_silently(
            state.messenger.as_ref(),
            MessageRef {
                chat_id,
                message_id: MessageId(msg.id.0),
            },
        )
        .await;
    }
    is_admin
}

async fn cmd_start(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if !ensure_admin(&msg, &state).await {
        return Ok(());
    }

    let chat_id = ChatId(msg.chat.id.0);

    if msg.chat.is_private() {
        let _ = state
            .messenger
            .send_html(
                chat_id,
                "Add me to a group and grant me administrator rights.",
            )
            .await;
        return Ok(());
    }

    delete_silently(
        state.messenger.as_ref(),
        MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        },
    )
    .await;

    match state.admin.bot_is_admin(chat_id).await {
        Ok(true) => {
            views::send_notice(
                &state,
                chat_id,
                "✅ Bot activated!\n\
                 Use /settings to configure it.\n\n\
                 What it does:\n\
                 • Removes messages sent via inline bots\n\
                 • Deletion schedule\n\
                 • Bot whitelist\n\
                 • Auto-deletes its own replies",
            )
            .await;
        }
        Ok(false) => {
            views::send_notice(
                &state,
                chat_id,
                "⚠️ I need administrator rights!\n\
                 Grant me the right to delete messages.",
            )
            .await;
        }
        Err(e) => error!("could not check own rights in chat {}: {e}", chat_id.0),
    }

    Ok(())
}

async fn cmd_settings(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if !ensure_admin(&msg, &state).await {
        return Ok(());
    }

    let chat_id = ChatId(msg.chat.id.0);

    if msg.chat.is_private() {
        let _ = state
            .messenger
            .send_html(
                chat_id,
                "Add me to a group and grant me administrator rights.",
            )
            .await;
        return Ok(());
    }

    views::show_screen(&state, chat_id, Screen::MainMenu).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_with_bot_suffix_and_args() {
        assert_eq!(parse_command("/settings"), ("settings".to_string(), String::new()));
        assert_eq!(
            parse_command("/start@SweepBot now"),
            ("start".to_string(), "now".to_string())
        );
        assert_eq!(parse_command("/SETTINGS"), ("settings".to_string(), String::new()));
    }
}
