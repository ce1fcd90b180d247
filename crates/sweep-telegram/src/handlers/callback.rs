use std::sync::Arc;

use teloxide::prelude::*;

use sweep_core::domain::{ChatId, MessageId, MessageRef, UserId};
use sweep_core::ports::delete_silently;
use sweep_core::workflow::{apply_selection, Ack, Selection};

use crate::router::AppState;
use crate::views;

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    let callback_id = q.id.clone();

    let (chat_id, pressed) = match q.message.as_ref() {
        Some(m) => (
            ChatId(m.chat.id.0),
            MessageRef {
                chat_id: ChatId(m.chat.id.0),
                message_id: MessageId(m.id.0),
            },
        ),
        None => {
            let _ = state.messenger.answer_callback(&callback_id, None, false).await;
            return Ok(());
        }
    };
    let Some(data) = q.data.as_deref() else {
        let _ = state.messenger.answer_callback(&callback_id, None, false).await;
        return Ok(());
    };

    // Menu buttons are for admins only.
    let user_id = UserId(q.from.id.0 as i64);
    let is_admin = state.admin.is_admin(chat_id, user_id).await.unwrap_or(false);
    if !is_admin {
        let _ = state
            .messenger
            .answer_callback(
                &callback_id,
                Some("This button is for administrators only!"),
                true,
            )
            .await;
        return Ok(());
    }

    let Some(selection) = Selection::parse(data) else {
        let _ = state.messenger.answer_callback(&callback_id, None, false).await;
        return Ok(());
    };

    // The pressed menu is replaced either way; forget it so the redisplay
    // does not try to delete it twice.
    delete_silently(state.messenger.as_ref(), pressed).await;
    state
        .flow
        .update(chat_id, |cur| {
            if cur.last_menu == Some(pressed.message_id) {
                cur.last_menu = None;
            }
        })
        .await;

    let config = state.registry.get_or_create(chat_id).await;
    let outcome = {
        let mut cfg = config.lock().await;
        apply_selection(&mut cfg, selection)
    };

    let toast = outcome.ack.as_ref().map(ack_text);
    let _ = state
        .messenger
        .answer_callback(&callback_id, toast.as_deref(), false)
        .await;

    views::show_screen(&state, chat_id, outcome.screen).await;
    Ok(())
}

fn ack_text(ack: &Ack) -> String {
    match ack {
        Ack::DeletionEnabled => "Inline-bot deletion enabled".to_string(),
        Ack::DeletionDisabled => "Inline-bot deletion disabled".to_string(),
        Ack::HandleRemoved(handle) => format!("{handle} removed from the whitelist"),
    }
}
