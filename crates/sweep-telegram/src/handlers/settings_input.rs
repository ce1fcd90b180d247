use std::sync::Arc;

use teloxide::prelude::*;

use sweep_core::domain::{ChatId, MessageId, MessageRef};
use sweep_core::workflow::{handle_free_text, DelayError, Screen, SettingsState, TextOutcome};

use sweep_core::ports::delete_silently;

use crate::router::AppState;
use crate::views::{self, escape_html};

/// Free text while the settings dialog is waiting for input. The sender is
/// already known to be an admin; the input message itself is removed so the
/// dialog leaves no residue in the chat.
pub async fn handle_text_input(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text().map(|t| t.to_string()) else {
        return Ok(());
    };
    let chat_id = ChatId(msg.chat.id.0);

    delete_silently(
        state.messenger.as_ref(),
        MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        },
    )
    .await;

    let config = state.registry.get_or_create(chat_id).await;
    let mut cursor = state.flow.get(chat_id).await;
    let outcome = {
        let mut cfg = config.lock().await;
        handle_free_text(&mut cursor, &mut cfg, &text)
    };
    let after = cursor;
    state
        .flow
        .update(chat_id, |cur| {
            cur.state = after.state;
            cur.pending_start = after.pending_start;
        })
        .await;

    match outcome {
        TextOutcome::WhitelistUpdated(report) => {
            if report.is_empty() {
                views::send_notice(&state, chat_id, "❌ Send bot usernames starting with @").await;
                return Ok(());
            }

            let mut lines = Vec::new();
            if !report.added.is_empty() {
                lines.push(format!("✅ Added: {}", escape_html(&report.added.join(", "))));
            }
            if !report.already_present.is_empty() {
                lines.push(format!(
                    "ℹ️ Already listed: {}",
                    escape_html(&report.already_present.join(", "))
                ));
            }
            if !report.invalid.is_empty() {
                lines.push(format!(
                    "❌ Invalid format (must start with @): {}",
                    escape_html(&report.invalid.join(", "))
                ));
            }
            views::send_notice(&state, chat_id, &lines.join("\n")).await;
            views::show_screen(&state, chat_id, Screen::WhitelistMenu).await;
        }
        TextOutcome::DelayAccepted(secs) => {
            views::send_notice(
                &state,
                chat_id,
                &format!("✅ Auto-delete delay set to {secs} seconds"),
            )
            .await;
            views::show_screen(&state, chat_id, Screen::AutoDeleteSettings).await;
        }
        TextOutcome::DelayRejected(DelayError::NotANumber) => {
            views::send_notice(&state, chat_id, "❌ Send a whole number of seconds").await;
        }
        TextOutcome::DelayRejected(DelayError::OutOfRange) => {
            views::send_notice(&state, chat_id, "❌ Send a number between 5 and 3600 seconds")
                .await;
        }
        TextOutcome::StartAccepted { .. } => {
            views::show_screen(&state, chat_id, Screen::TimeEndPrompt).await;
        }
        TextOutcome::EndAccepted { start, end } => {
            views::send_notice(
                &state,
                chat_id,
                &format!(
                    "✅ Deletion window set and activated!\nFrom {:02}:{:02} to {:02}:{:02}",
                    start.0, start.1, end.0, end.1
                ),
            )
            .await;
            views::show_screen(&state, chat_id, Screen::TimeSettings).await;
        }
        TextOutcome::TimeRejected => {
            let example = if after.state == SettingsState::TimeRangeSetStart {
                "22:00"
            } else {
                "08:00"
            };
            views::send_notice(
                &state,
                chat_id,
                &format!("❌ Invalid time format. Use HH:MM, e.g. {example}"),
            )
            .await;
        }
        TextOutcome::NotCapturing => {}
    }

    Ok(())
}
