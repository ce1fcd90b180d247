//! Menu rendering: settings screens to HTML + keyboards, plus the
//! redisplay rules (delete the previous menu, auto-delete the new one).

use chrono::NaiveTime;

use sweep_core::{
    domain::{ChatId, MessageRef},
    policy::DeleteMode,
    ports::{delete_silently, InlineButton, InlineKeyboard},
    store::ChatConfig,
    workflow::{ConversationState, Screen},
};

use crate::router::AppState;

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn back_button(data: &str) -> InlineButton {
    InlineButton::new("◀️ Back", data)
}

/// Build the HTML body and keyboard for a settings screen. Pure, so the
/// menus are testable without a network.
pub fn render(
    screen: Screen,
    cfg: &ChatConfig,
    cursor: &ConversationState,
    now: NaiveTime,
) -> (String, InlineKeyboard) {
    match screen {
        Screen::MainMenu => main_menu(cfg),
        Screen::TimeSettings => time_settings(cfg),
        Screen::TimeStartPrompt => time_start_prompt(),
        Screen::TimeEndPrompt => time_end_prompt(cfg, cursor),
        Screen::WhitelistMenu => whitelist_menu(cfg),
        Screen::WhitelistAddPrompt => whitelist_add_prompt(),
        Screen::WhitelistRemoveMenu => whitelist_remove_menu(cfg),
        Screen::AutoDeleteSettings => auto_delete_settings(cfg),
        Screen::AutoDeleteTimePrompt => auto_delete_time_prompt(),
        Screen::Status => status(cfg, now),
    }
}

fn main_menu(cfg: &ChatConfig) -> (String, InlineKeyboard) {
    let disabled = cfg.time_range.mode == DeleteMode::Disabled;
    let (toggle_label, toggle_data) = if disabled {
        ("🔴 Enable deletion", "toggle_global_on")
    } else {
        ("🟢 Disable deletion", "toggle_global_off")
    };

    let keyboard = InlineKeyboard::single_column(vec![
        InlineButton::new(toggle_label, toggle_data),
        InlineButton::new("⏰ Mode (always / schedule)", "settings_time"),
        InlineButton::new("📋 Whitelist", "settings_whitelist"),
        InlineButton::new("🗑 Auto-delete my replies", "settings_auto_delete"),
        InlineButton::new("📊 Status", "settings_status"),
    ]);

    let text = format!(
        "⚙️ <b>Settings</b>\n\n\
         Current settings:\n\
         • Delete mode: <b>{}</b>\n\
         • Whitelist: <b>{} bots</b>\n\
         • Auto-delete replies: <b>{}</b>",
        cfg.time_range,
        cfg.whitelist.len(),
        cfg.auto_delete
    );

    (text, keyboard)
}

fn time_settings(cfg: &ChatConfig) -> (String, InlineKeyboard) {
    let always_icon = if cfg.time_range.mode == DeleteMode::Always {
        "✅"
    } else {
        "⚪"
    };
    let range_icon = if cfg.time_range.mode == DeleteMode::TimeRange {
        "✅"
    } else {
        "⚪"
    };

    let keyboard = InlineKeyboard::single_column(vec![
        InlineButton::new(format!("{always_icon} Always delete"), "time_always"),
        InlineButton::new(format!("{range_icon} On a schedule"), "time_range"),
        back_button("back_to_main"),
    ]);

    let text = format!(
        "⏰ <b>Deletion mode</b>\n\n\
         Current mode: <b>{}</b>\n\
         Start: <b>{:02}:{:02}</b>\n\
         End: <b>{:02}:{:02}</b>\n\n\
         Pick a mode:",
        cfg.time_range,
        cfg.time_range.start_hour,
        cfg.time_range.start_minute,
        cfg.time_range.end_hour,
        cfg.time_range.end_minute
    );

    (text, keyboard)
}

fn time_start_prompt() -> (String, InlineKeyboard) {
    let text = "⏰ <b>Deletion window</b>\n\n\
                Send the start time as <b>HH:MM</b>\n\
                For example: <code>22:00</code>"
        .to_string();
    let keyboard = InlineKeyboard::single_column(vec![back_button("back_to_time")]);
    (text, keyboard)
}

fn time_end_prompt(cfg: &ChatConfig, cursor: &ConversationState) -> (String, InlineKeyboard) {
    let (h, m) = cursor
        .pending_start
        .unwrap_or((cfg.time_range.start_hour, cfg.time_range.start_minute));
    let text = format!(
        "⏰ <b>Deletion window</b>\n\n\
         Start time: <b>{h:02}:{m:02}</b>\n\n\
         Now send the end time as <b>HH:MM</b>\n\
         For example: <code>08:00</code>"
    );
    let keyboard = InlineKeyboard::single_column(vec![back_button("back_to_time")]);
    (text, keyboard)
}

fn whitelist_menu(cfg: &ChatConfig) -> (String, InlineKeyboard) {
    let listing = if cfg.whitelist.is_empty() {
        "Empty".to_string()
    } else {
        cfg.whitelist
            .iter()
            .map(|b| format!("• {}", escape_html(b)))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let keyboard = InlineKeyboard::single_column(vec![
        InlineButton::new("➕ Add bots", "whitelist_add"),
        InlineButton::new("➖ Remove a bot", "whitelist_remove"),
        back_button("back_to_main"),
    ]);

    let text = format!(
        "📋 <b>Whitelist</b>\n\n\
         Listed bots ({}):\n{listing}",
        cfg.whitelist.len()
    );

    (text, keyboard)
}

fn whitelist_add_prompt() -> (String, InlineKeyboard) {
    let text = "➕ <b>Add bots to the whitelist</b>\n\n\
                Send bot usernames separated by spaces or newlines\n\
                For example:\n\
                <code>@LyBot @gif @music</code>"
        .to_string();
    let keyboard = InlineKeyboard::single_column(vec![back_button("back_to_whitelist")]);
    (text, keyboard)
}

fn whitelist_remove_menu(cfg: &ChatConfig) -> (String, InlineKeyboard) {
    if cfg.whitelist.is_empty() {
        let text = "The whitelist is empty!".to_string();
        let keyboard = InlineKeyboard::single_column(vec![back_button("back_to_whitelist")]);
        return (text, keyboard);
    }

    let mut buttons: Vec<InlineButton> = cfg
        .whitelist
        .iter()
        .map(|b| InlineButton::new(format!("❌ {b}"), format!("remove_{b}")))
        .collect();
    buttons.push(back_button("back_to_whitelist"));

    let text = "➖ <b>Remove a bot from the whitelist</b>\n\n\
                Pick a bot to remove:"
        .to_string();

    (text, InlineKeyboard::single_column(buttons))
}

fn auto_delete_settings(cfg: &ChatConfig) -> (String, InlineKeyboard) {
    let toggle_label = if cfg.auto_delete.enabled {
        "✅ Disable"
    } else {
        "⚪ Enable"
    };

    let keyboard = InlineKeyboard::single_column(vec![
        InlineButton::new(toggle_label, "autodel_toggle"),
        InlineButton::new(
            format!("⏱ Set delay ({} s)", cfg.auto_delete.delete_after_secs),
            "autodel_set_time",
        ),
        back_button("back_to_main"),
    ]);

    let text = format!(
        "🗑 <b>Auto-delete my replies</b>\n\n\
         Status: <b>{}</b>\n\
         Delay: <b>{} seconds</b>\n\n\
         My messages (menus, confirmations) are removed after the delay to keep the chat clean.",
        if cfg.auto_delete.enabled {
            "Enabled"
        } else {
            "Disabled"
        },
        cfg.auto_delete.delete_after_secs
    );

    (text, keyboard)
}

fn auto_delete_time_prompt() -> (String, InlineKeyboard) {
    let text = "⏱ <b>Auto-delete delay</b>\n\n\
                Send a delay in seconds (5 to 3600)\n\
                For example: <code>30</code>"
        .to_string();
    let keyboard = InlineKeyboard::single_column(vec![back_button("back_to_auto_delete")]);
    (text, keyboard)
}

fn status(cfg: &ChatConfig, now: NaiveTime) -> (String, InlineKeyboard) {
    let active_now = cfg.time_range.should_delete_at(now);
    let examples = if cfg.whitelist.is_empty() {
        "none".to_string()
    } else {
        escape_html(
            &cfg.whitelist
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
        )
    };

    let text = format!(
        "📊 <b>Status</b>\n\n\
         <b>Deletion:</b>\n\
         • Mode: {}\n\
         • Window: {:02}:{:02} - {:02}:{:02}\n\
         • Server time: {}\n\
         • Active right now: <b>{}</b>\n\n\
         <b>Whitelist:</b>\n\
         • Bots listed: {}\n\
         • Examples: {examples}\n\n\
         <b>Auto-delete of my replies:</b>\n\
         • Status: {}\n\
         • Delay: {} seconds",
        cfg.time_range,
        cfg.time_range.start_hour,
        cfg.time_range.start_minute,
        cfg.time_range.end_hour,
        cfg.time_range.end_minute,
        now.format("%H:%M"),
        if active_now { "✅ YES" } else { "❌ NO" },
        cfg.whitelist.len(),
        if cfg.auto_delete.enabled {
            "✅ Enabled"
        } else {
            "❌ Disabled"
        },
        cfg.auto_delete.delete_after_secs
    );

    let keyboard = InlineKeyboard::single_column(vec![back_button("back_to_main")]);
    (text, keyboard)
}

/// Redisplay a settings screen: delete the previous menu message, send the
/// new one (auto-deleting), and move the dialog cursor onto the screen.
pub async fn show_screen(state: &AppState, chat_id: ChatId, screen: Screen) {
    let config = state.registry.get_or_create(chat_id).await;

    let cursor = state.flow.get(chat_id).await;
    let (text, keyboard) = {
        let cfg = config.lock().await;
        render(screen, &cfg, &cursor, state.clock.now_time())
    };

    if let Some(last) = cursor.last_menu {
        delete_silently(
            state.messenger.as_ref(),
            MessageRef {
                chat_id,
                message_id: last,
            },
        )
        .await;
    }

    let sent = state
        .scheduler
        .send_with_auto_delete(config, chat_id, &text, Some(keyboard))
        .await;

    state
        .flow
        .update(chat_id, |cur| {
            cur.state = screen.state();
            cur.last_menu = sent.map(|m| m.message_id);
            if screen == Screen::TimeStartPrompt {
                cur.pending_start = None;
            }
        })
        .await;
}

/// Send a short auto-deleting reply (confirmation or validation error)
/// without touching the tracked menu message.
pub async fn send_notice(state: &AppState, chat_id: ChatId, html: &str) {
    let config = state.registry.get_or_create(chat_id).await;
    let _ = state
        .scheduler
        .send_with_auto_delete(config, chat_id, html, None)
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweep_core::store::AutoDeletePolicy;

    fn config() -> ChatConfig {
        ChatConfig {
            whitelist: vec!["@gif".to_string(), "@vid".to_string()],
            time_range: sweep_core::policy::TimeRange::default(),
            auto_delete: AutoDeletePolicy::default(),
            live_timers: Default::default(),
        }
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn escape_html_covers_the_telegram_sensitive_chars() {
        assert_eq!(escape_html("a<b>&\"c"), "a&lt;b&gt;&amp;&quot;c");
        assert_eq!(escape_html("@gif"), "@gif");
    }

    #[test]
    fn main_menu_toggle_follows_the_mode() {
        let mut cfg = config();
        let (_, keyboard) = render(Screen::MainMenu, &cfg, &Default::default(), at(12, 0));
        assert_eq!(keyboard.rows[0][0].callback_data, "toggle_global_off");

        cfg.time_range.mode = DeleteMode::Disabled;
        let (text, keyboard) = render(Screen::MainMenu, &cfg, &Default::default(), at(12, 0));
        assert_eq!(keyboard.rows[0][0].callback_data, "toggle_global_on");
        assert!(text.contains("Disabled"));
    }

    #[test]
    fn whitelist_remove_menu_lists_one_button_per_handle() {
        let cfg = config();
        let (_, keyboard) = render(
            Screen::WhitelistRemoveMenu,
            &cfg,
            &Default::default(),
            at(12, 0),
        );
        // Two handles plus the back button, one per row.
        assert_eq!(keyboard.rows.len(), 3);
        assert_eq!(keyboard.rows[0][0].callback_data, "remove_@gif");
        assert_eq!(keyboard.rows[1][0].callback_data, "remove_@vid");
        assert_eq!(keyboard.rows[2][0].callback_data, "back_to_whitelist");
    }

    #[test]
    fn status_reports_whether_deletion_is_active() {
        let mut cfg = config();
        cfg.time_range.mode = DeleteMode::TimeRange; // default window 22:00-08:00
        let (text, _) = render(Screen::Status, &cfg, &Default::default(), at(23, 0));
        assert!(text.contains("✅ YES"));
        let (text, _) = render(Screen::Status, &cfg, &Default::default(), at(12, 0));
        assert!(text.contains("❌ NO"));
        assert!(text.contains("12:00"));
    }

    #[test]
    fn end_prompt_shows_the_pending_start() {
        let cfg = config();
        let cursor = ConversationState {
            pending_start: Some((22, 30)),
            ..Default::default()
        };
        let (text, _) = render(Screen::TimeEndPrompt, &cfg, &cursor, at(12, 0));
        assert!(text.contains("22:30"));
    }

    #[test]
    fn menu_handles_are_html_escaped() {
        let mut cfg = config();
        cfg.whitelist.push("@<i>bot".to_string());
        let (text, _) = render(Screen::WhitelistMenu, &cfg, &Default::default(), at(12, 0));
        assert!(text.contains("@&lt;i&gt;bot"));
        assert!(!text.contains("@<i>bot"));
    }
}
