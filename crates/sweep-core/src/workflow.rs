use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::domain::{ChatId, MessageId};
use crate::policy::DeleteMode;
use crate::store::ChatConfig;

pub const MIN_DELAY_SECS: i64 = 5;
pub const MAX_DELAY_SECS: i64 = 3600;

/// Where a chat's settings dialog currently sits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SettingsState {
    #[default]
    MainMenu,
    TimeSettings,
    TimeRangeSetStart,
    TimeRangeSetEnd,
    WhitelistMenu,
    WhitelistAdd,
    WhitelistRemove,
    AutoDeleteSettings,
    AutoDeleteTimeSet,
}

impl SettingsState {
    /// States that consume the next free-text message in the chat.
    pub fn captures_text(self) -> bool {
        matches!(
            self,
            SettingsState::WhitelistAdd
                | SettingsState::AutoDeleteTimeSet
                | SettingsState::TimeRangeSetStart
                | SettingsState::TimeRangeSetEnd
        )
    }
}

/// Per-chat settings-dialog cursor.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConversationState {
    pub state: SettingsState,
    /// Menu message currently on screen; deleted before the next redisplay.
    pub last_menu: Option<MessageId>,
    /// Start time accepted while waiting for the end time.
    pub pending_start: Option<(u32, u32)>,
}

/// In-memory store of settings-dialog state, one cursor per chat.
///
/// Never torn down: a chat that stops interacting simply keeps its cursor
/// until the process exits.
#[derive(Default)]
pub struct SettingsFlow {
    chats: Mutex<HashMap<ChatId, ConversationState>>,
}

impl SettingsFlow {
    pub async fn get(&self, chat_id: ChatId) -> ConversationState {
        self.chats
            .lock()
            .await
            .get(&chat_id)
            .copied()
            .unwrap_or_default()
    }

    /// Read-modify-write a chat's cursor under the flow lock.
    pub async fn update(
        &self,
        chat_id: ChatId,
        f: impl FnOnce(&mut ConversationState),
    ) -> ConversationState {
        let mut chats = self.chats.lock().await;
        let cursor = chats.entry(chat_id).or_default();
        f(cursor);
        *cursor
    }
}

/// A settings menu press, decoded from callback data by the adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    ToggleGlobalOn,
    ToggleGlobalOff,
    TimeSettings,
    TimeAlways,
    TimeRangeEntry,
    WhitelistMenu,
    WhitelistAdd,
    WhitelistRemove,
    RemoveHandle(String),
    AutoDeleteSettings,
    AutoDeleteToggle,
    AutoDeleteSetTime,
    Status,
    BackToMain,
    BackToTime,
    BackToWhitelist,
    BackToAutoDelete,
}

impl Selection {
    /// Decode callback data. Unknown data yields `None` and is ignored.
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(handle) = data.strip_prefix("remove_") {
            return Some(Selection::RemoveHandle(handle.to_string()));
        }
        match data {
            "toggle_global_on" => Some(Selection::ToggleGlobalOn),
            "toggle_global_off" => Some(Selection::ToggleGlobalOff),
            "settings_time" => Some(Selection::TimeSettings),
            "time_always" => Some(Selection::TimeAlways),
            "time_range" => Some(Selection::TimeRangeEntry),
            "settings_whitelist" => Some(Selection::WhitelistMenu),
            "whitelist_add" => Some(Selection::WhitelistAdd),
            "whitelist_remove" => Some(Selection::WhitelistRemove),
            "settings_auto_delete" => Some(Selection::AutoDeleteSettings),
            "autodel_toggle" => Some(Selection::AutoDeleteToggle),
            "autodel_set_time" => Some(Selection::AutoDeleteSetTime),
            "settings_status" => Some(Selection::Status),
            "back_to_main" => Some(Selection::BackToMain),
            "back_to_time" => Some(Selection::BackToTime),
            "back_to_whitelist" => Some(Selection::BackToWhitelist),
            "back_to_auto_delete" => Some(Selection::BackToAutoDelete),
            _ => None,
        }
    }
}

/// What the presentation layer should draw after a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    MainMenu,
    TimeSettings,
    TimeStartPrompt,
    TimeEndPrompt,
    WhitelistMenu,
    WhitelistAddPrompt,
    WhitelistRemoveMenu,
    AutoDeleteSettings,
    AutoDeleteTimePrompt,
    Status,
}

impl Screen {
    /// The dialog state a chat is in while this screen is displayed.
    pub fn state(self) -> SettingsState {
        match self {
            Screen::MainMenu | Screen::Status => SettingsState::MainMenu,
            Screen::TimeSettings => SettingsState::TimeSettings,
            Screen::TimeStartPrompt => SettingsState::TimeRangeSetStart,
            Screen::TimeEndPrompt => SettingsState::TimeRangeSetEnd,
            Screen::WhitelistMenu => SettingsState::WhitelistMenu,
            Screen::WhitelistAddPrompt => SettingsState::WhitelistAdd,
            Screen::WhitelistRemoveMenu => SettingsState::WhitelistRemove,
            Screen::AutoDeleteSettings => SettingsState::AutoDeleteSettings,
            Screen::AutoDeleteTimePrompt => SettingsState::AutoDeleteTimeSet,
        }
    }
}

/// Short confirmation the adapter flashes as a callback toast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ack {
    DeletionEnabled,
    DeletionDisabled,
    HandleRemoved(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionOutcome {
    pub screen: Screen,
    pub ack: Option<Ack>,
}

/// Apply a menu press: mutate the config where the press demands it and
/// name the screen to render next.
pub fn apply_selection(config: &mut ChatConfig, selection: Selection) -> SelectionOutcome {
    let mut ack = None;
    let screen = match selection {
        Selection::ToggleGlobalOn => {
            config.time_range.mode = DeleteMode::Always;
            ack = Some(Ack::DeletionEnabled);
            Screen::MainMenu
        }
        Selection::ToggleGlobalOff => {
            config.time_range.mode = DeleteMode::Disabled;
            ack = Some(Ack::DeletionDisabled);
            Screen::MainMenu
        }
        Selection::TimeSettings | Selection::BackToTime => Screen::TimeSettings,
        Selection::TimeAlways => {
            config.time_range.mode = DeleteMode::Always;
            Screen::TimeSettings
        }
        // The windowed mode only activates once an end time is accepted.
        Selection::TimeRangeEntry => Screen::TimeStartPrompt,
        Selection::WhitelistMenu | Selection::BackToWhitelist => Screen::WhitelistMenu,
        Selection::WhitelistAdd => Screen::WhitelistAddPrompt,
        Selection::WhitelistRemove => Screen::WhitelistRemoveMenu,
        Selection::RemoveHandle(handle) => {
            if let Some(pos) = config.whitelist.iter().position(|w| w == &handle) {
                config.whitelist.remove(pos);
                ack = Some(Ack::HandleRemoved(handle));
            }
            Screen::WhitelistMenu
        }
        Selection::AutoDeleteSettings | Selection::BackToAutoDelete => Screen::AutoDeleteSettings,
        Selection::AutoDeleteToggle => {
            config.auto_delete.enabled = !config.auto_delete.enabled;
            Screen::AutoDeleteSettings
        }
        Selection::AutoDeleteSetTime => Screen::AutoDeleteTimePrompt,
        Selection::Status => Screen::Status,
        Selection::BackToMain => Screen::MainMenu,
    };
    SelectionOutcome { screen, ack }
}

/// Per-category summary of one whitelist-add input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WhitelistReport {
    pub added: Vec<String>,
    pub already_present: Vec<String>,
    pub invalid: Vec<String>,
}

impl WhitelistReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.already_present.is_empty() && self.invalid.is_empty()
    }
}

/// Tokenize a whitelist-add input on whitespace/newlines and sort every
/// token into added / already-present / invalid. Duplicates within one
/// input count as already-present from the second occurrence on.
pub fn add_to_whitelist(config: &mut ChatConfig, input: &str) -> WhitelistReport {
    let mut report = WhitelistReport::default();
    for token in input.split_whitespace() {
        if !token.starts_with('@') {
            report.invalid.push(token.to_string());
        } else if config.is_whitelisted(token) {
            report.already_present.push(token.to_string());
        } else {
            config.whitelist.push(token.to_string());
            report.added.push(token.to_string());
        }
    }
    report
}

/// Why a delay input was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelayError {
    NotANumber,
    OutOfRange,
}

/// Parse an auto-delete delay: an integer in [5, 3600], bounds inclusive.
pub fn parse_delay_input(input: &str) -> Result<u32, DelayError> {
    let secs: i64 = input
        .trim()
        .parse()
        .map_err(|_| DelayError::NotANumber)?;
    if (MIN_DELAY_SECS..=MAX_DELAY_SECS).contains(&secs) {
        Ok(secs as u32)
    } else {
        Err(DelayError::OutOfRange)
    }
}

/// Parse a strict `HH:MM` clock value with `0<=HH<=23`, `0<=MM<=59`.
pub fn parse_clock_input(input: &str) -> Option<(u32, u32)> {
    let mut parts = input.trim().split(':');
    let h: i64 = parts.next()?.trim().parse().ok()?;
    let m: i64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    if (0..=23).contains(&h) && (0..=59).contains(&m) {
        Some((h as u32, m as u32))
    } else {
        None
    }
}

/// Outcome of one free-text input while the dialog captures text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextOutcome {
    /// The dialog is not waiting for input; the message is not for us.
    NotCapturing,
    WhitelistUpdated(WhitelistReport),
    DelayAccepted(u32),
    DelayRejected(DelayError),
    StartAccepted { hour: u32, minute: u32 },
    EndAccepted { start: (u32, u32), end: (u32, u32) },
    TimeRejected,
}

/// Feed one free-text message into the dialog.
///
/// Mutates the cursor (state transition) and the config (accepted values);
/// rejected input leaves the state unchanged so the chat is re-prompted.
pub fn handle_free_text(
    cursor: &mut ConversationState,
    config: &mut ChatConfig,
    input: &str,
) -> TextOutcome {
    match cursor.state {
        SettingsState::WhitelistAdd => {
            let report = add_to_whitelist(config, input);
            if report.is_empty() {
                // Nothing usable in the input; stay and re-prompt.
                return TextOutcome::WhitelistUpdated(report);
            }
            cursor.state = SettingsState::WhitelistMenu;
            TextOutcome::WhitelistUpdated(report)
        }
        SettingsState::AutoDeleteTimeSet => match parse_delay_input(input) {
            Ok(secs) => {
                config.auto_delete.delete_after_secs = secs;
                cursor.state = SettingsState::AutoDeleteSettings;
                TextOutcome::DelayAccepted(secs)
            }
            Err(e) => TextOutcome::DelayRejected(e),
        },
        SettingsState::TimeRangeSetStart => match parse_clock_input(input) {
            Some((hour, minute)) => {
                cursor.pending_start = Some((hour, minute));
                cursor.state = SettingsState::TimeRangeSetEnd;
                TextOutcome::StartAccepted { hour, minute }
            }
            None => TextOutcome::TimeRejected,
        },
        SettingsState::TimeRangeSetEnd => match parse_clock_input(input) {
            Some((hour, minute)) => {
                let start = cursor.pending_start.take().unwrap_or((
                    config.time_range.start_hour,
                    config.time_range.start_minute,
                ));
                config.time_range.start_hour = start.0;
                config.time_range.start_minute = start.1;
                config.time_range.end_hour = hour;
                config.time_range.end_minute = minute;
                // Accepting the end time is what activates the window.
                config.time_range.mode = DeleteMode::TimeRange;
                cursor.state = SettingsState::TimeSettings;
                TextOutcome::EndAccepted {
                    start,
                    end: (hour, minute),
                }
            }
            None => TextOutcome::TimeRejected,
        },
        _ => TextOutcome::NotCapturing,
    }
}
