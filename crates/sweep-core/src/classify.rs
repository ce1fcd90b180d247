use std::sync::OnceLock;

use regex::Regex;

use crate::domain::InboundMessage;

/// Result of the inline-origin heuristic for one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineClassification {
    pub is_inline_origin: bool,
    /// `@handle` of the originating bot, when one could be determined.
    pub origin_handle: Option<String>,
}

impl InlineClassification {
    fn inline(origin_handle: Option<String>) -> Self {
        Self {
            is_inline_origin: true,
            origin_handle,
        }
    }

    fn not_inline() -> Self {
        Self {
            is_inline_origin: false,
            origin_handle: None,
        }
    }
}

/// Ordered "via <bot>" phrase patterns: the first pattern matching anywhere
/// in the text wins, capture group 1 is the handle. The handle must end in
/// a case-insensitive "bot" suffix; its casing is preserved as written.
///
/// Known-imperfect heuristic: unsupported phrasings false-negative, user
/// text that happens to match false-positives. Kept as-is deliberately.
const VIA_PATTERNS: [&str; 5] = [
    r"[Vv]ia\s+(@\w+[Bb]ot\b)",
    r"[Cc]\s+помощью\s+(@\w+[Bb]ot\b)",
    r"[Чч]ерез\s+(@\w+[Bb]ot\b)",
    r"[Ww]ith\s+(@\w+[Bb]ot\b)",
    r"[Bb]y\s+(@\w+[Bb]ot\b)",
];

fn via_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        VIA_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("via pattern compiles"))
            .collect()
    })
}

/// Decide whether a message originated from an inline bot query.
///
/// The platform's relay marker is authoritative when present; otherwise a
/// message with an attached inline keyboard and text is scanned for a
/// "via <bot>" attribution phrase.
pub fn classify(msg: &InboundMessage) -> InlineClassification {
    if let Some(via) = &msg.via_bot {
        let handle = via.username.as_ref().map(|u| format!("@{u}"));
        return InlineClassification::inline(handle);
    }

    if msg.has_inline_keyboard {
        if let Some(text) = msg.text_or_caption().filter(|t| !t.is_empty()) {
            for pattern in via_patterns() {
                if let Some(caps) = pattern.captures(text) {
                    let handle = caps.get(1).map(|m| m.as_str().to_string());
                    return InlineClassification::inline(handle);
                }
            }
        }
    }

    InlineClassification::not_inline()
}
