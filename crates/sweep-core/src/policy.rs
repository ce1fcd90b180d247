use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// When inline-bot messages should be removed from a chat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    Always,
    TimeRange,
    Disabled,
}

/// Daily deletion window. `start > end` means the window spans midnight;
/// `start == end` is an empty window that never matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_hour: u32,
    pub start_minute: u32,
    pub end_hour: u32,
    pub end_minute: u32,
    pub mode: DeleteMode,
}

impl Default for TimeRange {
    fn default() -> Self {
        Self {
            start_hour: 22,
            start_minute: 0,
            end_hour: 8,
            end_minute: 0,
            mode: DeleteMode::Always,
        }
    }
}

impl TimeRange {
    pub fn start(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.start_hour, self.start_minute, 0).unwrap_or(NaiveTime::MIN)
    }

    pub fn end(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.end_hour, self.end_minute, 0).unwrap_or(NaiveTime::MIN)
    }

    /// Whether a message arriving at `at` falls inside the deletion window.
    ///
    /// Pure: callers supply the time, this never reads the clock.
    pub fn should_delete_at(&self, at: NaiveTime) -> bool {
        match self.mode {
            DeleteMode::Disabled => false,
            DeleteMode::Always => true,
            DeleteMode::TimeRange => {
                let start = self.start();
                let end = self.end();
                if start < end {
                    start <= at && at < end
                } else if start > end {
                    // Spans midnight.
                    at >= start || at < end
                } else {
                    // Empty window, not a full day.
                    false
                }
            }
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            DeleteMode::Always => write!(f, "Always"),
            DeleteMode::Disabled => write!(f, "Disabled"),
            DeleteMode::TimeRange => write!(
                f,
                "{:02}:{:02} - {:02}:{:02}",
                self.start_hour, self.start_minute, self.end_hour, self.end_minute
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: (u32, u32), end: (u32, u32), mode: DeleteMode) -> TimeRange {
        TimeRange {
            start_hour: start.0,
            start_minute: start.1,
            end_hour: end.0,
            end_minute: end.1,
            mode,
        }
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn non_wrapping_window_is_half_open() {
        let tr = range((9, 0), (17, 0), DeleteMode::TimeRange);
        assert!(tr.should_delete_at(at(9, 0))); // start inclusive
        assert!(tr.should_delete_at(at(12, 30)));
        assert!(!tr.should_delete_at(at(17, 0))); // end exclusive
        assert!(!tr.should_delete_at(at(8, 59)));
        assert!(!tr.should_delete_at(at(23, 0)));
    }

    #[test]
    fn wrapping_window_covers_both_sides_of_midnight() {
        let tr = range((22, 0), (8, 0), DeleteMode::TimeRange);
        assert!(tr.should_delete_at(at(22, 0)));
        assert!(tr.should_delete_at(at(23, 59)));
        assert!(tr.should_delete_at(at(0, 0)));
        assert!(tr.should_delete_at(at(7, 59)));
        assert!(!tr.should_delete_at(at(8, 0)));
        assert!(!tr.should_delete_at(at(12, 0)));
        assert!(!tr.should_delete_at(at(21, 59)));
    }

    #[test]
    fn equal_start_and_end_never_matches() {
        let tr = range((10, 30), (10, 30), DeleteMode::TimeRange);
        assert!(!tr.should_delete_at(at(10, 30)));
        assert!(!tr.should_delete_at(at(10, 29)));
        assert!(!tr.should_delete_at(at(0, 0)));
        assert!(!tr.should_delete_at(at(23, 59)));
    }

    #[test]
    fn always_and_disabled_ignore_the_window() {
        let always = range((22, 0), (8, 0), DeleteMode::Always);
        let disabled = range((22, 0), (8, 0), DeleteMode::Disabled);
        for t in [at(0, 0), at(8, 0), at(12, 0), at(22, 0)] {
            assert!(always.should_delete_at(t));
            assert!(!disabled.should_delete_at(t));
        }
    }

    #[test]
    fn display_reflects_mode() {
        assert_eq!(TimeRange::default().to_string(), "Always");
        let tr = range((22, 0), (8, 5), DeleteMode::TimeRange);
        assert_eq!(tr.to_string(), "22:00 - 08:05");
        let off = range((0, 0), (0, 0), DeleteMode::Disabled);
        assert_eq!(off.to_string(), "Disabled");
    }
}
