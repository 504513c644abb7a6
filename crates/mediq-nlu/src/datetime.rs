//! Natural-language date and time parsing.
//!
//! Converts free-text phrases ("tomorrow", "next monday", "10 pm") to
//! canonical `YYYY-MM-DD` / `HH:MM` strings. Rules are checked in a fixed
//! priority order; unparseable input yields `None`, never an error.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveTime, Timelike};
use regex::Regex;
use std::sync::LazyLock;

// =============================================================================
// Compiled regex sets (compiled once, reused across calls)
// =============================================================================

struct DatePatterns {
    iso: Regex,
    slash_mdy: Regex,
    dash_dmy: Regex,
}

static DATE_PATTERNS: LazyLock<DatePatterns> = LazyLock::new(|| DatePatterns {
    iso: Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").unwrap(),
    slash_mdy: Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap(),
    dash_dmy: Regex::new(r"\b(\d{1,2})-(\d{1,2})-(\d{4})\b").unwrap(),
});

struct TimePatterns {
    hour_minute: Regex,
    bare_hour_meridiem: Regex,
    bare_hour: Regex,
    am: Regex,
    pm: Regex,
}

static TIME_PATTERNS: LazyLock<TimePatterns> = LazyLock::new(|| TimePatterns {
    // The meridiem is captured together with the number: a suffix glued to
    // it ("3pm") has no word boundary in front of the "p", so a standalone
    // scan cannot see it.
    hour_minute: Regex::new(r"(?i)(\d{1,2}):(\d{2})\s*(a\.?m\.?|p\.?m\.?)?").unwrap(),
    bare_hour_meridiem: Regex::new(r"(?i)\b(\d{1,2})\s*(a\.?m\.?|p\.?m\.?)\b").unwrap(),
    bare_hour: Regex::new(r"\b(\d{1,2})\b").unwrap(),
    am: Regex::new(r"(?i)\ba\.?m\b\.?").unwrap(),
    pm: Regex::new(r"(?i)\bp\.?m\b\.?").unwrap(),
});

static WEEKDAYS: &[(&str, u32)] = &[
    ("monday", 0),
    ("tuesday", 1),
    ("wednesday", 2),
    ("thursday", 3),
    ("friday", 4),
    ("saturday", 5),
    ("sunday", 6),
];

/// Prepositions that mark a bare 1-2 digit number as a clock hour.
static HOUR_CONTEXT_WORDS: &[&str] = &["at", "around", "about", "by", "before", "after"];

/// True when `word` appears as a whole alphanumeric token in `text`.
fn has_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|t| t.eq_ignore_ascii_case(word))
}

// =============================================================================
// DateTimeParser
// =============================================================================

/// Rule-based parser for natural-language dates and times.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeParser;

impl DateTimeParser {
    pub fn new() -> Self {
        Self
    }

    // -----------------------------------------------------------------
    // Dates
    // -----------------------------------------------------------------

    /// Parse a natural-language date, relative to the local calendar date.
    /// Returns `YYYY-MM-DD` or `None`.
    pub fn parse_date(&self, text: &str) -> Option<String> {
        self.parse_date_on(text, Local::now().date_naive())
    }

    /// Parse a natural-language date relative to an explicit `today`.
    ///
    /// Priority: relative keywords, weekday names, relative spans, explicit
    /// numeric formats (`YYYY-MM-DD`, then `MM/DD/YYYY`, then `DD-MM-YYYY`).
    pub fn parse_date_on(&self, text: &str, today: NaiveDate) -> Option<String> {
        if text.is_empty() {
            return None;
        }
        let lower = text.to_lowercase();

        // "day after tomorrow" must be checked before "tomorrow", which it
        // contains as a substring.
        if lower.contains("day after tomorrow") || lower.contains("day after") {
            return Some(fmt_date(today + Duration::days(2)));
        }
        if has_word(&lower, "tomorrow") {
            return Some(fmt_date(today + Duration::days(1)));
        }
        if has_word(&lower, "today") {
            return Some(fmt_date(today));
        }
        if lower.contains("next week") {
            return Some(fmt_date(today + Duration::days(7)));
        }
        // Fixed 30-day offset, not calendar-month aware.
        if lower.contains("next month") {
            return Some(fmt_date(today + Duration::days(30)));
        }
        if lower.contains("next year") {
            return Some(fmt_date(today + Duration::days(365)));
        }

        for (day_name, day_num) in WEEKDAYS {
            if !has_word(&lower, day_name) {
                continue;
            }
            let today_num = today.weekday().num_days_from_monday();
            let mut days_ahead = *day_num as i64 - today_num as i64;
            // Same weekday or earlier in the week means next occurrence.
            if days_ahead <= 0 {
                days_ahead += 7;
            }
            // "next monday" skips one more week, but only when "next"
            // precedes the day name.
            if let (Some(next_pos), Some(day_pos)) = (lower.find("next"), lower.find(day_name)) {
                if next_pos < day_pos {
                    days_ahead += 7;
                }
            }
            return Some(fmt_date(today + Duration::days(days_ahead)));
        }

        if lower.contains("in a week") || lower.contains("week from now") {
            return Some(fmt_date(today + Duration::days(7)));
        }
        if lower.contains("in two weeks") || lower.contains("two weeks from now") {
            return Some(fmt_date(today + Duration::days(14)));
        }
        if lower.contains("in a month") || lower.contains("month from now") {
            return Some(fmt_date(today + Duration::days(30)));
        }

        let pats = &*DATE_PATTERNS;
        if let Some(m) = pats.iso.find(text) {
            return Some(m.as_str().to_string());
        }
        // Slash-separated dates are always month/day/year.
        if let Some(caps) = pats.slash_mdy.captures(text) {
            return Some(format!(
                "{}-{:0>2}-{:0>2}",
                &caps[3], &caps[1], &caps[2]
            ));
        }
        if let Some(caps) = pats.dash_dmy.captures(text) {
            return Some(format!(
                "{}-{:0>2}-{:0>2}",
                &caps[3], &caps[2], &caps[1]
            ));
        }

        None
    }

    // -----------------------------------------------------------------
    // Times
    // -----------------------------------------------------------------

    /// Parse a natural-language time, relative to the local clock.
    /// Returns `HH:MM` (24-hour) or `None`.
    pub fn parse_time(&self, text: &str) -> Option<String> {
        self.parse_time_at(text, Local::now().time())
    }

    /// Parse a natural-language time relative to an explicit clock reading.
    pub fn parse_time_at(&self, text: &str, now: NaiveTime) -> Option<String> {
        if text.is_empty() {
            return None;
        }
        let lower = text.to_lowercase();
        let pats = &*TIME_PATTERNS;

        if lower.contains("right now") || has_word(&lower, "now") {
            return Some(format!("{:02}:{:02}", now.hour(), now.minute()));
        }

        if has_word(&lower, "morning") {
            return Some(
                if has_word(&lower, "early") {
                    "08:00"
                } else if has_word(&lower, "late") {
                    "11:00"
                } else {
                    "09:00"
                }
                .to_string(),
            );
        }
        if has_word(&lower, "afternoon") {
            return Some(
                if has_word(&lower, "early") {
                    "13:00"
                } else if has_word(&lower, "late") {
                    "17:00"
                } else {
                    "14:00"
                }
                .to_string(),
            );
        }
        if has_word(&lower, "evening") || has_word(&lower, "tonight") {
            return Some(
                if has_word(&lower, "early") {
                    "17:00"
                } else if has_word(&lower, "late") {
                    "20:00"
                } else {
                    "18:00"
                }
                .to_string(),
            );
        }
        if has_word(&lower, "night") {
            return Some("20:00".to_string());
        }

        // H:MM with an am/pm suffix on the number, or a separated cue
        // elsewhere in the text as a fallback.
        if let Some(caps) = pats.hour_minute.captures(&lower) {
            let mut hour: u32 = caps[1].parse().ok()?;
            let mut minute: u32 = caps[2].parse().ok()?;
            let suffix = caps.get(3).map(|m| m.as_str().to_ascii_lowercase());
            let is_pm = match &suffix {
                Some(s) => s.starts_with('p'),
                None => pats.pm.is_match(&lower),
            };
            let is_am = match &suffix {
                Some(s) => s.starts_with('a'),
                None => pats.am.is_match(&lower),
            };
            if is_pm {
                if hour < 12 {
                    hour += 12;
                }
            } else if is_am && hour == 12 {
                hour = 0;
            }
            // Clamp out-of-range components rather than rejecting.
            hour = hour.min(23);
            minute = minute.min(59);
            return Some(format!("{:02}:{:02}", hour, minute));
        }

        // Bare hour with am/pm suffix ("10 am", "3pm").
        if let Some(caps) = pats.bare_hour_meridiem.captures(&lower) {
            let mut hour: u32 = caps[1].parse().ok()?;
            if caps[2].to_ascii_lowercase().starts_with('p') {
                if hour < 12 {
                    hour += 12;
                }
            } else if hour == 12 {
                hour = 0;
            }
            hour = hour.min(23);
            return Some(format!("{:02}:00", hour));
        }

        // Bare 1-2 digit hour, only when a contextual preposition marks it
        // as a time ("at 5", "around 3"). Defaults to PM without a cue.
        if HOUR_CONTEXT_WORDS.iter().any(|w| has_word(&lower, w)) {
            if let Some(caps) = pats.bare_hour.captures(&lower) {
                let mut hour: u32 = caps[1].parse().ok()?;
                if (1..=12).contains(&hour) {
                    if has_word(&lower, "morning") || pats.am.is_match(&lower) {
                        if hour == 12 {
                            hour = 0;
                        }
                    } else if hour < 12 {
                        hour += 12;
                    }
                    return Some(format!("{:02}:00", hour));
                }
            }
        }

        None
    }

    // -----------------------------------------------------------------
    // Normalization
    // -----------------------------------------------------------------

    /// Normalize a date string to `YYYY-MM-DD`, accepting either a natural
    /// phrase or an already-canonical value.
    pub fn normalize_date(&self, date_str: &str) -> Option<String> {
        self.normalize_date_on(date_str, Local::now().date_naive())
    }

    pub fn normalize_date_on(&self, date_str: &str, today: NaiveDate) -> Option<String> {
        if date_str.is_empty() {
            return None;
        }
        if let Some(parsed) = self.parse_date_on(date_str, today) {
            return Some(parsed);
        }
        if DATE_PATTERNS.iso.is_match(date_str) {
            return Some(date_str.to_string());
        }
        None
    }

    /// Normalize a time string to `HH:MM`, accepting either a natural phrase
    /// or an already-canonical value.
    pub fn normalize_time(&self, time_str: &str) -> Option<String> {
        self.normalize_time_at(time_str, Local::now().time())
    }

    pub fn normalize_time_at(&self, time_str: &str, now: NaiveTime) -> Option<String> {
        if time_str.is_empty() {
            return None;
        }
        if let Some(parsed) = self.parse_time_at(time_str, now) {
            return Some(parsed);
        }
        if TIME_PATTERNS.hour_minute.is_match(time_str) {
            return Some(time_str.to_string());
        }
        None
    }
}

fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
