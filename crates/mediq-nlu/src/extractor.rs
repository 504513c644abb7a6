//! Structured entity extraction.
//!
//! Pulls doctor, date, time, department, patient name, and phone fields out
//! of raw utterances with ordered regex passes. A field is filled at most
//! once per call; later passes never overwrite an earlier hit.

use mediq_core::types::Entities;
use regex::Regex;
use std::sync::LazyLock;

use crate::datetime::DateTimeParser;

// =============================================================================
// Compiled regex sets
// =============================================================================

struct DoctorPatterns {
    titled: Regex,
    verb_phrase: Regex,
    with_for: Regex,
    list_echo: Regex,
}

static DOCTOR_PATTERNS: LazyLock<DoctorPatterns> = LazyLock::new(|| DoctorPatterns {
    // "Dr. John Smith" / "DR Smith". Case-insensitivity covers the title
    // only; the name classes stay case-sensitive so a lowercase word after
    // a single-word name ("Dr. Smith in?") is not swallowed.
    titled: Regex::new(r"\b(?i:dr)\.?\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)").unwrap(),
    // "see doctor Sarah Johnson", "book with Dr. Sarah".
    verb_phrase: Regex::new(
        r"(?i:go to|see|visit|with|book.*with)\s+(?i:doctor|dr\.?)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
    )
    .unwrap(),
    // "book appointment with Sarah Johnson" (no title).
    with_for: Regex::new(
        r"(?i:book|appointment|schedule).*?(?i:with|for)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
    )
    .unwrap(),
    // "Sarah Johnson - Orthopedics", echoed back from a shown list. Most
    // permissive, so tried last and only with a selection cue present.
    list_echo: Regex::new(r"([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)\s*-\s*[A-Za-z]+(?:\s*:\s*Dr\.?)?")
        .unwrap(),
});

/// Stop words that disqualify a `with_for` capture as a name.
static NAME_STOP_WORDS: &[&str] = &[
    "appointment",
    "book",
    "schedule",
    "an",
    "the",
    "a",
    "for",
    "with",
];

/// Words indicating the utterance asks about a place, not a person.
static PLACE_QUERY_WORDS: &[&str] = &["address", "location", "where", "located"];

/// Selection cues that activate the list-echo doctor pattern.
static SELECTION_CUES: &[&str] = &["this", "that", "one", "select", "choose"];

static DATE_FALLBACKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\d{4}-\d{2}-\d{2}",
        r"\d{2}/\d{2}/\d{4}",
        r"\d{2}-\d{2}-\d{4}",
        r"\d{4}/\d{2}/\d{2}",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TIME_FALLBACKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\d{1,2}:\d{2}(?:\s*(?:am|pm))?",
        r"\d{1,2}:\d{2}",
        r"(?i)\d{1,2}\s*(?:am|pm)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Department vocabulary: surface form to canonical label.
static DEPARTMENT_VOCAB: &[(&str, &str)] = &[
    ("cardiology", "Cardiology"),
    ("orthopedics", "Orthopedics"),
    ("orthopedic", "Orthopedics"),
    ("pediatrics", "Pediatrics"),
    ("pediatric", "Pediatrics"),
    ("general medicine", "General Medicine"),
    ("emergency", "Emergency"),
    ("emergency department", "Emergency"),
    ("cardiac", "Cardiology"),
    ("heart", "Cardiology"),
    ("bone", "Orthopedics"),
    ("child", "Pediatrics"),
    ("ent", "ENT"),
];

static DEPARTMENT_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    DEPARTMENT_VOCAB
        .iter()
        .map(|(key, name)| {
            let re = Regex::new(&format!(r"\b{}\b", regex::escape(key))).unwrap();
            (re, *name)
        })
        .collect()
});

static PHONE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // US-style separated format.
        r"\+?\d{1,3}[-.\s]?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}",
        // Bare 10 digits.
        r"\d{10}",
        // Generic international grouping.
        r"\+?\d{1,4}[-.\s]?\d{1,4}[-.\s]?\d{1,4}[-.\s]?\d{1,9}",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

fn has_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|t| t.eq_ignore_ascii_case(word))
}

fn has_any_word(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| has_word(text, w))
}

fn with_dr_prefix(name: &str) -> String {
    if name.to_lowercase().starts_with("dr") {
        name.to_string()
    } else {
        format!("Dr. {}", name)
    }
}

// =============================================================================
// EntityExtractor
// =============================================================================

/// Regex-driven entity extractor with optional prior-turn back-fill.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    parser: DateTimeParser,
    /// Words whose presence suppresses department back-fill (configurable
    /// policy, see the context section of the configuration).
    backfill_suppress: Vec<String>,
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityExtractor {
    pub fn new() -> Self {
        Self::with_suppress_words(vec![
            "book".to_string(),
            "appointment".to_string(),
            "schedule".to_string(),
            "reserve".to_string(),
        ])
    }

    pub fn with_suppress_words(backfill_suppress: Vec<String>) -> Self {
        Self {
            parser: DateTimeParser::new(),
            backfill_suppress,
        }
    }

    /// Extract entities from `text` alone.
    pub fn extract(&self, text: &str) -> Entities {
        self.extract_with_context(text, None)
    }

    /// Extract entities from `text`, then back-fill still-empty fields from
    /// the prior turn's entities.
    ///
    /// Department is never back-filled when the current text carries booking
    /// words or an explicit doctor mention, so a sticky department cannot
    /// leak into doctor-specific turns.
    pub fn extract_with_context(&self, text: &str, prior: Option<&Entities>) -> Entities {
        let mut entities = Entities::default();
        let lower = text.to_lowercase();

        self.extract_doctor(text, &lower, &mut entities);
        self.extract_date(text, &mut entities);
        self.extract_time(text, &mut entities);
        self.extract_department(&lower, &mut entities);
        self.extract_phone(text, &mut entities);

        if let Some(prior) = prior {
            self.backfill(&lower, prior, &mut entities);
        }

        entities
    }

    fn extract_doctor(&self, text: &str, lower: &str, entities: &mut Entities) {
        let pats = &*DOCTOR_PATTERNS;

        if let Some(m) = pats.titled.find(text) {
            // A titled name inside a place question ("where is Dr. Smith's
            // office") is not a doctor slot.
            if !has_any_word(lower, PLACE_QUERY_WORDS) {
                entities.doctor = Some(m.as_str().to_string());
            }
        }

        if entities.doctor.is_none() {
            if let Some(caps) = pats.verb_phrase.captures(text) {
                entities.doctor = Some(with_dr_prefix(&caps[1]));
            }
        }

        if entities.doctor.is_none() {
            if let Some(caps) = pats.with_for.captures(text) {
                let candidate = &caps[1];
                let candidate_lower = candidate.to_lowercase();
                let clean = !candidate_lower
                    .split_whitespace()
                    .any(|t| NAME_STOP_WORDS.contains(&t))
                    && !candidate_lower.contains("appointment");
                if clean {
                    entities.doctor = Some(format!("Dr. {}", candidate));
                }
            }
        }

        if entities.doctor.is_none() && has_any_word(lower, SELECTION_CUES) {
            if let Some(caps) = pats.list_echo.captures(text) {
                entities.doctor = Some(with_dr_prefix(&caps[1]));
            }
        }
    }

    fn extract_date(&self, text: &str, entities: &mut Entities) {
        if let Some(parsed) = self.parser.parse_date(text) {
            entities.date = Some(parsed);
            return;
        }
        for pattern in DATE_FALLBACKS.iter() {
            if let Some(m) = pattern.find(text) {
                entities.date = Some(
                    self.parser
                        .normalize_date(m.as_str())
                        .unwrap_or_else(|| m.as_str().to_string()),
                );
                return;
            }
        }
    }

    fn extract_time(&self, text: &str, entities: &mut Entities) {
        if let Some(parsed) = self.parser.parse_time(text) {
            entities.time = Some(parsed);
            return;
        }
        for pattern in TIME_FALLBACKS.iter() {
            if let Some(m) = pattern.find(text) {
                let raw = m.as_str();
                if let Some(normalized) = self.parser.normalize_time(raw) {
                    entities.time = Some(normalized);
                } else if raw.contains(':') {
                    entities.time = Some(raw.to_string());
                }
                return;
            }
        }
    }

    fn extract_department(&self, lower: &str, entities: &mut Entities) {
        for (pattern, name) in DEPARTMENT_PATTERNS.iter() {
            if pattern.is_match(lower) {
                entities.department = Some((*name).to_string());
                return;
            }
        }
    }

    fn extract_phone(&self, text: &str, entities: &mut Entities) {
        for pattern in PHONE_PATTERNS.iter() {
            if let Some(m) = pattern.find(text) {
                let candidate = m.as_str();
                // The loose grouping pattern also matches date strings and
                // bare years. A phone number has at least 7 digits and no
                // calendar shape.
                let digits = candidate.chars().filter(|c| c.is_ascii_digit()).count();
                if digits < 7 || DATE_FALLBACKS.iter().any(|d| d.is_match(candidate)) {
                    continue;
                }
                entities.phone = Some(candidate.to_string());
                return;
            }
        }
    }

    fn backfill(&self, lower: &str, prior: &Entities, entities: &mut Entities) {
        let has_booking_words = self
            .backfill_suppress
            .iter()
            .any(|w| has_word(lower, w));
        // A doctor slot at this point can only have come from the current
        // text; back-fill has not run yet.
        let has_doctor_mention = entities.doctor.is_some();

        if entities.doctor.is_none() {
            entities.doctor = prior.doctor.clone();
        }
        if entities.date.is_none() {
            entities.date = prior.date.clone();
        }
        if entities.time.is_none() {
            entities.time = prior.time.clone();
        }
        if entities.department.is_none() && !has_booking_words && !has_doctor_mention {
            entities.department = prior.department.clone();
        }
    }
}
