//! Layered intent classification.
//!
//! Cheap deterministic layers run first: a structural shortcut for fully
//! specified booking requests, then greeting and emergency keyword checks.
//! When an embedding backend is attached, a hybrid score over keyword hits
//! and exemplar similarity decides next, and a plain keyword cascade is the
//! final fallback before the FAQ default.

use std::collections::HashMap;
use std::sync::Arc;

use mediq_core::config::ClassifierConfig;
use mediq_core::error::Result;
use mediq_core::types::Intent;
use mediq_vector::{cosine_similarity, SimilarityBackend};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

struct ClassifierPatterns {
    titled_doctor: Regex,
    iso_date: Regex,
    clock_time: Regex,
    greeting_word: Regex,
    greeting_phrase: Regex,
    emergency: Regex,
    cancel: Regex,
    booking: Regex,
    doctor_info: Regex,
    services: Regex,
    location: Regex,
    timings: Regex,
    contact: Regex,
    symptom: Regex,
}

static PATTERNS: LazyLock<ClassifierPatterns> = LazyLock::new(|| ClassifierPatterns {
    titled_doctor: Regex::new(r"(?i)\bdr\.?\s+[a-z]+").unwrap(),
    iso_date: Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").unwrap(),
    clock_time: Regex::new(r"\b\d{1,2}:\d{2}\b").unwrap(),
    greeting_word: Regex::new(r"\b(?:hi|hii|hello|hey|howdy|sup|greetings)\b").unwrap(),
    greeting_phrase: Regex::new(
        r"(?:good (?:morning|afternoon|evening)|how are you|what'?s up)",
    )
    .unwrap(),
    emergency: Regex::new(r"\b(?:emergency|urgent|critical|immediate)[a-z]*\b|help now").unwrap(),
    cancel: Regex::new(r"\bcancel[a-z]*\b|\breschedul[a-z]*\b|\bchange\b.*\bappointment\b")
        .unwrap(),
    booking: Regex::new(r"\b(?:book|appointment|schedule|reserve|appoint)[a-z]*\b").unwrap(),
    doctor_info: Regex::new(r"\b(?:doctor|physician|specialist)s?\b").unwrap(),
    services: Regex::new(r"\b(?:service|facility|facilities|department|offer)[a-z]*\b").unwrap(),
    location: Regex::new(r"\b(?:address|location|where|located)\b").unwrap(),
    timings: Regex::new(r"\b(?:timings?|times?|opd|open|close|closing|hours?)\b").unwrap(),
    contact: Regex::new(r"\b(?:contact|phone|call|email|number)s?\b").unwrap(),
    symptom: Regex::new(
        r"\b(?:have|suffering|feeling|feel|pain|problem|issue|symptom|disease)[a-z]*\b",
    )
    .unwrap(),
});

/// Example utterances per intent, embedded once at construction for
/// similarity scoring.
static INTENT_EXEMPLARS: &[(Intent, &[&str])] = &[
    (
        Intent::AppointmentBooking,
        &[
            "I want to book an appointment",
            "Can I schedule a visit with a doctor",
            "Book me with Dr. Smith tomorrow",
            "I need to reserve an appointment slot",
        ],
    ),
    (
        Intent::DoctorInfo,
        &[
            "Which doctors do you have",
            "Tell me about your cardiologists",
            "Who is the best specialist for skin problems",
        ],
    ),
    (
        Intent::Services,
        &[
            "What services does the hospital offer",
            "What departments do you have",
            "What facilities are available",
        ],
    ),
    (
        Intent::Location,
        &[
            "Where is the hospital located",
            "What is your address",
            "How do I get to the hospital",
        ],
    ),
    (
        Intent::Timings,
        &[
            "What are the OPD timings",
            "When does the hospital open",
            "What time do you close",
        ],
    ),
    (
        Intent::Contact,
        &[
            "How can I contact the hospital",
            "What is your phone number",
            "Give me your email address",
        ],
    ),
    (
        Intent::SymptomQuery,
        &[
            "I have chest pain",
            "I am suffering from headaches",
            "My child has a fever",
        ],
    ),
];

/// Layered intent classifier over keyword patterns with optional
/// exemplar-similarity scoring.
pub struct IntentClassifier {
    config: ClassifierConfig,
    backend: Option<Arc<dyn SimilarityBackend>>,
    exemplar_embeddings: HashMap<Intent, Vec<Vec<f32>>>,
}

impl std::fmt::Debug for IntentClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentClassifier")
            .field("config", &self.config)
            .field("similarity_enabled", &self.backend.is_some())
            .finish()
    }
}

impl IntentClassifier {
    /// Keyword-only classifier; no embedding backend.
    pub fn pattern_only(config: ClassifierConfig) -> Self {
        Self {
            config,
            backend: None,
            exemplar_embeddings: HashMap::new(),
        }
    }

    /// Classifier with hybrid pattern/similarity scoring. Exemplar
    /// embeddings are computed up front so classification never embeds
    /// more than the incoming utterance.
    pub fn with_similarity(
        config: ClassifierConfig,
        backend: Arc<dyn SimilarityBackend>,
    ) -> Result<Self> {
        let mut exemplar_embeddings = HashMap::new();
        for (intent, examples) in INTENT_EXEMPLARS {
            let mut vectors = Vec::with_capacity(examples.len());
            for example in *examples {
                vectors.push(backend.embed(example)?);
            }
            exemplar_embeddings.insert(*intent, vectors);
        }
        debug!(intents = exemplar_embeddings.len(), "Intent exemplars embedded");
        Ok(Self {
            config,
            backend: Some(backend),
            exemplar_embeddings,
        })
    }

    /// Classify an utterance, optionally biased by a short conversation
    /// summary that is folded into the similarity text.
    pub fn classify(&self, text: &str, conversation_summary: Option<&str>) -> Intent {
        let lower = text.to_lowercase();
        if lower.trim().is_empty() {
            return Intent::Faq;
        }

        // Fully specified booking requests skip everything else.
        if PATTERNS.titled_doctor.is_match(&lower)
            && PATTERNS.iso_date.is_match(&lower)
            && PATTERNS.clock_time.is_match(&lower)
        {
            return Intent::AppointmentBooking;
        }

        if PATTERNS.greeting_word.is_match(&lower) || PATTERNS.greeting_phrase.is_match(&lower) {
            return Intent::Greeting;
        }

        if PATTERNS.emergency.is_match(&lower) {
            return Intent::Emergency;
        }

        // Checked before booking keywords: "cancel my appointment" and
        // "reschedule my appointment" carry booking vocabulary.
        if PATTERNS.cancel.is_match(&lower) {
            return Intent::CancelAppointment;
        }

        if self.backend.is_some() {
            if let Some(intent) = self.classify_scored(&lower, conversation_summary) {
                return intent;
            }
        }

        self.classify_cascade(&lower)
    }

    /// Hybrid scoring layer. Returns `None` when no intent clears the
    /// confidence threshold or the backend fails, letting the keyword
    /// cascade decide.
    fn classify_scored(&self, lower: &str, conversation_summary: Option<&str>) -> Option<Intent> {
        let backend = self.backend.as_ref()?;

        let similarity_text = match conversation_summary {
            Some(summary) if !summary.is_empty() => format!("{summary} {lower}"),
            _ => lower.to_string(),
        };
        let query = match backend.embed(&similarity_text) {
            Ok(vector) => vector,
            Err(err) => {
                warn!(error = %err, "Embedding failed, using keyword cascade");
                return None;
            }
        };

        let mut best: Option<(Intent, f32)> = None;
        for intent in Intent::ALL {
            let pattern = if self.pattern_hit(lower, intent) { 1.0 } else { 0.0 };
            let similarity = self
                .exemplar_embeddings
                .get(&intent)
                .map(|vectors| {
                    vectors
                        .iter()
                        .map(|v| cosine_similarity(&query, v))
                        .fold(0.0f32, f32::max)
                })
                .unwrap_or(0.0);

            let score = self.config.pattern_weight * pattern
                + self.config.similarity_weight * similarity;
            if best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((intent, score));
            }
        }

        match best {
            Some((intent, score)) if score > self.config.confidence_threshold => {
                debug!(%intent, score, "Intent accepted by hybrid score");
                Some(intent)
            }
            _ => None,
        }
    }

    fn pattern_hit(&self, lower: &str, intent: Intent) -> bool {
        match intent {
            Intent::AppointmentBooking => PATTERNS.booking.is_match(lower),
            Intent::DoctorInfo => {
                PATTERNS.doctor_info.is_match(lower) || PATTERNS.titled_doctor.is_match(lower)
            }
            Intent::Services => PATTERNS.services.is_match(lower),
            Intent::Location => PATTERNS.location.is_match(lower),
            Intent::Timings => PATTERNS.timings.is_match(lower),
            Intent::Contact => PATTERNS.contact.is_match(lower),
            Intent::SymptomQuery => {
                PATTERNS.symptom.is_match(lower) && !PATTERNS.booking.is_match(lower)
            }
            _ => false,
        }
    }

    /// Ordered keyword fallback; first matching intent wins.
    fn classify_cascade(&self, lower: &str) -> Intent {
        if PATTERNS.booking.is_match(lower) {
            return Intent::AppointmentBooking;
        }
        if PATTERNS.doctor_info.is_match(lower) || PATTERNS.titled_doctor.is_match(lower) {
            return Intent::DoctorInfo;
        }
        if PATTERNS.services.is_match(lower) {
            return Intent::Services;
        }
        if PATTERNS.location.is_match(lower) {
            return Intent::Location;
        }
        if PATTERNS.timings.is_match(lower) {
            return Intent::Timings;
        }
        if PATTERNS.contact.is_match(lower) {
            return Intent::Contact;
        }
        if PATTERNS.symptom.is_match(lower) {
            return Intent::SymptomQuery;
        }
        Intent::Faq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediq_vector::HashEmbedding;

    fn pattern_classifier() -> IntentClassifier {
        IntentClassifier::pattern_only(ClassifierConfig::default())
    }

    #[test]
    fn test_structural_booking_shortcut() {
        let c = pattern_classifier();
        assert_eq!(
            c.classify("Dr. Smith on 2026-09-01 at 10:30", None),
            Intent::AppointmentBooking
        );
    }

    #[test]
    fn test_greeting_words() {
        let c = pattern_classifier();
        assert_eq!(c.classify("hello", None), Intent::Greeting);
        assert_eq!(c.classify("Good morning!", None), Intent::Greeting);
        assert_eq!(c.classify("how are you", None), Intent::Greeting);
    }

    #[test]
    fn test_greeting_needs_word_boundary() {
        // "this" contains "hi" but is not a greeting.
        let c = pattern_classifier();
        assert_ne!(c.classify("is this the right place", None), Intent::Greeting);
    }

    #[test]
    fn test_emergency_detection() {
        let c = pattern_classifier();
        assert_eq!(c.classify("this is an emergency", None), Intent::Emergency);
        assert_eq!(c.classify("I need urgent care", None), Intent::Emergency);
    }

    #[test]
    fn test_cancel_beats_booking_keywords() {
        let c = pattern_classifier();
        assert_eq!(
            c.classify("cancel my appointment", None),
            Intent::CancelAppointment
        );
        assert_eq!(
            c.classify("I need to cancel appointment 12", None),
            Intent::CancelAppointment
        );
    }

    #[test]
    fn test_reschedule_is_a_cancellation_cue() {
        let c = pattern_classifier();
        assert_eq!(
            c.classify("I need to reschedule my appointment", None),
            Intent::CancelAppointment
        );
        assert_eq!(
            c.classify("can I change my appointment", None),
            Intent::CancelAppointment
        );
    }

    #[test]
    fn test_booking_cascade() {
        let c = pattern_classifier();
        assert_eq!(
            c.classify("Book Dr. Smith tomorrow at 10am", None),
            Intent::AppointmentBooking
        );
        assert_eq!(
            c.classify("I want an appointment", None),
            Intent::AppointmentBooking
        );
    }

    #[test]
    fn test_doctor_info_cascade() {
        let c = pattern_classifier();
        assert_eq!(c.classify("which doctors are available", None), Intent::DoctorInfo);
        // A titled name counts even without the word "doctor".
        assert_eq!(
            c.classify("tell me about Dr. Sarah Johnson", None),
            Intent::DoctorInfo
        );
    }

    #[test]
    fn test_services_cascade() {
        let c = pattern_classifier();
        assert_eq!(c.classify("what departments do you have", None), Intent::Services);
    }

    #[test]
    fn test_location_and_timings() {
        let c = pattern_classifier();
        assert_eq!(c.classify("where is the hospital", None), Intent::Location);
        assert_eq!(c.classify("what are the OPD timings", None), Intent::Timings);
    }

    #[test]
    fn test_contact_cascade() {
        let c = pattern_classifier();
        assert_eq!(c.classify("give me your phone number", None), Intent::Contact);
    }

    #[test]
    fn test_symptom_query_without_booking_words() {
        let c = pattern_classifier();
        assert_eq!(c.classify("I am suffering from migraines", None), Intent::SymptomQuery);
    }

    #[test]
    fn test_booking_beats_symptom_keywords() {
        let c = pattern_classifier();
        assert_eq!(
            c.classify("I have pain, book an appointment", None),
            Intent::AppointmentBooking
        );
    }

    #[test]
    fn test_faq_default() {
        let c = pattern_classifier();
        assert_eq!(c.classify("do you validate parking tickets", None), Intent::Faq);
        assert_eq!(c.classify("", None), Intent::Faq);
    }

    #[test]
    fn test_hybrid_agrees_on_keyword_hits() {
        let c = IntentClassifier::with_similarity(
            ClassifierConfig::default(),
            Arc::new(HashEmbedding::new()),
        )
        .unwrap();
        assert_eq!(
            c.classify("I want to book an appointment", None),
            Intent::AppointmentBooking
        );
        assert_eq!(c.classify("where are you located", None), Intent::Location);
    }

    #[test]
    fn test_hybrid_falls_back_to_cascade_below_threshold() {
        // No keyword hit and hash embeddings will not push any exemplar
        // similarity high enough to clear the threshold alone.
        let c = IntentClassifier::with_similarity(
            ClassifierConfig::default(),
            Arc::new(HashEmbedding::new()),
        )
        .unwrap();
        assert_eq!(c.classify("tell me something interesting", None), Intent::Faq);
    }

    #[test]
    fn test_summary_does_not_break_keyword_layers() {
        let c = pattern_classifier();
        assert_eq!(
            c.classify("hello", Some("user: I had asked about doctors")),
            Intent::Greeting
        );
    }
}
