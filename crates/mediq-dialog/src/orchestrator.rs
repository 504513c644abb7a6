//! Turn-level orchestration.
//!
//! One `handle_turn` call runs the whole pipeline for a single utterance:
//! validation, classification, follow-up detection, entity extraction with
//! context carry-over, routing to the right responder, and session
//! bookkeeping. Retrieval and similarity scoring are optional; the
//! orchestrator degrades to keyword answers when they are absent or fail.

use std::sync::Arc;

use mediq_core::config::MediqConfig;
use mediq_core::types::{Entities, Intent, Role, TurnOutcome};
use mediq_nlu::{EntityExtractor, IntentClassifier, SymptomMapper};
use mediq_vector::RetrievalEngine;
use tracing::{debug, warn};

use crate::availability::AvailabilityChecker;
use crate::booking::BookingFlow;
use crate::directory::BookingStore;
use crate::error::{DialogError, Result};
use crate::responses::{
    ResponseBuilder, CONTACT_INFO, EMERGENCY_ALERT, LOCATION_INFO, TIMINGS_INFO,
};
use crate::session::SessionStore;

/// Bare acknowledgments that should not be answered from retrieval.
static ACK_WORDS: &[&str] = &["yes", "ok", "okay", "sure", "no", "nope", "yeah", "thanks", "thank"];

/// Acknowledgments that continue an in-progress booking.
static BOOKING_ACKS: &[&str] = &["yes", "ok", "okay", "sure", "yes please", "that works"];

/// The conversational front-end: one instance serves all sessions.
pub struct DialogueOrchestrator {
    config: MediqConfig,
    sessions: SessionStore,
    classifier: IntentClassifier,
    extractor: EntityExtractor,
    symptoms: SymptomMapper,
    retrieval: Option<RetrievalEngine>,
    booking: BookingFlow,
    responses: ResponseBuilder,
    store: Arc<dyn BookingStore>,
}

impl std::fmt::Debug for DialogueOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueOrchestrator")
            .field("retrieval_enabled", &self.retrieval.is_some())
            .finish()
    }
}

impl DialogueOrchestrator {
    /// An orchestrator with keyword-only classification and no retrieval.
    pub fn new(config: MediqConfig, store: Arc<dyn BookingStore>) -> Self {
        let classifier = IntentClassifier::pattern_only(config.classifier.clone());
        let extractor =
            EntityExtractor::with_suppress_words(config.context.backfill_suppress_words.clone());
        let booking = BookingFlow::new(AvailabilityChecker::new(config.booking.clone()));
        let sessions = SessionStore::new(config.session.clone());
        Self {
            sessions,
            classifier,
            extractor,
            symptoms: SymptomMapper::new(),
            retrieval: None,
            booking,
            responses: ResponseBuilder::new(),
            store,
            config,
        }
    }

    /// Attach a retrieval engine for FAQ answers.
    pub fn with_retrieval(mut self, retrieval: RetrievalEngine) -> Self {
        self.retrieval = Some(retrieval);
        self
    }

    /// Replace the classifier, e.g. with a similarity-backed one.
    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replace the response builder, e.g. to pin greeting variants.
    pub fn with_responses(mut self, responses: ResponseBuilder) -> Self {
        self.responses = responses;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Process one utterance for a session and produce the reply.
    pub fn handle_turn(&self, session_id: &str, utterance: &str) -> Result<TurnOutcome> {
        let text = utterance.trim();
        if text.is_empty() {
            return Err(DialogError::EmptyMessage);
        }
        let length = text.chars().count();
        if length > self.config.session.max_message_length {
            return Err(DialogError::MessageTooLong(length));
        }

        self.sessions.expire_stale()?;

        let summary = self.sessions.conversation_summary(session_id)?;
        let summary_ref = if summary.is_empty() {
            None
        } else {
            Some(summary.as_str())
        };
        let classified = self.classifier.classify(text, summary_ref);

        let follow_up_hint = self.sessions.is_follow_up(session_id, text, classified)?;
        let prior_intent = self.sessions.last_intent(session_id)?;
        let prior_entities = self.sessions.last_entities(session_id)?;
        let entities = self.extractor.extract_with_context(text, prior_entities.as_ref());

        let (intent, is_follow_up) = self.normalize_intent(
            classified,
            prior_intent,
            prior_entities.as_ref(),
            &entities,
            text,
            follow_up_hint,
        );
        debug!(session_id, %intent, is_follow_up, "Turn classified");

        let reply = self.route(intent, text, &entities, prior_entities.as_ref(), is_follow_up)?;

        self.sessions.append_message(
            session_id,
            Role::User,
            text,
            Some(intent),
            Some(entities.clone()),
        )?;
        self.sessions
            .append_message(session_id, Role::Assistant, &reply, Some(intent), None)?;

        Ok(TurnOutcome {
            reply,
            intent,
            entities,
            is_follow_up,
        })
    }

    /// Re-interpret ambiguous intents in the light of the conversation.
    /// Returns the effective intent and the final follow-up flag.
    fn normalize_intent(
        &self,
        intent: Intent,
        prior_intent: Option<Intent>,
        prior: Option<&Entities>,
        entities: &Entities,
        text: &str,
        is_follow_up: bool,
    ) -> (Intent, bool) {
        // A bare acknowledgment mid-booking continues the booking.
        if prior_intent == Some(Intent::AppointmentBooking)
            && is_follow_up
            && matches!(intent, Intent::Faq | Intent::Greeting)
        {
            let lower = text.trim().to_lowercase();
            if BOOKING_ACKS.contains(&lower.as_str()) || lower.split_whitespace().count() <= 4 {
                return (Intent::AppointmentBooking, true);
            }
        }

        // A slot value on its own ("on 2030-09-02", "at 10:30") while a
        // booking is still missing pieces continues that booking.
        if prior_intent == Some(Intent::AppointmentBooking)
            && intent == Intent::Faq
            && prior.map(|p| !p.has_booking_slots()).unwrap_or(false)
            && (entities.doctor.is_some() || entities.date.is_some() || entities.time.is_some())
        {
            return (Intent::AppointmentBooking, true);
        }

        // Naming a doctor right after asking about doctors is a booking
        // request.
        if prior_intent == Some(Intent::DoctorInfo)
            && intent == Intent::DoctorInfo
            && entities.doctor.is_some()
            && is_follow_up
        {
            return (Intent::AppointmentBooking, true);
        }

        (intent, is_follow_up)
    }

    fn route(
        &self,
        intent: Intent,
        text: &str,
        entities: &Entities,
        prior: Option<&Entities>,
        is_follow_up: bool,
    ) -> Result<String> {
        match intent {
            Intent::Greeting => Ok(self.responses.greeting()),
            Intent::Emergency => Ok(EMERGENCY_ALERT.to_string()),
            Intent::AppointmentBooking => self.booking.handle_booking(
                self.store.as_ref(),
                text,
                entities,
                prior,
                is_follow_up,
            ),
            Intent::CancelAppointment => {
                let patient = entities
                    .patient_name
                    .as_deref()
                    .or_else(|| prior.and_then(|p| p.patient_name.as_deref()));
                self.booking
                    .handle_cancellation(self.store.as_ref(), text, patient)
            }
            Intent::DoctorInfo => self.doctor_info_reply(entities),
            Intent::Services => {
                if text.to_lowercase().contains("department") {
                    let departments = self.store.list_departments()?;
                    Ok(self.responses.format_departments(&departments))
                } else {
                    let services = self.store.list_services()?;
                    Ok(self.responses.format_services(&services))
                }
            }
            Intent::Location => Ok(LOCATION_INFO.to_string()),
            Intent::Timings => Ok(TIMINGS_INFO.to_string()),
            Intent::Contact => Ok(CONTACT_INFO.to_string()),
            Intent::SymptomQuery => self.symptom_reply(text),
            Intent::Faq => self.faq_reply(text),
        }
    }

    fn doctor_info_reply(&self, entities: &Entities) -> Result<String> {
        if let Some(doctor) = &entities.doctor {
            let matches = self.store.search_doctors_by_name(doctor)?;
            return Ok(self.responses.format_search_results(doctor, &matches));
        }
        if let Some(department) = &entities.department {
            let doctors = self.store.doctors_in_department(department)?;
            if doctors.is_empty() {
                return Ok(format!(
                    "We don't have doctors listed under {department} right now. \
                     Ask for our doctor list to see everyone."
                ));
            }
            return Ok(self.responses.format_doctor_directory(&doctors));
        }
        let doctors = self.store.list_doctors()?;
        Ok(self.responses.format_doctor_directory(&doctors))
    }

    fn symptom_reply(&self, text: &str) -> Result<String> {
        let Some(recommendation) = self.symptoms.get_recommended_department(text) else {
            return self.faq_reply(text);
        };
        // Mixed-department matches below the confidence bar get the generic
        // path instead of a shaky recommendation.
        if recommendation.confidence <= 0.3 {
            return self.faq_reply(text);
        }

        if recommendation.department == "Emergency" {
            return Ok(EMERGENCY_ALERT.to_string());
        }

        let doctors = self.store.doctors_in_department(&recommendation.department)?;
        let mut reply = format!(
            "Based on what you describe, our {} department would be the right \
             place to start. This is general guidance, not a medical diagnosis.",
            recommendation.department
        );
        if doctors.is_empty() {
            reply.push_str(" Say 'book an appointment' and I'll help you set one up.");
        } else {
            reply.push_str("\n\nYou could see:\n");
            for doctor in &doctors {
                reply.push_str("\u{2022} ");
                reply.push_str(&doctor.name);
                if let Some(spec) = &doctor.specialization {
                    reply.push_str(" - ");
                    reply.push_str(spec);
                }
                reply.push('\n');
            }
            reply.push_str("\nWould you like to book an appointment?");
        }
        Ok(reply)
    }

    /// Informational fallback. Retrieval is skipped for bare acknowledgments,
    /// hospital-overview questions, and doctor mentions, which all have
    /// better direct answers.
    ///
    /// Directory lookups here go through a fresh extraction of the current
    /// utterance only; a doctor or department carried over from an earlier
    /// turn stays with the booking flow and must not hijack an unrelated
    /// question.
    fn faq_reply(&self, text: &str) -> Result<String> {
        let lower = text.trim().to_lowercase();

        let bare = lower.trim_matches(|c: char| !c.is_alphanumeric());
        if ACK_WORDS.contains(&bare) {
            return Ok("Is there anything else I can help you with?".to_string());
        }

        if lower.contains("about the hospital")
            || lower.contains("about your hospital")
            || lower.contains("tell me about this hospital")
        {
            let departments = self.store.list_departments()?;
            let services = self.store.list_services()?;
            let doctors = self.store.list_doctors()?;
            return Ok(self
                .responses
                .format_hospital_overview(&departments, &services, &doctors));
        }

        let fresh = self.extractor.extract(text);
        if fresh.doctor.is_some() {
            return self.doctor_info_reply(&fresh);
        }

        // A department mention without booking or doctor signal lists that
        // department's doctors.
        if let Some(department) = &fresh.department {
            let doctors = self.store.doctors_in_department(department)?;
            if !doctors.is_empty() {
                return Ok(self.responses.format_doctor_directory(&doctors));
            }
        }

        // A lone alphabetic token is tried as a doctor-name search.
        let mut tokens = bare.split_whitespace();
        if let (Some(token), None) = (tokens.next(), tokens.next()) {
            if !token.is_empty() && token.chars().all(|c| c.is_alphabetic()) {
                let matches = self.store.search_doctors_by_name(token)?;
                if !matches.is_empty() {
                    return Ok(self.responses.format_search_results(token, &matches));
                }
            }
        }

        if let Some(retrieval) = &self.retrieval {
            match retrieval.search(
                text,
                self.config.retrieval.top_k,
                self.config.retrieval.min_relevance,
            ) {
                Ok(passages) => {
                    if let Some(answer) = self.responses.format_faq_answer(text, &passages) {
                        return Ok(answer);
                    }
                }
                Err(err) => {
                    warn!(error = %err, "Retrieval failed, using canned fallback");
                }
            }
        }

        Ok(self.responses.fallback_answer(text))
    }
}
