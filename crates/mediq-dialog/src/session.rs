//! In-memory session store with rolling history.
//!
//! Sessions are keyed by an opaque id owned by the transport layer. Each
//! session keeps a bounded message window plus a shorter intent/entity
//! history used for context carry-over. Idle sessions are swept after a
//! configurable timeout.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use mediq_core::config::SessionConfig;
use mediq_core::types::{Entities, Intent, Message, Role};
use tracing::{debug, info};

use crate::error::{DialogError, Result};

/// Words that mark a short reply as continuing the previous topic when they
/// appear among its first tokens.
static FOLLOW_UP_WORDS: &[&str] = &[
    "yes", "no", "ok", "okay", "sure", "that", "this", "it", "also", "and", "more", "another",
];

const SUMMARY_MESSAGES: usize = 3;
const SUMMARY_TRUNCATE: usize = 100;

#[derive(Debug)]
struct Session {
    messages: Vec<Message>,
    intent_history: Vec<Intent>,
    entity_history: Vec<Entities>,
    last_active: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            intent_history: Vec::new(),
            entity_history: Vec::new(),
            last_active: Utc::now(),
        }
    }
}

/// Thread-safe store of conversation sessions.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Session>>> {
        self.sessions
            .lock()
            .map_err(|e| DialogError::Session(format!("lock poisoned: {e}")))
    }

    /// Append a message to a session, creating the session on first use.
    /// Oldest entries are evicted once the windows are full.
    pub fn append_message(
        &self,
        session_id: &str,
        role: Role,
        text: &str,
        intent: Option<Intent>,
        entities: Option<Entities>,
    ) -> Result<()> {
        let mut sessions = self.lock()?;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(Session::new);

        session.messages.push(Message {
            role,
            text: text.to_string(),
            timestamp: Utc::now(),
            intent,
            entities: entities.clone(),
        });
        if session.messages.len() > self.config.max_messages {
            let excess = session.messages.len() - self.config.max_messages;
            session.messages.drain(..excess);
        }

        if role == Role::User {
            if let Some(intent) = intent {
                session.intent_history.push(intent);
                if session.intent_history.len() > self.config.max_history {
                    let excess = session.intent_history.len() - self.config.max_history;
                    session.intent_history.drain(..excess);
                }
            }
            if let Some(entities) = entities {
                if !entities.is_empty() {
                    session.entity_history.push(entities);
                    if session.entity_history.len() > self.config.max_history {
                        let excess = session.entity_history.len() - self.config.max_history;
                        session.entity_history.drain(..excess);
                    }
                }
            }
        }

        session.last_active = Utc::now();
        Ok(())
    }

    /// The most recent `count` messages, oldest first.
    pub fn recent_messages(&self, session_id: &str, count: usize) -> Result<Vec<Message>> {
        let sessions = self.lock()?;
        Ok(sessions
            .get(session_id)
            .map(|s| {
                let skip = s.messages.len().saturating_sub(count);
                s.messages[skip..].to_vec()
            })
            .unwrap_or_default())
    }

    /// Intent recorded for the most recent user turn, if any.
    pub fn last_intent(&self, session_id: &str) -> Result<Option<Intent>> {
        let sessions = self.lock()?;
        Ok(sessions
            .get(session_id)
            .and_then(|s| s.intent_history.last().copied()))
    }

    /// Entities recorded for the most recent user turn that had any.
    pub fn last_entities(&self, session_id: &str) -> Result<Option<Entities>> {
        let sessions = self.lock()?;
        Ok(sessions
            .get(session_id)
            .and_then(|s| s.entity_history.last().cloned()))
    }

    /// Whether the current utterance continues the previous topic.
    ///
    /// True when both the previous and current intents are booking, or when
    /// one of the follow-up words appears among the first three tokens of
    /// the current utterance. Always false for a session with no history or
    /// no recorded prior intent.
    pub fn is_follow_up(
        &self,
        session_id: &str,
        current_text: &str,
        current_intent: Intent,
    ) -> Result<bool> {
        let previous = {
            let sessions = self.lock()?;
            match sessions.get(session_id) {
                Some(s) if !s.messages.is_empty() => s.intent_history.last().copied(),
                _ => return Ok(false),
            }
        };
        let Some(previous) = previous else {
            return Ok(false);
        };

        if previous == Intent::AppointmentBooking && current_intent == Intent::AppointmentBooking {
            return Ok(true);
        }

        let lower = current_text.to_lowercase();
        let leading = lower
            .split_whitespace()
            .take(3)
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()));
        for token in leading {
            if FOLLOW_UP_WORDS.contains(&token) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Compact summary of the last few messages, one line per message in
    /// `role: text` form with long texts truncated.
    pub fn conversation_summary(&self, session_id: &str) -> Result<String> {
        let sessions = self.lock()?;
        let Some(session) = sessions.get(session_id) else {
            return Ok(String::new());
        };

        let skip = session.messages.len().saturating_sub(SUMMARY_MESSAGES);
        let lines: Vec<String> = session.messages[skip..]
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                let text: String = m.text.chars().take(SUMMARY_TRUNCATE).collect();
                format!("{role}: {text}")
            })
            .collect();
        Ok(lines.join("\n"))
    }

    /// Remove sessions idle for longer than the configured timeout.
    /// Returns the number of sessions removed.
    pub fn expire_stale(&self) -> Result<usize> {
        let cutoff = Utc::now() - Duration::minutes(self.config.timeout_minutes);
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_active >= cutoff);
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, "Expired idle sessions");
        }
        Ok(removed)
    }

    /// Drop one session entirely.
    pub fn clear(&self, session_id: &str) -> Result<bool> {
        let mut sessions = self.lock()?;
        let removed = sessions.remove(session_id).is_some();
        if removed {
            debug!(session_id, "Session cleared");
        }
        Ok(removed)
    }

    pub fn session_count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store() -> SessionStore {
        SessionStore::new(SessionConfig::default())
    }

    #[test]
    fn test_append_creates_session() {
        let store = store();
        store
            .append_message("s1", Role::User, "hello", Some(Intent::Greeting), None)
            .unwrap();
        assert_eq!(store.session_count().unwrap(), 1);
        assert_eq!(store.recent_messages("s1", 10).unwrap().len(), 1);
    }

    #[test]
    fn test_message_window_evicts_oldest() {
        let store = SessionStore::new(SessionConfig {
            max_messages: 3,
            ..Default::default()
        });
        for i in 0..5 {
            store
                .append_message("s1", Role::User, &format!("msg {i}"), None, None)
                .unwrap();
        }
        let messages = store.recent_messages("s1", 10).unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].text, "msg 2");
        assert_eq!(messages[2].text, "msg 4");
    }

    #[test]
    fn test_history_window_is_separate() {
        let store = SessionStore::new(SessionConfig {
            max_messages: 10,
            max_history: 2,
            ..Default::default()
        });
        for intent in [Intent::Greeting, Intent::Faq, Intent::DoctorInfo] {
            store
                .append_message("s1", Role::User, "text", Some(intent), None)
                .unwrap();
        }
        assert_eq!(store.last_intent("s1").unwrap(), Some(Intent::DoctorInfo));
        assert_eq!(store.recent_messages("s1", 10).unwrap().len(), 3);
    }

    #[test]
    fn test_last_entities_skips_empty() {
        let store = store();
        let entities = Entities {
            doctor: Some("Dr. Sarah Johnson".to_string()),
            ..Default::default()
        };
        store
            .append_message(
                "s1",
                Role::User,
                "book with Dr. Sarah Johnson",
                Some(Intent::AppointmentBooking),
                Some(entities.clone()),
            )
            .unwrap();
        store
            .append_message("s1", Role::User, "thanks", Some(Intent::Faq), Some(Entities::default()))
            .unwrap();
        assert_eq!(store.last_entities("s1").unwrap(), Some(entities));
    }

    #[test]
    fn test_assistant_messages_do_not_touch_history() {
        let store = store();
        store
            .append_message("s1", Role::User, "hello", Some(Intent::Greeting), None)
            .unwrap();
        store
            .append_message("s1", Role::Assistant, "Hi there!", Some(Intent::Greeting), None)
            .unwrap();
        assert_eq!(store.last_intent("s1").unwrap(), Some(Intent::Greeting));
        assert_eq!(store.recent_messages("s1", 10).unwrap().len(), 2);
    }

    #[test]
    fn test_follow_up_false_for_fresh_session() {
        let store = store();
        assert!(!store.is_follow_up("nope", "yes", Intent::Faq).unwrap());
    }

    #[test]
    fn test_follow_up_booking_to_booking() {
        let store = store();
        store
            .append_message(
                "s1",
                Role::User,
                "book an appointment",
                Some(Intent::AppointmentBooking),
                None,
            )
            .unwrap();
        assert!(store
            .is_follow_up("s1", "tomorrow at 10", Intent::AppointmentBooking)
            .unwrap());
    }

    #[test]
    fn test_follow_up_needs_recorded_intent() {
        let store = store();
        store
            .append_message("s1", Role::User, "hello", None, None)
            .unwrap();
        assert!(!store.is_follow_up("s1", "ok then", Intent::Faq).unwrap());
    }

    #[test]
    fn test_follow_up_keyword_in_leading_tokens() {
        let store = store();
        store
            .append_message("s1", Role::User, "what are the timings", Some(Intent::Timings), None)
            .unwrap();
        assert!(store.is_follow_up("s1", "Ok, thanks!", Intent::Faq).unwrap());
        assert!(store.is_follow_up("s1", "and the address?", Intent::Location).unwrap());
        assert!(!store
            .is_follow_up("s1", "where is the hospital", Intent::Location)
            .unwrap());
    }

    #[test]
    fn test_follow_up_keyword_must_lead() {
        let store = store();
        store
            .append_message("s1", Role::User, "hello", Some(Intent::Greeting), None)
            .unwrap();
        // "it" appears late in the sentence, not in the first three tokens.
        assert!(!store
            .is_follow_up("s1", "where exactly do I find it", Intent::Location)
            .unwrap());
    }

    #[test]
    fn test_conversation_summary_last_three() {
        let store = store();
        for i in 0..4 {
            store
                .append_message("s1", Role::User, &format!("message {i}"), None, None)
                .unwrap();
        }
        let summary = store.conversation_summary("s1").unwrap();
        assert!(!summary.contains("message 0"));
        assert!(summary.contains("user: message 1"));
        assert!(summary.contains("user: message 3"));
        assert_eq!(summary.lines().count(), 3);
    }

    #[test]
    fn test_conversation_summary_truncates_long_text() {
        let store = store();
        let long = "x".repeat(300);
        store
            .append_message("s1", Role::User, &long, None, None)
            .unwrap();
        let summary = store.conversation_summary("s1").unwrap();
        assert_eq!(summary.len(), "user: ".len() + 100);
    }

    #[test]
    fn test_summary_empty_for_unknown_session() {
        assert_eq!(store().conversation_summary("missing").unwrap(), "");
    }

    #[test]
    fn test_expire_stale_removes_idle_sessions() {
        let store = SessionStore::new(SessionConfig {
            timeout_minutes: 0,
            ..Default::default()
        });
        store
            .append_message("s1", Role::User, "hello", None, None)
            .unwrap();
        // timeout of zero minutes means anything not touched this instant
        // can be swept; force last_active into the past via the cutoff.
        std::thread::sleep(std::time::Duration::from_millis(10));
        let removed = store.expire_stale().unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.session_count().unwrap(), 0);
    }

    #[test]
    fn test_expire_keeps_active_sessions() {
        let store = store();
        store
            .append_message("s1", Role::User, "hello", None, None)
            .unwrap();
        assert_eq!(store.expire_stale().unwrap(), 0);
        assert_eq!(store.session_count().unwrap(), 1);
    }

    #[test]
    fn test_clear_session() {
        let store = store();
        store
            .append_message("s1", Role::User, "hello", None, None)
            .unwrap();
        assert!(store.clear("s1").unwrap());
        assert!(!store.clear("s1").unwrap());
        assert_eq!(store.session_count().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_appends() {
        let store = Arc::new(store());
        let mut handles = Vec::new();
        for t in 0..4 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for i in 0..25 {
                    store
                        .append_message(&format!("s{t}"), Role::User, &format!("m{i}"), None, None)
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.session_count().unwrap(), 4);
        for t in 0..4 {
            assert_eq!(
                store.recent_messages(&format!("s{t}"), 100).unwrap().len(),
                10
            );
        }
    }
}
