//! Slot-filling appointment booking and cancellation.
//!
//! Booking needs three slots: doctor, date, and time. Each turn merges
//! newly extracted entities over what the session already collected, then
//! either books, asks for what is missing, or explains why the requested
//! slot will not work.

use chrono::{Local, NaiveDate};
use mediq_core::types::Entities;
use mediq_nlu::DateTimeParser;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::availability::{AvailabilityChecker, SlotCheck};
use crate::directory::BookingStore;
use crate::error::Result;
use crate::responses::BOOKING_INSTRUCTIONS;

/// Booking words inside a captured doctor name mean the capture was a
/// false positive.
static DOCTOR_FALSE_POSITIVE_WORDS: &[&str] = &["appointment", "book", "schedule"];

/// Fallback extraction when the doctor slot was discarded: a name after a
/// booking preposition, then a bare titled name.
static DOCTOR_FALLBACKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(?:with|to see|for)\s+(?:dr\.?\s+)?([A-Za-z]+ [A-Za-z]+)").unwrap(),
        Regex::new(r"(?i)\bdr\.?\s+([A-Za-z]+(?: [A-Za-z]+)?)").unwrap(),
    ]
});

/// Appointment id in a cancellation request, e.g. "appointment 12",
/// "id: 12", "#12".
static APPOINTMENT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:appointment|id|#)\s*(?:is|:)?\s*(\d+)").unwrap());

const DEFAULT_PATIENT: &str = "Guest";

/// Drives the booking and cancellation conversations.
#[derive(Debug)]
pub struct BookingFlow {
    availability: AvailabilityChecker,
    parser: DateTimeParser,
}

impl BookingFlow {
    pub fn new(availability: AvailabilityChecker) -> Self {
        Self {
            availability,
            parser: DateTimeParser::new(),
        }
    }

    /// Handle one booking turn. `prior` carries entities collected on
    /// earlier turns; `current` is what this utterance produced.
    pub fn handle_booking(
        &self,
        store: &dyn BookingStore,
        text: &str,
        current: &Entities,
        prior: Option<&Entities>,
        is_follow_up: bool,
    ) -> Result<String> {
        self.handle_booking_on(
            Local::now().date_naive(),
            store,
            text,
            current,
            prior,
            is_follow_up,
        )
    }

    /// Deterministic variant of [`handle_booking`](Self::handle_booking)
    /// taking today's date.
    pub fn handle_booking_on(
        &self,
        today: NaiveDate,
        store: &dyn BookingStore,
        text: &str,
        current: &Entities,
        prior: Option<&Entities>,
        is_follow_up: bool,
    ) -> Result<String> {
        let mut slots = current.clone();

        // Follow-up turns inherit whatever the session already collected.
        if is_follow_up {
            if let Some(prior) = prior {
                if slots.doctor.is_none() {
                    slots.doctor = prior.doctor.clone();
                }
                if slots.date.is_none() {
                    slots.date = prior.date.clone();
                }
                if slots.time.is_none() {
                    slots.time = prior.time.clone();
                }
                if slots.patient_name.is_none() {
                    slots.patient_name = prior.patient_name.clone();
                }
            }
        }

        self.repair_doctor_slot(&mut slots, text);

        let filled = [&slots.doctor, &slots.date, &slots.time]
            .iter()
            .filter(|s| s.is_some())
            .count();

        match filled {
            3 => self.try_book(today, store, &slots, prior),
            0 => Ok(BOOKING_INSTRUCTIONS.to_string()),
            _ => Ok(partial_prompt(&slots)),
        }
    }

    /// Discard doctor captures polluted by booking verbs and retry with the
    /// fallback patterns against the raw text.
    fn repair_doctor_slot(&self, slots: &mut Entities, text: &str) {
        let Some(doctor) = &slots.doctor else {
            return;
        };
        let lower = doctor.to_lowercase();
        if !DOCTOR_FALSE_POSITIVE_WORDS.iter().any(|w| lower.contains(w)) {
            return;
        }

        debug!(doctor, "Discarding false-positive doctor capture");
        slots.doctor = None;
        for pattern in DOCTOR_FALLBACKS.iter() {
            if let Some(captures) = pattern.captures(text) {
                if let Some(name) = captures.get(1) {
                    let name = name.as_str().trim();
                    let name_lower = name.to_lowercase();
                    if !DOCTOR_FALSE_POSITIVE_WORDS.iter().any(|w| name_lower.contains(w)) {
                        slots.doctor = Some(format!("Dr. {name}"));
                        return;
                    }
                }
            }
        }
    }

    fn try_book(
        &self,
        today: NaiveDate,
        store: &dyn BookingStore,
        slots: &Entities,
        prior: Option<&Entities>,
    ) -> Result<String> {
        // All three are Some here.
        let (Some(doctor_name), Some(raw_date), Some(raw_time)) =
            (&slots.doctor, &slots.date, &slots.time)
        else {
            return Ok(partial_prompt(slots));
        };

        let Some(doctor) = store.find_doctor(doctor_name)? else {
            return Ok(format!(
                "I couldn't find {doctor_name} in our directory. \
                 Ask for our doctor list to see who is available."
            ));
        };

        let Some(date) = self.parser.normalize_date_on(raw_date, today) else {
            return Ok(format!(
                "I couldn't understand the date \"{raw_date}\". \
                 Please give it as YYYY-MM-DD, or say something like \
                 'tomorrow' or 'next Monday'."
            ));
        };
        let Some(time) = self.parser.normalize_time_at(raw_time, Local::now().time()) else {
            return Ok(format!(
                "I couldn't understand the time \"{raw_time}\". \
                 Please give it like '10:30 am' or '14:00'."
            ));
        };

        // Same request as the previous turn and the slot is already held.
        if let Some(prior) = prior {
            let same_request = prior.doctor.as_deref() == Some(doctor_name)
                && prior.date.as_deref() == Some(date.as_str())
                && prior.time.as_deref() == Some(time.as_str());
            if same_request && store.appointments_at(doctor.id, &date, &time)? > 0 {
                return Ok(format!(
                    "You already have an appointment booked with these details: \
                     {} on {date} at {time}. Is there anything else I can help with?",
                    doctor.name
                ));
            }
        }

        match self
            .availability
            .check_on(today, store, doctor.id, &date, &time)?
        {
            SlotCheck::Available => {
                let patient = slots.patient_name.as_deref().unwrap_or(DEFAULT_PATIENT);
                let appointment = store.create_appointment(patient, doctor.id, &date, &time)?;
                info!(appointment_id = appointment.id, "Booking confirmed");
                Ok(format!(
                    "\u{2705} Appointment booked successfully!\n\n\
                     Appointment Details:\n\
                     \u{2022} Doctor: {}\n\
                     \u{2022} Date: {date}\n\
                     \u{2022} Time: {time}\n\
                     \u{2022} Appointment ID: {}\n\n\
                     Please arrive 15 minutes before your appointment.",
                    doctor.name, appointment.id
                ))
            }
            SlotCheck::PastDate => Ok(format!(
                "{date} is in the past. Which upcoming day works for you?"
            )),
            SlotCheck::InvalidDate(bad) => Ok(format!(
                "I couldn't understand the date \"{bad}\". Please give it as YYYY-MM-DD."
            )),
            SlotCheck::InvalidTime(bad) => Ok(format!(
                "I couldn't understand the time \"{bad}\". Please give it like '10:30'."
            )),
            SlotCheck::OutsideHours => Ok(
                "That time is outside our booking hours. Appointments run from \
                 09:00 to 17:30 in half-hour slots."
                    .to_string(),
            ),
            SlotCheck::Occupied(alternatives) => {
                if alternatives.is_empty() {
                    Ok(format!(
                        "{} is fully booked on {date}. Would another day work?",
                        doctor.name
                    ))
                } else {
                    Ok(format!(
                        "{} is not available at {time} on {date}. \
                         Nearest open slots: {}. Would any of these work?",
                        doctor.name,
                        alternatives.join(", ")
                    ))
                }
            }
        }
    }

    /// Handle a cancellation turn: by appointment id when one is present,
    /// otherwise by the patient's latest active appointment.
    pub fn handle_cancellation(
        &self,
        store: &dyn BookingStore,
        text: &str,
        patient_name: Option<&str>,
    ) -> Result<String> {
        if let Some(captures) = APPOINTMENT_ID.captures(text) {
            if let Some(id) = captures.get(1).and_then(|m| m.as_str().parse::<u64>().ok()) {
                return Ok(match store.find_appointment(id)? {
                    None => format!(
                        "I couldn't find an appointment with ID {id}. \
                         Please check the number and try again."
                    ),
                    Some(appointment) if !appointment.status.is_active() => {
                        format!("Appointment {id} is already cancelled.")
                    }
                    Some(_) => {
                        store.cancel_appointment(id)?;
                        format!("Your appointment (ID {id}) has been cancelled.")
                    }
                });
            }
        }

        if let Some(name) = patient_name {
            if let Some(appointment) = store.latest_for_patient(name)? {
                store.cancel_appointment(appointment.id)?;
                return Ok(format!(
                    "Your appointment on {} at {} has been cancelled.",
                    appointment.date, appointment.time
                ));
            }
        }

        Ok(
            "To cancel an appointment, please tell me the appointment ID from \
             your booking confirmation, e.g. 'cancel appointment 12'."
                .to_string(),
        )
    }
}

/// Prompt listing what was understood and what is still needed.
fn partial_prompt(slots: &Entities) -> String {
    let mut out = String::from("I have some of your appointment details:\n");
    if let Some(doctor) = &slots.doctor {
        out.push_str(&format!("\u{2022} Doctor: {doctor}\n"));
    }
    if let Some(date) = &slots.date {
        out.push_str(&format!("\u{2022} Date: {date}\n"));
    }
    if let Some(time) = &slots.time {
        out.push_str(&format!("\u{2022} Time: {time}\n"));
    }
    out.push_str("\nI still need:\n");
    if slots.doctor.is_none() {
        out.push_str("\u{2022} The doctor's name (e.g. Dr. Sarah Johnson)\n");
    }
    if slots.date.is_none() {
        out.push_str("\u{2022} The date (e.g. tomorrow or 2026-09-01)\n");
    }
    if slots.time.is_none() {
        out.push_str("\u{2022} The time (e.g. 10:30 am)\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryBookingStore;
    use mediq_core::config::BookingConfig;

    fn flow() -> BookingFlow {
        BookingFlow::new(AvailabilityChecker::new(BookingConfig::default()))
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 26).unwrap()
    }

    fn full_slots() -> Entities {
        Entities {
            doctor: Some("Dr. Sarah Johnson".to_string()),
            date: Some("2026-09-01".to_string()),
            time: Some("10:00".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_slots_gives_instructions() {
        let store = InMemoryBookingStore::with_sample_data();
        let reply = flow()
            .handle_booking_on(
                today(),
                &store,
                "I want to book an appointment",
                &Entities::default(),
                None,
                false,
            )
            .unwrap();
        assert_eq!(reply, BOOKING_INSTRUCTIONS);
    }

    #[test]
    fn test_partial_slots_list_missing() {
        let store = InMemoryBookingStore::with_sample_data();
        let entities = Entities {
            doctor: Some("Dr. Sarah Johnson".to_string()),
            ..Default::default()
        };
        let reply = flow()
            .handle_booking_on(today(), &store, "with Dr. Sarah Johnson", &entities, None, false)
            .unwrap();
        assert!(reply.contains("Doctor: Dr. Sarah Johnson"));
        assert!(reply.contains("The date"));
        assert!(reply.contains("The time"));
        assert!(!reply.contains("The doctor's name"));
    }

    #[test]
    fn test_full_slots_book_successfully() {
        let store = InMemoryBookingStore::with_sample_data();
        let reply = flow()
            .handle_booking_on(
                today(),
                &store,
                "book Dr. Sarah Johnson on 2026-09-01 at 10:00",
                &full_slots(),
                None,
                false,
            )
            .unwrap();
        assert!(reply.contains("booked successfully"));
        assert!(reply.contains("Dr. Sarah Johnson"));
        assert!(reply.contains("Appointment ID: 1"));
        assert_eq!(store.appointments_at(1, "2026-09-01", "10:00").unwrap(), 1);
    }

    #[test]
    fn test_follow_up_merges_prior_slots() {
        let store = InMemoryBookingStore::with_sample_data();
        let prior = Entities {
            doctor: Some("Dr. Sarah Johnson".to_string()),
            date: Some("2026-09-01".to_string()),
            ..Default::default()
        };
        let current = Entities {
            time: Some("10:00".to_string()),
            ..Default::default()
        };
        let reply = flow()
            .handle_booking_on(today(), &store, "at 10:00", &current, Some(&prior), true)
            .unwrap();
        assert!(reply.contains("booked successfully"));
    }

    #[test]
    fn test_non_follow_up_does_not_merge() {
        let store = InMemoryBookingStore::with_sample_data();
        let prior = full_slots();
        let current = Entities {
            time: Some("10:00".to_string()),
            ..Default::default()
        };
        let reply = flow()
            .handle_booking_on(today(), &store, "at 10:00", &current, Some(&prior), false)
            .unwrap();
        assert!(reply.contains("I still need"));
    }

    #[test]
    fn test_duplicate_request_is_caught() {
        let store = InMemoryBookingStore::with_sample_data();
        let f = flow();
        let first = f
            .handle_booking_on(today(), &store, "book", &full_slots(), None, false)
            .unwrap();
        assert!(first.contains("booked successfully"));

        let second = f
            .handle_booking_on(
                today(),
                &store,
                "book",
                &full_slots(),
                Some(&full_slots()),
                true,
            )
            .unwrap();
        assert!(second.contains("already have an appointment"));
        assert_eq!(store.appointments_at(1, "2026-09-01", "10:00").unwrap(), 1);
    }

    #[test]
    fn test_occupied_slot_offers_alternatives() {
        let store = InMemoryBookingStore::with_sample_data();
        store
            .create_appointment("Someone Else", 1, "2026-09-01", "10:00")
            .unwrap();
        let reply = flow()
            .handle_booking_on(today(), &store, "book", &full_slots(), None, false)
            .unwrap();
        assert!(reply.contains("not available at 10:00"));
        assert!(reply.contains("09:30") || reply.contains("10:30"));
    }

    #[test]
    fn test_unknown_doctor() {
        let store = InMemoryBookingStore::with_sample_data();
        let mut slots = full_slots();
        slots.doctor = Some("Dr. Nobody Atall".to_string());
        let reply = flow()
            .handle_booking_on(today(), &store, "book", &slots, None, false)
            .unwrap();
        assert!(reply.contains("couldn't find Dr. Nobody Atall"));
    }

    #[test]
    fn test_past_date_rejected() {
        let store = InMemoryBookingStore::with_sample_data();
        let mut slots = full_slots();
        slots.date = Some("2026-08-01".to_string());
        let reply = flow()
            .handle_booking_on(today(), &store, "book", &slots, None, false)
            .unwrap();
        assert!(reply.contains("in the past"));
    }

    #[test]
    fn test_relative_date_slot_normalized() {
        let store = InMemoryBookingStore::with_sample_data();
        let mut slots = full_slots();
        slots.date = Some("tomorrow".to_string());
        let reply = flow()
            .handle_booking_on(today(), &store, "book", &slots, None, false)
            .unwrap();
        assert!(reply.contains("2026-08-27"));
        assert!(reply.contains("booked successfully"));
    }

    #[test]
    fn test_false_positive_doctor_repaired() {
        let store = InMemoryBookingStore::with_sample_data();
        let mut slots = full_slots();
        slots.doctor = Some("Dr. Book An".to_string());
        let reply = flow()
            .handle_booking_on(
                today(),
                &store,
                "book an appointment with Dr. Sarah Johnson on 2026-09-01 at 10:00",
                &slots,
                None,
                false,
            )
            .unwrap();
        assert!(reply.contains("booked successfully"));
        assert!(reply.contains("Dr. Sarah Johnson"));
    }

    #[test]
    fn test_outside_hours_message() {
        let store = InMemoryBookingStore::with_sample_data();
        let mut slots = full_slots();
        slots.time = Some("20:00".to_string());
        let reply = flow()
            .handle_booking_on(today(), &store, "book", &slots, None, false)
            .unwrap();
        assert!(reply.contains("outside our booking hours"));
    }

    #[test]
    fn test_cancel_by_id() {
        let store = InMemoryBookingStore::with_sample_data();
        let appt = store
            .create_appointment("Pat Smith", 1, "2026-09-01", "10:00")
            .unwrap();
        let reply = flow()
            .handle_cancellation(&store, &format!("cancel appointment {}", appt.id), None)
            .unwrap();
        assert!(reply.contains("has been cancelled"));

        let again = flow()
            .handle_cancellation(&store, &format!("cancel appointment {}", appt.id), None)
            .unwrap();
        assert!(again.contains("already cancelled"));
    }

    #[test]
    fn test_cancel_unknown_id() {
        let store = InMemoryBookingStore::with_sample_data();
        let reply = flow()
            .handle_cancellation(&store, "cancel appointment 42", None)
            .unwrap();
        assert!(reply.contains("couldn't find an appointment with ID 42"));
    }

    #[test]
    fn test_cancel_by_patient_name() {
        let store = InMemoryBookingStore::with_sample_data();
        store
            .create_appointment("Pat Smith", 1, "2026-09-01", "10:00")
            .unwrap();
        let reply = flow()
            .handle_cancellation(&store, "cancel my appointment please", Some("Pat Smith"))
            .unwrap();
        assert!(reply.contains("2026-09-01"));
        assert!(reply.contains("has been cancelled"));
    }

    #[test]
    fn test_cancel_without_id_prompts() {
        let store = InMemoryBookingStore::with_sample_data();
        let reply = flow()
            .handle_cancellation(&store, "cancel my visit", None)
            .unwrap();
        assert!(reply.contains("appointment ID"));
    }
}
