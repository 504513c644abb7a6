//! Response text assembly.
//!
//! Canned texts for fixed intents, directory formatting, and the
//! sentence-scoring pass that turns retrieved passages into a short answer.
//! Greeting variety goes through an injectable chooser so tests stay
//! deterministic.

use mediq_core::types::{Department, Doctor};
use rand::Rng;

static GREETINGS: &[&str] = &[
    "Hello! Welcome to City General Hospital. How can I help you today?",
    "Hi there! I can help you with appointments, doctors, and hospital information.",
    "Welcome! Ask me about our doctors, departments, or book an appointment.",
    "Hello! I'm the hospital assistant. What can I do for you?",
];

pub const EMERGENCY_ALERT: &str = "\u{1F6A8} EMERGENCY ALERT \u{1F6A8}\n\n\
If this is a medical emergency, please call emergency services immediately \
or go to the nearest emergency room.\n\n\
Emergency hotline: 911\n\
Our Emergency department is open 24/7 at the main hospital entrance.";

pub const LOCATION_INFO: &str = "City General Hospital is located at \
123 Health Avenue, Springfield. We are opposite Central Park, two blocks \
from the Main Street metro station. Free parking is available for patients.";

pub const TIMINGS_INFO: &str = "Our OPD is open Monday to Saturday, \
9:00 AM to 6:00 PM. The Emergency department is open 24/7. \
Visiting hours are 4:00 PM to 7:00 PM daily.";

pub const CONTACT_INFO: &str = "You can reach City General Hospital at:\n\
\u{2022} Phone: +1-555-010-2000\n\
\u{2022} Email: info@citygeneralhospital.example\n\
\u{2022} Emergency hotline: 911";

pub const BOOKING_INSTRUCTIONS: &str = "To book an appointment, tell me:\n\
\u{2022} The doctor you want to see (e.g. Dr. Sarah Johnson)\n\
\u{2022} The date (e.g. tomorrow, next Monday, or 2026-09-01)\n\
\u{2022} The time (e.g. 10:30 am)\n\n\
You can give them all at once or one at a time.";

/// How many sentences a shaped FAQ answer keeps.
const FAQ_SENTENCES: usize = 3;

/// How many doctors per department the hospital overview lists.
const OVERVIEW_DOCTORS_PER_DEPARTMENT: usize = 2;

/// Builds user-facing reply text.
///
/// The chooser maps a variant count to an index; the default draws from a
/// thread-local RNG.
pub struct ResponseBuilder {
    chooser: Box<dyn Fn(usize) -> usize + Send + Sync>,
}

impl std::fmt::Debug for ResponseBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseBuilder").finish()
    }
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self {
            chooser: Box::new(|n| rand::thread_rng().gen_range(0..n)),
        }
    }

    /// A builder with a fixed variant chooser.
    pub fn with_chooser<F>(chooser: F) -> Self
    where
        F: Fn(usize) -> usize + Send + Sync + 'static,
    {
        Self {
            chooser: Box::new(chooser),
        }
    }

    pub fn greeting(&self) -> String {
        let index = (self.chooser)(GREETINGS.len()).min(GREETINGS.len() - 1);
        GREETINGS[index].to_string()
    }

    /// Department list with descriptions.
    pub fn format_departments(&self, departments: &[Department]) -> String {
        if departments.is_empty() {
            return "We don't have department information available right now.".to_string();
        }
        let mut out = String::from("Our departments:\n");
        for dept in departments {
            out.push_str("\u{2022} ");
            out.push_str(&dept.name);
            if let Some(desc) = &dept.description {
                out.push_str(" - ");
                out.push_str(desc);
            }
            out.push('\n');
        }
        out.push_str("\nAsk about any department to see its doctors.");
        out
    }

    /// Plain service listing.
    pub fn format_services(&self, services: &[String]) -> String {
        if services.is_empty() {
            return "We don't have service information available right now.".to_string();
        }
        let mut out = String::from("Our services:\n");
        for service in services {
            out.push_str("\u{2022} ");
            out.push_str(service);
            out.push('\n');
        }
        out.push_str("\nAsk about our departments or doctors to learn more.");
        out
    }

    /// Full roster grouped by department.
    pub fn format_doctor_directory(&self, doctors: &[Doctor]) -> String {
        if doctors.is_empty() {
            return "No doctors are listed right now.".to_string();
        }

        let mut groups: Vec<(&str, Vec<&Doctor>)> = Vec::new();
        for doctor in doctors {
            let dept = doctor.department.as_deref().unwrap_or("Other");
            match groups.iter_mut().find(|(name, _)| *name == dept) {
                Some((_, members)) => members.push(doctor),
                None => groups.push((dept, vec![doctor])),
            }
        }

        let mut out = String::from("Our doctors:\n");
        for (dept, members) in groups {
            out.push('\n');
            out.push_str(dept);
            out.push_str(":\n");
            for doctor in members {
                out.push_str("\u{2022} ");
                out.push_str(&doctor.name);
                if let Some(spec) = &doctor.specialization {
                    out.push_str(" - ");
                    out.push_str(spec);
                }
                out.push('\n');
            }
        }
        out
    }

    /// One doctor with specialization and availability.
    pub fn format_doctor_info(&self, doctor: &Doctor) -> String {
        let mut out = doctor.name.clone();
        if let Some(spec) = &doctor.specialization {
            out.push_str(&format!(" is a {spec}"));
        }
        if let Some(dept) = &doctor.department {
            out.push_str(&format!(" in our {dept} department"));
        }
        out.push('.');
        if let Some(availability) = &doctor.availability {
            out.push_str(&format!(" Available {availability}."));
        }
        out.push_str(" Would you like to book an appointment?");
        out
    }

    /// Hospital summary assembled from the live directory: departments,
    /// services, a couple of doctors per department, hours, and location.
    pub fn format_hospital_overview(
        &self,
        departments: &[Department],
        services: &[String],
        doctors: &[Doctor],
    ) -> String {
        let mut out = String::from(
            "City General Hospital is a full-service hospital with a 24/7 \
             Emergency department.\n",
        );

        if !departments.is_empty() {
            out.push_str("\nDepartments: ");
            let names: Vec<&str> = departments.iter().map(|d| d.name.as_str()).collect();
            out.push_str(&names.join(", "));
            out.push_str(".\n");
        }

        if !services.is_empty() {
            out.push_str("\nServices: ");
            let names: Vec<&str> = services.iter().map(String::as_str).collect();
            out.push_str(&names.join(", "));
            out.push_str(".\n");
        }

        if !doctors.is_empty() {
            out.push_str("\nSome of our doctors:\n");
            let mut listed: Vec<(&str, usize)> = Vec::new();
            for doctor in doctors {
                let dept = doctor.department.as_deref().unwrap_or("Other");
                let count = match listed.iter_mut().find(|(name, _)| *name == dept) {
                    Some((_, count)) => {
                        *count += 1;
                        *count
                    }
                    None => {
                        listed.push((dept, 1));
                        1
                    }
                };
                if count > OVERVIEW_DOCTORS_PER_DEPARTMENT {
                    continue;
                }
                out.push_str("\u{2022} ");
                out.push_str(&doctor.name);
                if let Some(spec) = &doctor.specialization {
                    out.push_str(" - ");
                    out.push_str(spec);
                }
                out.push('\n');
            }
        }

        out.push_str(
            "\nOPD hours: Monday to Saturday, 9:00 AM to 6:00 PM. \
             Find us at 123 Health Avenue, Springfield.\n\
             Ask about a department or doctor, or say 'book an appointment' \
             to get started.",
        );
        out
    }

    /// Search results for a partial doctor-name query.
    pub fn format_search_results(&self, query: &str, doctors: &[Doctor]) -> String {
        if doctors.is_empty() {
            return format!(
                "I couldn't find a doctor matching \"{query}\". \
                 Ask for our doctor list to see everyone."
            );
        }
        if doctors.len() == 1 {
            return self.format_doctor_info(&doctors[0]);
        }
        let mut out = format!("I found {} doctors matching \"{query}\":\n", doctors.len());
        for doctor in doctors {
            out.push_str("\u{2022} ");
            out.push_str(&doctor.name);
            if let Some(dept) = &doctor.department {
                out.push_str(&format!(" ({dept})"));
            }
            out.push('\n');
        }
        out
    }

    /// Shape retrieved passages into a short answer: split into sentences,
    /// score each by word overlap with the query, keep the best few in
    /// original order.
    pub fn format_faq_answer(&self, query: &str, passages: &str) -> Option<String> {
        if passages.trim().is_empty() {
            return None;
        }

        let query_words: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.len() > 2)
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .collect();

        let sentences: Vec<&str> = passages
            .split(['.', '\n'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if sentences.is_empty() {
            return None;
        }

        let mut scored: Vec<(usize, usize, &str)> = sentences
            .iter()
            .enumerate()
            .map(|(pos, sentence)| {
                let lower = sentence.to_lowercase();
                let score = query_words.iter().filter(|w| lower.contains(w.as_str())).count();
                (score, pos, *sentence)
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(FAQ_SENTENCES);
        scored.sort_by_key(|(_, pos, _)| *pos);

        let answer = scored
            .iter()
            .map(|(_, _, s)| *s)
            .collect::<Vec<_>>()
            .join(". ");
        if answer.is_empty() {
            None
        } else {
            Some(format!("{answer}."))
        }
    }

    /// Topic-keyed fallback when retrieval surfaces nothing useful.
    pub fn fallback_answer(&self, query: &str) -> String {
        let lower = query.to_lowercase();
        if lower.contains("timing") || lower.contains("hour") || lower.contains("open") {
            return TIMINGS_INFO.to_string();
        }
        if lower.contains("location") || lower.contains("address") || lower.contains("where") {
            return LOCATION_INFO.to_string();
        }
        if lower.contains("contact") || lower.contains("phone") || lower.contains("email") {
            return CONTACT_INFO.to_string();
        }
        if lower.contains("parking") {
            return "Free parking is available for patients in the lot behind \
                    the main building."
                .to_string();
        }
        if lower.contains("insurance") {
            return "We accept most major insurance plans. Please bring your \
                    insurance card to your visit, or call our billing desk to \
                    confirm coverage."
                .to_string();
        }
        if lower.contains("document") || lower.contains("bring") {
            return "Please bring a photo ID, your insurance card, and any \
                    previous medical records or prescriptions to your visit."
                .to_string();
        }
        "I'm not sure about that. I can help with appointments, doctors, \
         departments, timings, and directions. What would you like to know?"
            .to_string()
    }
}
