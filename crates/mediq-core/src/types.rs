use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Closed set of intents a turn can be assigned. Exactly one per turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    AppointmentBooking,
    DoctorInfo,
    Services,
    /// Catch-all for informational questions with no dedicated handler.
    #[default]
    Faq,
    Emergency,
    Location,
    Timings,
    Contact,
    SymptomQuery,
    CancelAppointment,
}

impl Intent {
    /// All intents, in scoring order.
    pub const ALL: [Intent; 11] = [
        Intent::Greeting,
        Intent::AppointmentBooking,
        Intent::DoctorInfo,
        Intent::Services,
        Intent::Faq,
        Intent::Emergency,
        Intent::Location,
        Intent::Timings,
        Intent::Contact,
        Intent::SymptomQuery,
        Intent::CancelAppointment,
    ];

    /// Wire label for the intent.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::AppointmentBooking => "appointment_booking",
            Intent::DoctorInfo => "doctor_info",
            Intent::Services => "services",
            Intent::Faq => "faq",
            Intent::Emergency => "emergency",
            Intent::Location => "location",
            Intent::Timings => "timings",
            Intent::Contact => "contact",
            Intent::SymptomQuery => "symptom_query",
            Intent::CancelAppointment => "cancel_appointment",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who produced a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Lifecycle state of an appointment record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    /// Whether an appointment in this state still occupies its slot.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
    }
}

// =============================================================================
// Structured records
// =============================================================================

/// Structured fields extracted from one utterance.
///
/// Absence (`None`) is distinct from an empty string: a field is only filled
/// when there is textual evidence for it, or when explicitly back-filled from
/// session context.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entities {
    pub doctor: Option<String>,
    /// Canonical `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Canonical `HH:MM` (24-hour).
    pub time: Option<String>,
    pub department: Option<String>,
    pub patient_name: Option<String>,
    pub phone: Option<String>,
}

impl Entities {
    /// True when no field is filled.
    pub fn is_empty(&self) -> bool {
        self.doctor.is_none()
            && self.date.is_none()
            && self.time.is_none()
            && self.department.is_none()
            && self.patient_name.is_none()
            && self.phone.is_none()
    }

    /// True when all three booking slots are filled.
    pub fn has_booking_slots(&self) -> bool {
        self.doctor.is_some() && self.date.is_some() && self.time.is_some()
    }
}

/// One message in a session's rolling history. Immutable once appended.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub intent: Option<Intent>,
    pub entities: Option<Entities>,
}

/// Result of one conversational turn, returned to the transport layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub intent: Intent,
    pub entities: Entities,
    pub is_follow_up: bool,
}

/// A doctor as known to the booking store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: u64,
    /// Full name including the `Dr. ` prefix.
    pub name: String,
    pub specialization: Option<String>,
    pub department: Option<String>,
    pub availability: Option<String>,
}

/// A department as known to the booking store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
}

/// An appointment record held by the booking store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: u64,
    pub patient_name: String,
    pub doctor_id: u64,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// `HH:MM`.
    pub time: String,
    pub status: AppointmentStatus,
}
