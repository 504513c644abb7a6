//! Doctor directory and appointment persistence.
//!
//! `BookingStore` is the seam between the dialogue layer and whatever holds
//! the hospital's records. The in-memory implementation backs tests and
//! demo deployments.

use std::sync::Mutex;

use mediq_core::types::{Appointment, AppointmentStatus, Department, Doctor};
use tracing::{debug, info};

use crate::error::{DialogError, Result};

/// Persistence seam for doctors, departments, and appointments.
pub trait BookingStore: Send + Sync {
    fn list_doctors(&self) -> Result<Vec<Doctor>>;

    fn list_departments(&self) -> Result<Vec<Department>>;

    /// Names of the services the hospital offers.
    fn list_services(&self) -> Result<Vec<String>>;

    /// Doctors whose department matches, case-insensitively.
    fn doctors_in_department(&self, department: &str) -> Result<Vec<Doctor>>;

    /// Case-insensitive name search. Exact matches (ignoring the `Dr.`
    /// prefix) sort before partial matches.
    fn search_doctors_by_name(&self, name: &str) -> Result<Vec<Doctor>>;

    /// Best single match for a doctor name, or `None`.
    fn find_doctor(&self, name: &str) -> Result<Option<Doctor>> {
        Ok(self.search_doctors_by_name(name)?.into_iter().next())
    }

    /// Create a scheduled appointment and return the stored record.
    fn create_appointment(
        &self,
        patient_name: &str,
        doctor_id: u64,
        date: &str,
        time: &str,
    ) -> Result<Appointment>;

    fn find_appointment(&self, id: u64) -> Result<Option<Appointment>>;

    /// Most recently created active appointment for a patient name,
    /// case-insensitively.
    fn latest_for_patient(&self, patient_name: &str) -> Result<Option<Appointment>>;

    /// Mark an appointment cancelled. Returns false when the id is unknown
    /// or the appointment is already cancelled.
    fn cancel_appointment(&self, id: u64) -> Result<bool>;

    /// Count of active appointments for a doctor at an exact date and time.
    fn appointments_at(&self, doctor_id: u64, date: &str, time: &str) -> Result<usize>;
}

/// Lowercased name with any leading `dr.`/`dr` title removed.
fn normalize_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let stripped = lower
        .strip_prefix("dr.")
        .or_else(|| lower.strip_prefix("dr "))
        .unwrap_or(&lower);
    stripped.trim().to_string()
}

#[derive(Debug, Default)]
struct StoreState {
    doctors: Vec<Doctor>,
    departments: Vec<Department>,
    services: Vec<String>,
    appointments: Vec<Appointment>,
    next_appointment_id: u64,
}

/// In-memory `BookingStore`.
#[derive(Debug)]
pub struct InMemoryBookingStore {
    state: Mutex<StoreState>,
}

impl InMemoryBookingStore {
    pub fn new(
        doctors: Vec<Doctor>,
        departments: Vec<Department>,
        services: Vec<String>,
    ) -> Self {
        Self {
            state: Mutex::new(StoreState {
                doctors,
                departments,
                services,
                appointments: Vec::new(),
                next_appointment_id: 1,
            }),
        }
    }

    /// A store seeded with a small representative hospital roster.
    pub fn with_sample_data() -> Self {
        let departments = vec![
            Department {
                id: 1,
                name: "Cardiology".to_string(),
                description: Some("Heart and cardiovascular care".to_string()),
            },
            Department {
                id: 2,
                name: "Orthopedics".to_string(),
                description: Some("Bone, joint, and spine care".to_string()),
            },
            Department {
                id: 3,
                name: "Dermatology".to_string(),
                description: Some("Skin, hair, and nail care".to_string()),
            },
            Department {
                id: 4,
                name: "Neurology".to_string(),
                description: Some("Brain and nervous system care".to_string()),
            },
            Department {
                id: 5,
                name: "General Medicine".to_string(),
                description: Some("Primary and preventive care".to_string()),
            },
        ];
        let doctors = vec![
            Doctor {
                id: 1,
                name: "Dr. Sarah Johnson".to_string(),
                specialization: Some("Cardiologist".to_string()),
                department: Some("Cardiology".to_string()),
                availability: Some("Mon-Fri 9:00-17:00".to_string()),
            },
            Doctor {
                id: 2,
                name: "Dr. Michael Lee".to_string(),
                specialization: Some("Orthopedic Surgeon".to_string()),
                department: Some("Orthopedics".to_string()),
                availability: Some("Mon-Fri 9:00-17:00".to_string()),
            },
            Doctor {
                id: 3,
                name: "Dr. Priya Patel".to_string(),
                specialization: Some("Dermatologist".to_string()),
                department: Some("Dermatology".to_string()),
                availability: Some("Tue-Sat 10:00-16:00".to_string()),
            },
            Doctor {
                id: 4,
                name: "Dr. James Chen".to_string(),
                specialization: Some("Neurologist".to_string()),
                department: Some("Neurology".to_string()),
                availability: Some("Mon-Fri 9:00-17:00".to_string()),
            },
            Doctor {
                id: 5,
                name: "Dr. Emily Davis".to_string(),
                specialization: Some("General Physician".to_string()),
                department: Some("General Medicine".to_string()),
                availability: Some("Mon-Sat 8:00-18:00".to_string()),
            },
        ];
        let services = vec![
            "Outpatient consultations".to_string(),
            "Diagnostics and imaging".to_string(),
            "Pathology lab".to_string(),
            "Physiotherapy".to_string(),
            "Pharmacy".to_string(),
            "24/7 Emergency care".to_string(),
        ];
        Self::new(doctors, departments, services)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|e| DialogError::Booking(format!("lock poisoned: {e}")))
    }
}

impl BookingStore for InMemoryBookingStore {
    fn list_doctors(&self) -> Result<Vec<Doctor>> {
        Ok(self.lock()?.doctors.clone())
    }

    fn list_departments(&self) -> Result<Vec<Department>> {
        Ok(self.lock()?.departments.clone())
    }

    fn list_services(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.services.clone())
    }

    fn doctors_in_department(&self, department: &str) -> Result<Vec<Doctor>> {
        let wanted = department.trim().to_lowercase();
        Ok(self
            .lock()?
            .doctors
            .iter()
            .filter(|d| {
                d.department
                    .as_deref()
                    .map(|dept| dept.to_lowercase() == wanted)
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    fn search_doctors_by_name(&self, name: &str) -> Result<Vec<Doctor>> {
        let query = normalize_name(name);
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let state = self.lock()?;
        let mut exact = Vec::new();
        let mut partial = Vec::new();
        for doctor in &state.doctors {
            let candidate = normalize_name(&doctor.name);
            if candidate == query {
                exact.push(doctor.clone());
            } else if candidate.contains(&query) {
                partial.push(doctor.clone());
            }
        }
        exact.extend(partial);
        Ok(exact)
    }

    fn create_appointment(
        &self,
        patient_name: &str,
        doctor_id: u64,
        date: &str,
        time: &str,
    ) -> Result<Appointment> {
        let mut state = self.lock()?;
        if !state.doctors.iter().any(|d| d.id == doctor_id) {
            return Err(DialogError::Booking(format!("unknown doctor id {doctor_id}")));
        }

        let appointment = Appointment {
            id: state.next_appointment_id,
            patient_name: patient_name.to_string(),
            doctor_id,
            date: date.to_string(),
            time: time.to_string(),
            status: AppointmentStatus::Scheduled,
        };
        state.next_appointment_id += 1;
        state.appointments.push(appointment.clone());
        info!(
            appointment_id = appointment.id,
            doctor_id, date, time, "Appointment created"
        );
        Ok(appointment)
    }

    fn find_appointment(&self, id: u64) -> Result<Option<Appointment>> {
        Ok(self
            .lock()?
            .appointments
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    fn latest_for_patient(&self, patient_name: &str) -> Result<Option<Appointment>> {
        let wanted = patient_name.trim().to_lowercase();
        Ok(self
            .lock()?
            .appointments
            .iter()
            .rev()
            .find(|a| a.status.is_active() && a.patient_name.to_lowercase() == wanted)
            .cloned())
    }

    fn cancel_appointment(&self, id: u64) -> Result<bool> {
        let mut state = self.lock()?;
        match state.appointments.iter_mut().find(|a| a.id == id) {
            Some(appointment) if appointment.status != AppointmentStatus::Cancelled => {
                appointment.status = AppointmentStatus::Cancelled;
                debug!(appointment_id = id, "Appointment cancelled");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn appointments_at(&self, doctor_id: u64, date: &str, time: &str) -> Result<usize> {
        Ok(self
            .lock()?
            .appointments
            .iter()
            .filter(|a| {
                a.doctor_id == doctor_id
                    && a.date == date
                    && a.time == time
                    && a.status.is_active()
            })
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryBookingStore {
        InMemoryBookingStore::with_sample_data()
    }

    #[test]
    fn test_sample_data_seeded() {
        let store = store();
        assert_eq!(store.list_doctors().unwrap().len(), 5);
        assert_eq!(store.list_departments().unwrap().len(), 5);
        assert!(store
            .list_services()
            .unwrap()
            .contains(&"Physiotherapy".to_string()));
    }

    #[test]
    fn test_doctors_in_department_case_insensitive() {
        let store = store();
        let doctors = store.doctors_in_department("cardiology").unwrap();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0].name, "Dr. Sarah Johnson");
        assert!(store.doctors_in_department("radiology").unwrap().is_empty());
    }

    #[test]
    fn test_search_exact_match_first() {
        let store = store();
        let results = store.search_doctors_by_name("Dr. Sarah Johnson").unwrap();
        assert_eq!(results[0].name, "Dr. Sarah Johnson");

        // Title and case variations still match exactly.
        let results = store.search_doctors_by_name("sarah johnson").unwrap();
        assert_eq!(results[0].name, "Dr. Sarah Johnson");
    }

    #[test]
    fn test_search_partial_match() {
        let store = store();
        let results = store.search_doctors_by_name("johnson").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Dr. Sarah Johnson");
    }

    #[test]
    fn test_search_empty_query() {
        let store = store();
        assert!(store.search_doctors_by_name("  ").unwrap().is_empty());
        assert!(store.search_doctors_by_name("Dr.").unwrap().is_empty());
    }

    #[test]
    fn test_find_doctor_none_for_unknown() {
        let store = store();
        assert!(store.find_doctor("Dr. Nobody Atall").unwrap().is_none());
    }

    #[test]
    fn test_create_appointment_assigns_ids() {
        let store = store();
        let a1 = store
            .create_appointment("Pat Smith", 1, "2026-09-01", "10:00")
            .unwrap();
        let a2 = store
            .create_appointment("Pat Smith", 2, "2026-09-02", "11:00")
            .unwrap();
        assert_eq!(a1.id, 1);
        assert_eq!(a2.id, 2);
        assert_eq!(a1.status, AppointmentStatus::Scheduled);
    }

    #[test]
    fn test_create_appointment_unknown_doctor() {
        let store = store();
        let result = store.create_appointment("Pat Smith", 999, "2026-09-01", "10:00");
        assert!(matches!(result, Err(DialogError::Booking(_))));
    }

    #[test]
    fn test_find_and_cancel_appointment() {
        let store = store();
        let appt = store
            .create_appointment("Pat Smith", 1, "2026-09-01", "10:00")
            .unwrap();

        assert!(store.find_appointment(appt.id).unwrap().is_some());
        assert!(store.cancel_appointment(appt.id).unwrap());
        assert!(!store.cancel_appointment(appt.id).unwrap());
        assert_eq!(
            store.find_appointment(appt.id).unwrap().unwrap().status,
            AppointmentStatus::Cancelled
        );
        assert!(!store.cancel_appointment(999).unwrap());
    }

    #[test]
    fn test_latest_for_patient_skips_cancelled() {
        let store = store();
        let first = store
            .create_appointment("Pat Smith", 1, "2026-09-01", "10:00")
            .unwrap();
        let second = store
            .create_appointment("pat smith", 2, "2026-09-02", "11:00")
            .unwrap();

        assert_eq!(
            store.latest_for_patient("Pat Smith").unwrap().unwrap().id,
            second.id
        );
        store.cancel_appointment(second.id).unwrap();
        assert_eq!(
            store.latest_for_patient("PAT SMITH").unwrap().unwrap().id,
            first.id
        );
    }

    #[test]
    fn test_appointments_at_counts_active_only() {
        let store = store();
        let appt = store
            .create_appointment("Pat Smith", 1, "2026-09-01", "10:00")
            .unwrap();
        assert_eq!(store.appointments_at(1, "2026-09-01", "10:00").unwrap(), 1);
        assert_eq!(store.appointments_at(1, "2026-09-01", "10:30").unwrap(), 0);

        store.cancel_appointment(appt.id).unwrap();
        assert_eq!(store.appointments_at(1, "2026-09-01", "10:00").unwrap(), 0);
    }
}
