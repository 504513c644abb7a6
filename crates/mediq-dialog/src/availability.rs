//! Slot-grid availability checks.
//!
//! Slots are a fixed daily grid derived from `BookingConfig`: every
//! `slot_minutes` step between `open_hour` and `close_hour`. One active
//! appointment occupies a slot entirely.

use chrono::{Local, NaiveDate};
use mediq_core::config::BookingConfig;
use tracing::debug;

use crate::directory::BookingStore;
use crate::error::Result;

/// Outcome of checking one requested slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotCheck {
    Available,
    /// The date is not `YYYY-MM-DD`.
    InvalidDate(String),
    /// The date is before today.
    PastDate,
    /// The time is not `HH:MM`.
    InvalidTime(String),
    /// The time is valid but outside the bookable grid.
    OutsideHours,
    /// The slot is taken; carries the nearest free slots that day.
    Occupied(Vec<String>),
}

/// Validates requested slots against the grid and existing appointments.
#[derive(Debug, Clone)]
pub struct AvailabilityChecker {
    config: BookingConfig,
}

impl AvailabilityChecker {
    pub fn new(config: BookingConfig) -> Self {
        Self { config }
    }

    /// Every grid slot for one day, in order, as `HH:MM`.
    pub fn all_slots(&self) -> Vec<String> {
        let step = self.config.slot_minutes.max(1);
        let mut slots = Vec::new();
        for hour in self.config.open_hour..self.config.close_hour {
            let mut minute = 0;
            while minute < 60 {
                slots.push(format!("{hour:02}:{minute:02}"));
                minute += step;
            }
        }
        slots
    }

    /// Grid slots with no active appointment for the doctor on the date.
    pub fn available_slots(
        &self,
        store: &dyn BookingStore,
        doctor_id: u64,
        date: &str,
    ) -> Result<Vec<String>> {
        let mut free = Vec::new();
        for slot in self.all_slots() {
            if store.appointments_at(doctor_id, date, &slot)? == 0 {
                free.push(slot);
            }
        }
        Ok(free)
    }

    /// The free slots closest to a requested time, nearest first.
    pub fn suggest_alternatives(
        &self,
        store: &dyn BookingStore,
        doctor_id: u64,
        date: &str,
        requested_time: &str,
    ) -> Result<Vec<String>> {
        let requested = parse_minutes(requested_time).unwrap_or(0);
        let mut free = self.available_slots(store, doctor_id, date)?;
        free.sort_by_key(|slot| {
            parse_minutes(slot)
                .map(|m| (m - requested).abs())
                .unwrap_or(i32::MAX)
        });
        free.truncate(self.config.max_alternatives);
        Ok(free)
    }

    /// Validate a requested slot against today's date, the grid, and the
    /// store's existing appointments.
    pub fn check(
        &self,
        store: &dyn BookingStore,
        doctor_id: u64,
        date: &str,
        time: &str,
    ) -> Result<SlotCheck> {
        self.check_on(Local::now().date_naive(), store, doctor_id, date, time)
    }

    /// Deterministic variant of [`check`](Self::check) taking today's date.
    pub fn check_on(
        &self,
        today: NaiveDate,
        store: &dyn BookingStore,
        doctor_id: u64,
        date: &str,
        time: &str,
    ) -> Result<SlotCheck> {
        let Ok(requested_date) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else {
            return Ok(SlotCheck::InvalidDate(date.to_string()));
        };
        if requested_date < today {
            return Ok(SlotCheck::PastDate);
        }

        let Some(minutes) = parse_minutes(time) else {
            return Ok(SlotCheck::InvalidTime(time.to_string()));
        };
        let hour = (minutes / 60) as u32;
        let minute = (minutes % 60) as u32;
        if hour < self.config.open_hour
            || hour >= self.config.close_hour
            || minute % self.config.slot_minutes.max(1) != 0
        {
            return Ok(SlotCheck::OutsideHours);
        }

        if store.appointments_at(doctor_id, date, time)? > 0 {
            let alternatives = self.suggest_alternatives(store, doctor_id, date, time)?;
            debug!(doctor_id, date, time, "Requested slot occupied");
            return Ok(SlotCheck::Occupied(alternatives));
        }

        Ok(SlotCheck::Available)
    }
}

/// Minutes since midnight for a `HH:MM` string with a valid clock value.
fn parse_minutes(time: &str) -> Option<i32> {
    let (hour, minute) = time.split_once(':')?;
    let hour: i32 = hour.trim().parse().ok()?;
    let minute: i32 = minute.trim().parse().ok()?;
    if !(0..24).contains(&hour) || !(0..60).contains(&minute) {
        return None;
    }
    Some(hour * 60 + minute)
}
