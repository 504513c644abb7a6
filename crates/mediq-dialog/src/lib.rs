//! Dialogue layer for Mediq.
//!
//! Session memory, the doctor directory and appointment store, slot
//! availability, booking and cancellation flows, response assembly, and
//! the turn orchestrator that ties them together.

pub mod availability;
pub mod booking;
pub mod directory;
pub mod error;
pub mod orchestrator;
pub mod responses;
pub mod session;

pub use availability::{AvailabilityChecker, SlotCheck};
pub use booking::BookingFlow;
pub use directory::{BookingStore, InMemoryBookingStore};
pub use error::{DialogError, Result};
pub use orchestrator::DialogueOrchestrator;
pub use responses::ResponseBuilder;
pub use session::SessionStore;
