//! Natural-language understanding for Mediq.
//!
//! Deterministic, regex-driven parsing of patient messages: relative date
//! and time expressions, booking entities, intent classification, and
//! symptom-to-department routing.

pub mod classifier;
pub mod datetime;
pub mod extractor;
pub mod symptoms;

pub use classifier::IntentClassifier;
pub use datetime::DateTimeParser;
pub use extractor::EntityExtractor;
pub use symptoms::{DepartmentRecommendation, SymptomMapper};
