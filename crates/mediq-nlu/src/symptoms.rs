//! Symptom and disease to department mapping.
//!
//! Static keyword tables route free-text symptom mentions to an
//! administrative department. This only suggests where to go; it is not
//! diagnosis.

use regex::Regex;
use std::sync::LazyLock;

/// Symptom/disease phrase to department label.
static SYMPTOM_TO_DEPARTMENT: &[(&str, &str)] = &[
    // Cardiovascular
    ("chest pain", "Cardiology"),
    ("heart", "Cardiology"),
    ("heart attack", "Cardiology"),
    ("hypertension", "Cardiology"),
    ("high blood pressure", "Cardiology"),
    ("palpitations", "Cardiology"),
    ("shortness of breath", "Cardiology"),
    ("breathing difficulty", "Cardiology"),
    ("cardiac", "Cardiology"),
    ("cardiovascular", "Cardiology"),
    ("arrhythmia", "Cardiology"),
    ("angina", "Cardiology"),
    ("heartburn", "Cardiology"),
    // Endocrine
    ("diabetes", "Endocrinology"),
    ("diabetic", "Endocrinology"),
    ("thyroid", "Endocrinology"),
    ("hormone", "Endocrinology"),
    ("blood sugar", "Endocrinology"),
    ("hypoglycemia", "Endocrinology"),
    ("hyperglycemia", "Endocrinology"),
    ("insulin", "Endocrinology"),
    ("metabolic", "Endocrinology"),
    // Orthopedic
    ("joint pain", "Orthopedics"),
    ("bone", "Orthopedics"),
    ("fracture", "Orthopedics"),
    ("knee pain", "Orthopedics"),
    ("back pain", "Orthopedics"),
    ("arthritis", "Orthopedics"),
    ("sprain", "Orthopedics"),
    ("dislocation", "Orthopedics"),
    ("shoulder pain", "Orthopedics"),
    ("hip pain", "Orthopedics"),
    ("ankle pain", "Orthopedics"),
    ("wrist pain", "Orthopedics"),
    ("sports injury", "Orthopedics"),
    ("orthopedic", "Orthopedics"),
    // Gastrointestinal
    ("stomach pain", "Gastroenterology"),
    ("stomach", "Gastroenterology"),
    ("digestion", "Gastroenterology"),
    ("nausea", "Gastroenterology"),
    ("vomiting", "Gastroenterology"),
    ("diarrhea", "Gastroenterology"),
    ("constipation", "Gastroenterology"),
    ("abdominal pain", "Gastroenterology"),
    ("gastro", "Gastroenterology"),
    ("ulcer", "Gastroenterology"),
    ("acid reflux", "Gastroenterology"),
    ("gerd", "Gastroenterology"),
    ("ibs", "Gastroenterology"),
    ("liver", "Gastroenterology"),
    ("gallbladder", "Gastroenterology"),
    // Dermatology
    ("skin", "Dermatology"),
    ("rash", "Dermatology"),
    ("allergy", "Dermatology"),
    ("acne", "Dermatology"),
    ("eczema", "Dermatology"),
    ("psoriasis", "Dermatology"),
    ("dermatitis", "Dermatology"),
    ("hives", "Dermatology"),
    ("mole", "Dermatology"),
    ("wart", "Dermatology"),
    ("dermatology", "Dermatology"),
    // Ophthalmology
    ("eye", "Ophthalmology"),
    ("vision", "Ophthalmology"),
    ("glaucoma", "Ophthalmology"),
    ("cataract", "Ophthalmology"),
    ("ophthalmology", "Ophthalmology"),
    ("retina", "Ophthalmology"),
    ("conjunctivitis", "Ophthalmology"),
    ("pink eye", "Ophthalmology"),
    ("dry eyes", "Ophthalmology"),
    ("blurred vision", "Ophthalmology"),
    // Pediatrics
    ("child", "Pediatrics"),
    ("baby", "Pediatrics"),
    ("infant", "Pediatrics"),
    ("pediatric", "Pediatrics"),
    ("pediatrician", "Pediatrics"),
    ("newborn", "Pediatrics"),
    ("toddler", "Pediatrics"),
    // Neurology
    ("headache", "Neurology"),
    ("migraine", "Neurology"),
    ("seizure", "Neurology"),
    ("epilepsy", "Neurology"),
    ("neurology", "Neurology"),
    ("dizziness", "Neurology"),
    ("vertigo", "Neurology"),
    ("stroke", "Neurology"),
    ("parkinson", "Neurology"),
    ("tremor", "Neurology"),
    // Urology
    ("urinary", "Urology"),
    ("kidney", "Urology"),
    ("bladder", "Urology"),
    ("urology", "Urology"),
    ("uti", "Urology"),
    ("urinary tract infection", "Urology"),
    ("kidney stone", "Urology"),
    // ENT
    ("ear", "ENT"),
    ("nose", "ENT"),
    ("throat", "ENT"),
    ("sinus", "ENT"),
    ("hearing", "ENT"),
    ("tonsil", "ENT"),
    ("laryngitis", "ENT"),
    ("otolaryngology", "ENT"),
    // General Medicine
    ("fever", "General Medicine"),
    ("cold", "General Medicine"),
    ("flu", "General Medicine"),
    ("cough", "General Medicine"),
    ("sore throat", "General Medicine"),
    ("fatigue", "General Medicine"),
    ("weakness", "General Medicine"),
    ("general", "General Medicine"),
    // Emergency
    ("emergency", "Emergency"),
    ("severe bleeding", "Emergency"),
    ("unconscious", "Emergency"),
    ("severe injury", "Emergency"),
    ("overdose", "Emergency"),
    ("severe allergic reaction", "Emergency"),
    ("anaphylaxis", "Emergency"),
];

/// Department-name variants to canonical department labels.
static DEPARTMENT_SYNONYMS: &[(&str, &str)] = &[
    ("cardiology", "Cardiology"),
    ("cardiac", "Cardiology"),
    ("heart", "Cardiology"),
    ("endocrinology", "Endocrinology"),
    ("endocrine", "Endocrinology"),
    ("orthopedics", "Orthopedics"),
    ("orthopedic", "Orthopedics"),
    ("bone", "Orthopedics"),
    ("gastroenterology", "Gastroenterology"),
    ("gastro", "Gastroenterology"),
    ("stomach", "Gastroenterology"),
    ("dermatology", "Dermatology"),
    ("skin", "Dermatology"),
    ("ophthalmology", "Ophthalmology"),
    ("eye", "Ophthalmology"),
    ("pediatrics", "Pediatrics"),
    ("pediatric", "Pediatrics"),
    ("neurology", "Neurology"),
    ("urology", "Urology"),
    ("ent", "ENT"),
    ("ear nose throat", "ENT"),
    ("general medicine", "General Medicine"),
    ("general", "General Medicine"),
    ("emergency", "Emergency"),
];

/// Symptom phrases compiled to word-boundary patterns, sorted by phrase
/// length descending so longer phrases win on overlap ("heart attack"
/// before "heart").
static SYMPTOM_PATTERNS: LazyLock<Vec<(&'static str, Regex, &'static str)>> =
    LazyLock::new(|| {
        let mut entries: Vec<_> = SYMPTOM_TO_DEPARTMENT
            .iter()
            .map(|(phrase, dept)| {
                let re = Regex::new(&format!(r"\b{}\b", regex::escape(phrase))).unwrap();
                (*phrase, re, *dept)
            })
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        entries
    });

static SYNONYM_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    DEPARTMENT_SYNONYMS
        .iter()
        .map(|(phrase, dept)| {
            let re = Regex::new(&format!(r"\b{}\b", regex::escape(phrase))).unwrap();
            (re, *dept)
        })
        .collect()
});

/// A department recommendation derived from symptom mentions.
#[derive(Clone, Debug, PartialEq)]
pub struct DepartmentRecommendation {
    pub department: String,
    /// Matched symptom phrases, in table order.
    pub symptoms: Vec<String>,
    /// `match_count / symptoms.len()`.
    pub confidence: f32,
    /// Votes for the winning department.
    pub match_count: usize,
}

/// Maps symptom and disease mentions to hospital departments.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymptomMapper;

impl SymptomMapper {
    pub fn new() -> Self {
        Self
    }

    /// Map symptom text to a department, longest phrase winning on overlap.
    /// Falls back to department-name synonyms, then `None`.
    pub fn map_symptom_to_department(&self, text: &str) -> Option<String> {
        if text.is_empty() {
            return None;
        }
        let lower = text.to_lowercase();

        for (_, pattern, dept) in SYMPTOM_PATTERNS.iter() {
            if pattern.is_match(&lower) {
                return Some((*dept).to_string());
            }
        }
        for (pattern, dept) in SYNONYM_PATTERNS.iter() {
            if pattern.is_match(&lower) {
                return Some((*dept).to_string());
            }
        }
        None
    }

    /// All symptom phrases mentioned in the text, in table order.
    pub fn extract_symptoms(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        SYMPTOM_TO_DEPARTMENT
            .iter()
            .filter(|(phrase, _)| {
                // Reuse the compiled pattern for this phrase.
                SYMPTOM_PATTERNS
                    .iter()
                    .find(|(p, _, _)| p == phrase)
                    .map(|(_, re, _)| re.is_match(&lower))
                    .unwrap_or(false)
            })
            .map(|(phrase, _)| (*phrase).to_string())
            .collect()
    }

    /// Vote-counted department recommendation across all matched symptoms.
    ///
    /// Ties break toward the department first reached in match order.
    pub fn get_recommended_department(&self, text: &str) -> Option<DepartmentRecommendation> {
        let symptoms = self.extract_symptoms(text);
        if symptoms.is_empty() {
            return None;
        }

        let mut counts: Vec<(&str, usize)> = Vec::new();
        for symptom in &symptoms {
            if let Some((_, dept)) = SYMPTOM_TO_DEPARTMENT
                .iter()
                .find(|(phrase, _)| phrase == symptom)
            {
                match counts.iter_mut().find(|(d, _)| d == dept) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((dept, 1)),
                }
            }
        }

        // Ties keep the department reached first.
        let mut department = counts[0].0;
        let mut match_count = counts[0].1;
        for (dept, n) in &counts[1..] {
            if *n > match_count {
                department = dept;
                match_count = *n;
            }
        }

        Some(DepartmentRecommendation {
            department: department.to_string(),
            confidence: match_count as f32 / symptoms.len() as f32,
            symptoms,
            match_count,
        })
    }
}
