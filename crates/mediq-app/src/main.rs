//! Interactive console front-end for the Mediq assistant.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use mediq_core::MediqConfig;
use mediq_dialog::{DialogError, DialogueOrchestrator, InMemoryBookingStore};
use mediq_nlu::IntentClassifier;
use mediq_vector::{HashEmbedding, RetrievalEngine};

fn config_path() -> PathBuf {
    std::env::var_os("MEDIQ_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("mediq.toml"))
}

/// Background knowledge served through retrieval for questions no intent
/// handler covers.
fn faq_corpus() -> Vec<String> {
    [
        "The hospital pharmacy is open 8 AM to 10 PM and stocks all common prescriptions",
        "Free parking is available for patients in the lot behind the main building",
        "We accept most major insurance plans; bring your insurance card to every visit",
        "Visiting hours are 4 PM to 7 PM daily, limited to two visitors per patient",
        "The cafeteria on the ground floor serves breakfast, lunch, and dinner",
        "Wheelchair assistance is available at the main entrance on request",
        "Lab sample collection runs 7 AM to 11 AM; most reports are ready the same evening",
        "Medical records can be requested at the front desk with a photo ID",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Config first so its log level can seed the filter.
    let config_file = config_path();
    let config = MediqConfig::load_or_default(&config_file);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Mediq v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    let backend = Arc::new(HashEmbedding::new());

    let mut retrieval = RetrievalEngine::new(backend.clone());
    retrieval.build_index(faq_corpus())?;

    let classifier = match IntentClassifier::with_similarity(config.classifier.clone(), backend) {
        Ok(classifier) => classifier,
        Err(e) => {
            tracing::warn!(error = %e, "Similarity scoring unavailable, using keyword patterns");
            IntentClassifier::pattern_only(config.classifier.clone())
        }
    };

    let store = Arc::new(InMemoryBookingStore::with_sample_data());
    let orchestrator = DialogueOrchestrator::new(config, store)
        .with_classifier(classifier)
        .with_retrieval(retrieval);

    let session_id = uuid::Uuid::new_v4().to_string();
    tracing::debug!(session_id, "Session started");

    println!("Mediq hospital assistant. Type 'quit' to exit.");
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        match orchestrator.handle_turn(&session_id, line) {
            Ok(outcome) => println!("{}\n", outcome.reply),
            Err(DialogError::EmptyMessage) => continue,
            Err(e) => {
                tracing::error!(error = %e, "Turn failed");
                println!("Sorry, something went wrong. Please try again.\n");
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}
