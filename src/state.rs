use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::ai::extraction::{BookingExtractor, LlmBookingExtractor};
use crate::services::ai::faq::{AnswerGenerator, FixedResponder, LlmFaqAnswerer, Responder};
use crate::services::ai::intent::{IntentClassifier, LlmIntentClassifier};
use crate::services::ai::keyword::KeywordClassifier;
use crate::services::ai::LlmProvider;
use crate::services::booking::BookingPlanner;
use crate::services::ledger::SlotLedger;
use crate::services::sessions::SessionStore;

pub struct AppState {
    pub config: AppConfig,
    pub planner: BookingPlanner,
    pub sessions: SessionStore,
    pub classifier: Box<dyn IntentClassifier>,
    pub extractor: Box<dyn BookingExtractor>,
    pub answerer: Box<dyn AnswerGenerator>,
    pub responder: Box<dyn Responder>,
}

impl AppState {
    /// Wires the default collaborators around one LLM provider.
    pub fn new(config: AppConfig, conn: Connection, llm: Arc<dyn LlmProvider>) -> Self {
        let classifier: Box<dyn IntentClassifier> = match config.classifier.as_str() {
            "llm" => Box::new(LlmIntentClassifier::new(llm.clone())),
            _ => Box::new(KeywordClassifier),
        };

        let ledger = SlotLedger::new(Arc::new(Mutex::new(conn)));
        Self {
            planner: BookingPlanner::new(ledger, config.slot_minutes),
            sessions: SessionStore::new(config.session_window),
            classifier,
            extractor: Box::new(LlmBookingExtractor::new(llm.clone())),
            answerer: Box::new(LlmFaqAnswerer::new(llm, config.clinic_name.clone())),
            responder: Box::new(FixedResponder::new(config.refusal_message.clone())),
            config,
        }
    }
}
