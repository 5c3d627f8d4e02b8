use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub llm_provider: String,
    pub groq_api_key: String,
    pub groq_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub classifier: String,
    pub llm_timeout_secs: u64,
    pub slot_minutes: u32,
    pub history_turns: usize,
    pub session_window: usize,
    pub refusal_message: String,
    pub clinic_name: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: parsed("PORT", 3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "frontdesk.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "ollama".to_string()),
            groq_api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
            groq_model: env::var("GROQ_MODEL")
                .unwrap_or_else(|_| "llama-3.1-8b-instant".to_string()),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
            classifier: env::var("CLASSIFIER").unwrap_or_else(|_| "keyword".to_string()),
            llm_timeout_secs: parsed("LLM_TIMEOUT_SECS", 30),
            slot_minutes: parsed("SLOT_MINUTES", 30),
            history_turns: parsed("HISTORY_TURNS", 5),
            session_window: parsed("SESSION_WINDOW", 20),
            refusal_message: env::var("REFUSAL_MESSAGE")
                .unwrap_or_else(|_| "Please ask only about hospital related queries.".to_string()),
            clinic_name: env::var("CLINIC_NAME").unwrap_or_else(|_| "Apollo Hospital".to_string()),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "frontdesk.db".to_string(),
            admin_token: "changeme".to_string(),
            llm_provider: "ollama".to_string(),
            groq_api_key: String::new(),
            groq_model: "llama-3.1-8b-instant".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2".to_string(),
            classifier: "keyword".to_string(),
            llm_timeout_secs: 30,
            slot_minutes: 30,
            history_turns: 5,
            session_window: 20,
            refusal_message: "Please ask only about hospital related queries.".to_string(),
            clinic_name: "Apollo Hospital".to_string(),
        }
    }
}

/// Unset or unparseable values fall back to `default`.
fn parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
