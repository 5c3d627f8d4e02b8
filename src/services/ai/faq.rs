use std::sync::Arc;

use async_trait::async_trait;

use crate::services::ai::{LlmProvider, Message};

/// Answers hospital questions. `chat_history` is only present when the turn was
/// an unclear follow-up inside an FAQ conversation.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn answer(&self, query: &str, chat_history: Option<&str>) -> anyhow::Result<String>;
}

/// Produces the reply for rejected turns.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, query: &str) -> anyhow::Result<String>;
}

pub struct LlmFaqAnswerer {
    llm: Arc<dyn LlmProvider>,
    clinic_name: String,
}

impl LlmFaqAnswerer {
    pub fn new(llm: Arc<dyn LlmProvider>, clinic_name: String) -> Self {
        Self { llm, clinic_name }
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are the patient help desk for {}. Answer questions about visiting hours, admission, \
             documents, insurance, billing and hospital facilities in a short, friendly reply. \
             Do not give medical diagnoses. If you don't know a policy, say so and suggest calling the front desk.",
            self.clinic_name
        )
    }
}

#[async_trait]
impl AnswerGenerator for LlmFaqAnswerer {
    async fn answer(&self, query: &str, chat_history: Option<&str>) -> anyhow::Result<String> {
        let content = match chat_history {
            Some(history) if !history.is_empty() => format!(
                "Conversation so far:\n{history}\n\nFollow-up question: {query}"
            ),
            _ => query.to_string(),
        };
        let messages = [Message {
            role: "user".to_string(),
            content,
        }];

        let reply = self.llm.chat(&self.system_prompt(), &messages).await?;
        Ok(reply.trim().to_string())
    }
}

/// Always answers with the same configured sentence.
pub struct FixedResponder {
    message: String,
}

impl FixedResponder {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

#[async_trait]
impl Responder for FixedResponder {
    async fn respond(&self, _query: &str) -> anyhow::Result<String> {
        Ok(self.message.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingLlm {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for RecordingLlm {
        async fn chat(&self, _system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
            self.seen
                .lock()
                .unwrap()
                .extend(messages.iter().map(|m| m.content.clone()));
            Ok("  Visiting hours are 10:00 to 20:00.\n".to_string())
        }
    }

    #[tokio::test]
    async fn test_answer_without_history_sends_query_only() {
        let llm = Arc::new(RecordingLlm::default());
        let faq = LlmFaqAnswerer::new(llm.clone(), "Apollo Hospital".to_string());
        let reply = faq.answer("What are the visiting hours?", None).await.unwrap();
        assert_eq!(reply, "Visiting hours are 10:00 to 20:00.");
        assert_eq!(llm.seen.lock().unwrap().as_slice(), ["What are the visiting hours?"]);
    }

    #[tokio::test]
    async fn test_answer_with_history_includes_it() {
        let llm = Arc::new(RecordingLlm::default());
        let faq = LlmFaqAnswerer::new(llm.clone(), "Apollo Hospital".to_string());
        faq.answer("what about for children", Some("user: visiting hours?\nassistant: 10 to 8"))
            .await
            .unwrap();
        let seen = llm.seen.lock().unwrap();
        assert!(seen[0].contains("user: visiting hours?"));
        assert!(seen[0].ends_with("Follow-up question: what about for children"));
    }

    #[tokio::test]
    async fn test_fixed_responder() {
        let responder = FixedResponder::new("Please ask only about hospital related queries.".to_string());
        assert_eq!(
            responder.respond("tell me a joke").await.unwrap(),
            "Please ask only about hospital related queries."
        );
    }
}
