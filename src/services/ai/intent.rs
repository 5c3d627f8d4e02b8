use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::Label;
use crate::services::ai::{extract_json, LlmProvider, Message};

/// Black-box utterance classifier. Must be side-effect free.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, utterance: &str) -> anyhow::Result<Label>;
}

const SYSTEM_PROMPT: &str = r#"You route messages sent to a hospital's patient assistant.

Return ONLY valid JSON (no markdown, no explanation): {"route": "faq|appointment|unclear"}

- "faq": questions about the hospital itself: visiting hours, admission documents, insurance, billing, facilities, policies.
- "appointment": finding a doctor or specialist, describing symptoms, checking a doctor's availability, booking, cancelling or moving an appointment.
- "unclear": anything that only makes sense as a follow-up ("yes", "10am", "confirm", "what about for children"), greetings, or unrelated topics.

Judge the message on its own; do not guess at earlier conversation."#;

#[derive(Deserialize)]
struct RouteReply {
    route: String,
}

pub struct LlmIntentClassifier {
    llm: Arc<dyn LlmProvider>,
}

impl LlmIntentClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(&self, utterance: &str) -> anyhow::Result<Label> {
        let messages = [Message {
            role: "user".to_string(),
            content: utterance.to_string(),
        }];
        let response = self.llm.chat(SYSTEM_PROMPT, &messages).await?;
        Ok(parse_route_response(&response))
    }
}

fn parse_route_response(response: &str) -> Label {
    if let Some(reply) = extract_json::<RouteReply>(response) {
        return Label::parse(&reply.route);
    }

    // Some models answer with the bare word.
    let bare = response.trim().trim_matches(|c: char| !c.is_alphanumeric());
    let label = Label::parse(bare);
    if label == Label::Unclear && !bare.eq_ignore_ascii_case("unclear") {
        tracing::warn!("unrecognised classifier reply, treating as unclear");
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedLlm(&'static str);

    #[async_trait]
    impl LlmProvider for CannedLlm {
        async fn chat(&self, _system_prompt: &str, _messages: &[Message]) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_parse_json_route() {
        assert_eq!(parse_route_response(r#"{"route":"appointment"}"#), Label::Appointment);
        assert_eq!(parse_route_response("```json\n{\"route\":\"faq\"}\n```"), Label::Faq);
    }

    #[test]
    fn test_parse_bare_word_and_garbage() {
        assert_eq!(parse_route_response("FAQ."), Label::Faq);
        assert_eq!(parse_route_response("I think this is about billing"), Label::Unclear);
        assert_eq!(parse_route_response(r#"{"route":"billing"}"#), Label::Unclear);
    }

    #[tokio::test]
    async fn test_classifier_uses_provider_reply() {
        let classifier = LlmIntentClassifier::new(Arc::new(CannedLlm(r#"{"route":"appointment"}"#)));
        assert_eq!(classifier.classify("I have chest pain").await.unwrap(), Label::Appointment);
    }
}
