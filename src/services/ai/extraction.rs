use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};

use crate::models::availability::weekday_full_name;
use crate::models::{BookingCommand, BookingRequest, ChatMessage};
use crate::services::ai::{extract_json, LlmProvider, Message};

/// Asked when the model gave nothing usable to show the patient.
pub const CLARIFY_PROMPT: &str = "Could you tell me which doctor, date and time you'd like?";

/// What the extractor needs to know beyond the utterance itself.
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    pub today: NaiveDate,
    pub pending: BookingRequest,
}

/// Turns a scheduling utterance into a structured command. Never touches the
/// ledger; the planner validates everything it returns.
#[async_trait]
pub trait BookingExtractor: Send + Sync {
    async fn extract(
        &self,
        utterance: &str,
        history: &[ChatMessage],
        ctx: &ExtractionContext,
    ) -> anyhow::Result<BookingCommand>;
}

pub struct LlmBookingExtractor {
    llm: Arc<dyn LlmProvider>,
}

impl LlmBookingExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl BookingExtractor for LlmBookingExtractor {
    async fn extract(
        &self,
        utterance: &str,
        history: &[ChatMessage],
        ctx: &ExtractionContext,
    ) -> anyhow::Result<BookingCommand> {
        let system_prompt = build_extraction_prompt(ctx);
        let mut messages: Vec<Message> = history.iter().map(Message::from).collect();
        messages.push(Message {
            role: "user".to_string(),
            content: utterance.to_string(),
        });

        let response = self.llm.chat(&system_prompt, &messages).await?;
        Ok(parse_command_response(&response))
    }
}

fn build_extraction_prompt(ctx: &ExtractionContext) -> String {
    let pending = serde_json::to_string(&ctx.pending).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"You extract scheduling actions for a hospital appointment desk.
Today is {weekday}, {today}.

Booking details already collected in this conversation: {pending}

Return ONLY valid JSON (no markdown, no explanation) with one of these shapes:
{{"action":"find_doctors","specialization":"Cardiologist"}}
{{"action":"check_availability","doctor_id":3,"date":"YYYY-MM-DD"}}
{{"action":"available_on","date":"YYYY-MM-DD"}}
{{"action":"book","doctor_id":3,"date":"YYYY-MM-DD","time":"HH:MM","patient_name":"...","patient_phone":"..."}}
{{"action":"cancel","appointment_id":"...","patient_name":"...","patient_phone":"..."}}
{{"action":"reschedule","appointment_id":"...","patient_name":"...","patient_phone":"...","date":"YYYY-MM-DD","time":"HH:MM"}}
{{"action":"my_appointments","patient_phone":"..."}}
{{"action":"clarify","message":"question to ask the patient"}}

Rules:
- When the patient describes symptoms, pick the specialist: chest pain or palpitations -> Cardiologist, bone or joint pain and fractures -> Orthopedic, skin rash or acne -> Dermatologist, headaches or seizures -> Neurologist, children's illnesses -> Pediatrician, fever or general illness -> General Physician.
- Dates are ISO YYYY-MM-DD, times are 24-hour HH:MM. Resolve weekday names ("Tuesday") against today's date.
- If the patient gives a vague date like "next week" or "sometime soon", copy their words into the date field unchanged.
- Use null for any field the patient has not given. Never invent names, phone numbers or appointment ids.
- Use "book" as soon as the patient wants a specific slot, even if some fields are still null."#,
        weekday = weekday_full_name(ctx.today.weekday()),
        today = ctx.today.format("%Y-%m-%d"),
    )
}

/// Plain prose from the model is passed on as a clarifying question. JSON that
/// doesn't fit a command is never shown to the patient.
fn parse_command_response(response: &str) -> BookingCommand {
    if let Some(command) = extract_json::<BookingCommand>(response) {
        return command;
    }

    let looks_structured = matches!(
        extract_json::<serde_json::Value>(response),
        Some(serde_json::Value::Object(_))
    ) || response.contains("\"action\"");
    if looks_structured {
        tracing::warn!(response, "model returned a malformed booking command");
        return BookingCommand::Clarify {
            message: CLARIFY_PROMPT.to_string(),
        };
    }

    tracing::warn!("could not parse booking command from model reply");
    BookingCommand::Clarify {
        message: response.trim().to_string(),
    }
}
