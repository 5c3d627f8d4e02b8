use async_trait::async_trait;

use super::intent::IntentClassifier;
use crate::models::Label;

const APPOINTMENT_TERMS: &[&str] = &[
    "appointment",
    "appointments",
    "book",
    "booking",
    "schedule",
    "reschedule",
    "cancel",
    "doctor",
    "doctors",
    "specialist",
    "available",
    "availability",
    "slot",
    "consult",
    "consultation",
    "see a",
    "pain",
    "ache",
    "fracture",
    "rash",
    "fever",
    "symptom",
    "symptoms",
    "hurts",
    "injury",
    "cardiologist",
    "dermatologist",
    "orthopedic",
    "pediatrician",
    "neurologist",
];

const FAQ_TERMS: &[&str] = &[
    "visiting hours",
    "visiting",
    "hours",
    "admission",
    "documents",
    "insurance",
    "cashless",
    "billing",
    "bill",
    "payment",
    "fees",
    "cost",
    "price",
    "parking",
    "canteen",
    "pharmacy",
    "facilities",
    "policy",
    "policies",
    "discharge",
    "ambulance",
    "located",
    "address",
    "wifi",
];

/// Offline classifier: counts routing terms on word boundaries. Ties and
/// messages with no routing term are `Unclear`.
#[derive(Default)]
pub struct KeywordClassifier;

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, utterance: &str) -> anyhow::Result<Label> {
        Ok(classify_text(utterance))
    }
}

pub fn classify_text(text: &str) -> Label {
    let normalized = format!(" {} ", normalize(text));
    let score = |terms: &[&str]| {
        terms
            .iter()
            .filter(|term| normalized.contains(&format!(" {term} ")))
            .count()
    };

    let appointment = score(APPOINTMENT_TERMS);
    let faq = score(FAQ_TERMS);
    match appointment.cmp(&faq) {
        std::cmp::Ordering::Greater => Label::Appointment,
        std::cmp::Ordering::Less => Label::Faq,
        std::cmp::Ordering::Equal => Label::Unclear,
    }
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appointment_phrases() {
        assert_eq!(classify_text("I have chest pain"), Label::Appointment);
        assert_eq!(classify_text("Can I book an appointment with a cardiologist?"), Label::Appointment);
        assert_eq!(classify_text("please cancel my booking"), Label::Appointment);
    }

    #[test]
    fn test_faq_phrases() {
        assert_eq!(classify_text("What are the visiting hours?"), Label::Faq);
        assert_eq!(classify_text("Which documents are required for admission?"), Label::Faq);
    }

    #[test]
    fn test_follow_ups_are_unclear() {
        for text in ["yes", "10am", "confirm", "what about for children", "", "John Doe, 555-1234"] {
            assert_eq!(classify_text(text), Label::Unclear, "{text}");
        }
    }

    #[test]
    fn test_matches_whole_words_only() {
        // "painting" must not count as "pain"
        assert_eq!(classify_text("painting classes"), Label::Unclear);
    }
}
