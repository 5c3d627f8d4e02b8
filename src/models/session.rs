use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BookingRequest;

/// Which flow a session is sticky to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RouteState {
    #[default]
    NoContext,
    InFaqFlow,
    InAppointmentFlow,
}

impl RouteState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteState::NoContext => "no_context",
            RouteState::InFaqFlow => "in_faq_flow",
            RouteState::InAppointmentFlow => "in_appointment_flow",
        }
    }
}

/// Capability chosen for one turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Faq,
    Appointment,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.to_string(),
        }
    }
}

/// Output of the dialogue state machine for one turn. Nothing in here has been
/// applied to the session yet; see [`Session::commit`].
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDecision {
    pub route: Route,
    pub next_state: RouteState,
    /// Prior turns as `role: content` lines, only for unclear turns routed to faq.
    pub chat_history: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub state: RouteState,
    pub messages: VecDeque<ChatMessage>,
    pub pending_booking: BookingRequest,
    pub last_activity: DateTime<Utc>,
    window: usize,
}

impl Session {
    pub fn new(session_id: &str, window: usize) -> Self {
        Self {
            session_id: session_id.to_string(),
            state: RouteState::NoContext,
            messages: VecDeque::new(),
            pending_booking: BookingRequest::default(),
            last_activity: Utc::now(),
            window: window.max(1),
        }
    }

    /// Last `n` messages, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ChatMessage> {
        let skip = self.messages.len().saturating_sub(n);
        self.messages.iter().skip(skip).cloned().collect()
    }

    /// Applies a successful turn: the resolved state plus both sides of the exchange.
    pub fn commit(&mut self, decision: &RouteDecision, user_text: &str, reply: &str) {
        self.state = decision.next_state;
        self.push(ChatMessage::user(user_text));
        self.push(ChatMessage::assistant(reply));
        self.last_activity = Utc::now();
    }

    pub fn reset(&mut self) {
        self.state = RouteState::NoContext;
        self.messages.clear();
        self.pending_booking = BookingRequest::default();
        self.last_activity = Utc::now();
    }

    fn push(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.window {
            self.messages.pop_front();
        }
    }
}

pub fn format_history(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(next_state: RouteState) -> RouteDecision {
        RouteDecision {
            route: Route::Faq,
            next_state,
            chat_history: None,
        }
    }

    #[test]
    fn test_window_is_bounded() {
        let mut session = Session::new("s1", 4);
        for i in 0..5 {
            session.commit(&decision(RouteState::InFaqFlow), &format!("q{i}"), &format!("a{i}"));
        }
        assert_eq!(session.messages.len(), 4);
        assert_eq!(session.messages.front().unwrap().content, "q3");
        assert_eq!(session.messages.back().unwrap().content, "a4");
    }

    #[test]
    fn test_recent_returns_oldest_first() {
        let mut session = Session::new("s1", 20);
        session.commit(&decision(RouteState::InFaqFlow), "hi", "hello");
        session.commit(&decision(RouteState::InFaqFlow), "visiting hours?", "9 to 5");
        let recent = session.recent(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "hello");
        assert_eq!(recent[2].content, "9 to 5");
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = Session::new("s1", 20);
        session.commit(&decision(RouteState::InAppointmentFlow), "book", "which doctor?");
        session.pending_booking.doctor_id = Some(1);
        session.reset();
        assert_eq!(session.state, RouteState::NoContext);
        assert!(session.messages.is_empty());
        assert!(session.pending_booking.is_empty());
    }

    #[test]
    fn test_format_history() {
        let msgs = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
        assert_eq!(format_history(&msgs), "user: hi\nassistant: hello");
    }
}
