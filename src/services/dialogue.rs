//! Sticky routing across turns.
//!
//! A clear label moves the session into that flow. An unclear label stays in
//! whatever flow the session is already in; with no flow yet the turn is
//! rejected. Nothing here mutates the session: the caller commits
//! `RouteDecision::next_state` once the downstream capability has answered.

use crate::models::session::format_history;
use crate::models::{Label, Route, RouteDecision, RouteState, Session};

/// Prior messages handed to the FAQ answerer on an unclear follow-up.
pub const DEFAULT_HISTORY_TURNS: usize = 5;

pub fn resolve(session: &Session, label: Label, history_turns: usize) -> RouteDecision {
    match label {
        Label::Faq => RouteDecision {
            route: Route::Faq,
            next_state: RouteState::InFaqFlow,
            chat_history: None,
        },
        Label::Appointment => RouteDecision {
            route: Route::Appointment,
            next_state: RouteState::InAppointmentFlow,
            chat_history: None,
        },
        Label::Unclear => match session.state {
            RouteState::InAppointmentFlow => RouteDecision {
                route: Route::Appointment,
                next_state: RouteState::InAppointmentFlow,
                chat_history: None,
            },
            RouteState::InFaqFlow => RouteDecision {
                route: Route::Faq,
                next_state: RouteState::InFaqFlow,
                chat_history: Some(format_history(&session.recent(history_turns))),
            },
            RouteState::NoContext => RouteDecision {
                route: Route::Reject,
                next_state: RouteState::NoContext,
                chat_history: None,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use proptest::test_runner::Config as ProptestConfig;

    use super::*;

    fn arb_state() -> impl Strategy<Value = RouteState> {
        prop_oneof![
            Just(RouteState::NoContext),
            Just(RouteState::InFaqFlow),
            Just(RouteState::InAppointmentFlow),
        ]
    }

    fn arb_label() -> impl Strategy<Value = Label> {
        prop_oneof![Just(Label::Faq), Just(Label::Appointment), Just(Label::Unclear)]
    }

    fn session_in(state: RouteState, turns: &[(String, String)]) -> Session {
        let mut session = Session::new("prop", 20);
        for (q, a) in turns {
            session.commit(
                &RouteDecision {
                    route: Route::Faq,
                    next_state: state,
                    chat_history: None,
                },
                q,
                a,
            );
        }
        session.state = state;
        session
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            failure_persistence: None,
            ..ProptestConfig::default()
        })]

        #[test]
        fn unclear_in_appointment_flow_stays_appointment(
            turns in prop::collection::vec(("[a-z ]{0,12}", "[a-z ]{0,12}"), 0..8),
        ) {
            let session = session_in(RouteState::InAppointmentFlow, &turns);
            let decision = resolve(&session, Label::Unclear, DEFAULT_HISTORY_TURNS);
            prop_assert_eq!(decision.route, Route::Appointment);
            prop_assert_eq!(decision.next_state, RouteState::InAppointmentFlow);
        }

        #[test]
        fn unclear_without_context_rejects_and_keeps_state(
            turns in prop::collection::vec(("[a-z ]{0,12}", "[a-z ]{0,12}"), 0..8),
        ) {
            let session = session_in(RouteState::NoContext, &turns);
            let decision = resolve(&session, Label::Unclear, DEFAULT_HISTORY_TURNS);
            prop_assert_eq!(decision.route, Route::Reject);
            prop_assert_eq!(decision.next_state, RouteState::NoContext);
            prop_assert_eq!(session.state, RouteState::NoContext);
        }

        #[test]
        fn clear_labels_win_over_any_state(state in arb_state(), label in arb_label()) {
            let session = session_in(state, &[]);
            let decision = resolve(&session, label, DEFAULT_HISTORY_TURNS);
            match label {
                Label::Faq => prop_assert_eq!(decision.next_state, RouteState::InFaqFlow),
                Label::Appointment => prop_assert_eq!(decision.next_state, RouteState::InAppointmentFlow),
                Label::Unclear => prop_assert_eq!(decision.next_state, state),
            }
        }

        #[test]
        fn never_returns_to_no_context_once_in_a_flow(
            labels in prop::collection::vec(arb_label(), 1..20),
        ) {
            let mut session = Session::new("walk", 20);
            let mut entered = false;
            for label in labels {
                let decision = resolve(&session, label, DEFAULT_HISTORY_TURNS);
                session.commit(&decision, "q", "a");
                entered |= session.state != RouteState::NoContext;
                if entered {
                    prop_assert_ne!(session.state, RouteState::NoContext);
                }
            }
        }
    }

    #[test]
    fn test_unclear_in_faq_flow_carries_last_five_messages() {
        let mut session = Session::new("s1", 20);
        let faq = RouteDecision {
            route: Route::Faq,
            next_state: RouteState::InFaqFlow,
            chat_history: None,
        };
        session.commit(&faq, "what are visiting hours?", "9am to 8pm");
        session.commit(&faq, "is parking free?", "yes, for patients");
        session.commit(&faq, "do you accept insurance?", "most major providers");

        let decision = resolve(&session, Label::Unclear, DEFAULT_HISTORY_TURNS);
        assert_eq!(decision.route, Route::Faq);
        let history = decision.chat_history.unwrap();
        let lines: Vec<&str> = history.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "assistant: 9am to 8pm");
        assert_eq!(lines[4], "assistant: most major providers");
    }

    #[test]
    fn test_clear_faq_carries_no_history() {
        let session = Session::new("s1", 20);
        assert_eq!(resolve(&session, Label::Faq, 5).chat_history, None);
    }

    #[test]
    fn test_unclear_in_faq_flow_with_empty_window() {
        let mut session = Session::new("s1", 20);
        session.state = RouteState::InFaqFlow;
        let decision = resolve(&session, Label::Unclear, 5);
        assert_eq!(decision.chat_history.as_deref(), Some(""));
    }
}
