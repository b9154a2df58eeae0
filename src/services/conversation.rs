use chrono::NaiveDate;

use crate::models::{BookingKind, ConversationSession, ConversationState};
use crate::services::booking::BookingStore;

pub const GREETING: &str = "Hello! I'm your booking assistant. Do you want us to call you \
                            or would you like to book an appointment?";

const CONFIRM_WORDS: [&str; 3] = ["yes", "y", "confirm"];
const DECLINE_WORDS: [&str; 2] = ["no", "n"];

/// The engine's answer to one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub reply: String,
    /// Set only when a booking was saved and the session went back to `Start`.
    pub completed: bool,
}

impl Turn {
    fn reply(text: impl Into<String>) -> Self {
        Self {
            reply: text.into(),
            completed: false,
        }
    }

    fn completed(text: impl Into<String>) -> Self {
        Self {
            reply: text.into(),
            completed: true,
        }
    }
}

/// Slot-filling dialogue for call requests and appointments.
///
/// The engine holds no per-conversation state: callers own a
/// [`ConversationSession`] and pass it to [`DialogueEngine::advance`] for
/// every utterance.
pub struct DialogueEngine {
    store: BookingStore,
}

impl DialogueEngine {
    pub fn new(store: BookingStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &BookingStore {
        &self.store
    }

    pub fn start_conversation(&self) -> &'static str {
        GREETING
    }

    /// Feed one utterance into the session and produce exactly one reply.
    ///
    /// Invalid answers re-prompt without touching the session. Only a storage
    /// failure while confirming is returned as an error, in which case the
    /// session is left awaiting confirmation.
    pub fn advance(&self, session: &mut ConversationSession, input: &str) -> anyhow::Result<Turn> {
        let text = input.trim();
        let routed = text.to_lowercase();

        tracing::debug!(state = session.state.as_str(), "advancing conversation");

        let turn = match session.state {
            ConversationState::Start => choose_intent(session, &routed),
            ConversationState::AwaitingName => {
                if text.is_empty() {
                    Turn::reply("Please tell me your full name.")
                } else {
                    session.fields.name = Some(text.to_string());
                    session.state = ConversationState::AwaitingPhone;
                    Turn::reply("What's your phone number?")
                }
            }
            ConversationState::AwaitingPhone => {
                if self.store.validate_phone(text) {
                    session.fields.phone = Some(text.to_string());
                    session.state = ConversationState::AwaitingEmail;
                    Turn::reply("What's your email address?")
                } else {
                    Turn::reply(
                        "Invalid phone number. Please enter a valid phone number (7-15 digits).",
                    )
                }
            }
            ConversationState::AwaitingEmail => {
                if self.store.validate_email(text) {
                    session.fields.email = Some(text.to_string());
                    session.state = ConversationState::AwaitingDate;
                    Turn::reply(date_prompt(kind_of(session)))
                } else {
                    Turn::reply("Invalid email format. Please enter a valid email address.")
                }
            }
            ConversationState::AwaitingDate => match self.store.validate_date(text) {
                Ok(date) => {
                    session.fields.date = Some(date);
                    session.state = ConversationState::AwaitingConfirmation;
                    Turn::reply(confirmation_summary(session, date))
                }
                Err(rejection) => Turn::reply(rejection.to_string()),
            },
            ConversationState::AwaitingConfirmation => self.confirm(session, &routed)?,
        };

        Ok(turn)
    }

    fn confirm(&self, session: &mut ConversationSession, routed: &str) -> anyhow::Result<Turn> {
        if DECLINE_WORDS.contains(&routed) {
            session.fields.date = None;
            session.state = ConversationState::AwaitingDate;
            return Ok(Turn::reply(format!(
                "Okay, let's try again. {}",
                date_prompt(kind_of(session))
            )));
        }

        if !CONFIRM_WORDS.contains(&routed) {
            return Ok(Turn::reply("Please answer with 'yes' or 'no'."));
        }

        let Some(booking) = session.pending_booking() else {
            tracing::warn!("confirmation reached with missing fields, resetting session");
            session.reset();
            return Ok(Turn::reply(
                "I'm sorry, something went wrong. Could you start over?",
            ));
        };

        self.store.insert(&booking)?;

        let reply = format!(
            "All set! Your {} is confirmed for {}.\n\
             We'll contact you at {} or {} if needed. Thank you!",
            booking.kind.label(),
            long_date(booking.date),
            booking.phone,
            booking.email,
        );
        session.reset();
        Ok(Turn::completed(reply))
    }
}

fn choose_intent(session: &mut ConversationSession, routed: &str) -> Turn {
    // "call" is checked first, so "call me about my appointment" is a call request.
    let kind = if routed.contains("call") {
        BookingKind::CallRequest
    } else if routed.contains("book") || routed.contains("appointment") {
        BookingKind::Appointment
    } else {
        return Turn::reply(
            "I'm not sure what you'd like to do. Please specify if you want us to \
             'call you' or if you want to 'book an appointment'.",
        );
    };

    session.intent = Some(kind);
    session.state = ConversationState::AwaitingName;
    match kind {
        BookingKind::CallRequest => Turn::reply(
            "Great! Let me get some details for your call request. What's your full name?",
        ),
        BookingKind::Appointment => {
            Turn::reply("Great! Let's schedule your appointment. What's your full name?")
        }
    }
}

fn kind_of(session: &ConversationSession) -> BookingKind {
    session.intent.unwrap_or(BookingKind::Appointment)
}

fn date_prompt(kind: BookingKind) -> &'static str {
    match kind {
        BookingKind::CallRequest => {
            "When would you like us to call you? (e.g., 'tomorrow', 'next Friday')"
        }
        BookingKind::Appointment => {
            "When would you like us to schedule your appointment? (e.g., 'tomorrow', 'next Friday')"
        }
    }
}

fn confirmation_summary(session: &ConversationSession, date: NaiveDate) -> String {
    let fields = &session.fields;
    format!(
        "Just to confirm:\n\
         Name: {}\n\
         Phone: {}\n\
         Email: {}\n\
         Date: {}\n\n\
         Should I book this {}? (yes/no)",
        fields.name.as_deref().unwrap_or_default(),
        fields.phone.as_deref().unwrap_or_default(),
        fields.email.as_deref().unwrap_or_default(),
        long_date(date),
        kind_of(session).label(),
    )
}

fn long_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}
