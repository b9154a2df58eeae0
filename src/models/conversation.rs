use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::booking::{BookingKind, NewBooking};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Start,
    AwaitingName,
    AwaitingPhone,
    AwaitingEmail,
    AwaitingDate,
    AwaitingConfirmation,
}

impl ConversationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::Start => "start",
            ConversationState::AwaitingName => "awaiting_name",
            ConversationState::AwaitingPhone => "awaiting_phone",
            ConversationState::AwaitingEmail => "awaiting_email",
            ConversationState::AwaitingDate => "awaiting_date",
            ConversationState::AwaitingConfirmation => "awaiting_confirmation",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CollectedFields {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub date: Option<NaiveDate>,
}

impl CollectedFields {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.email.is_none() && self.date.is_none()
    }
}

/// One booking conversation. Owned by whoever drives the dialogue loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationSession {
    pub state: ConversationState,
    pub intent: Option<BookingKind>,
    pub fields: CollectedFields,
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationSession {
    pub fn new() -> Self {
        Self {
            state: ConversationState::Start,
            intent: None,
            fields: CollectedFields::default(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// The complete booking, if every slot has been filled.
    pub fn pending_booking(&self) -> Option<NewBooking> {
        Some(NewBooking {
            kind: self.intent?,
            name: self.fields.name.clone()?,
            phone: self.fields.phone.clone()?,
            email: self.fields.email.clone()?,
            date: self.fields.date?,
        })
    }
}
