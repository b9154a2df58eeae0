use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingKind {
    CallRequest,
    Appointment,
}

impl BookingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingKind::CallRequest => "call_request",
            BookingKind::Appointment => "appointment",
        }
    }

    /// Word used when talking to the customer about this kind of booking.
    pub fn label(&self) -> &'static str {
        match self {
            BookingKind::CallRequest => "call",
            BookingKind::Appointment => "appointment",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            BookingKind::CallRequest => "call_requests",
            BookingKind::Appointment => "appointments",
        }
    }

    pub fn date_column(&self) -> &'static str {
        match self {
            BookingKind::CallRequest => "call_date",
            BookingKind::Appointment => "appointment_date",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: i64,
    pub kind: BookingKind,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub date: NaiveDate,
    pub created_at: NaiveDateTime,
}

/// Fields of a booking that has passed validation but is not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub kind: BookingKind,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub date: NaiveDate,
}
