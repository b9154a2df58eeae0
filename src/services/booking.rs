use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use anyhow::anyhow;
use chrono::{Local, NaiveDate};
use regex::Regex;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{BookingKind, BookingRecord, NewBooking};
use crate::services::dates::DateInterpreter;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

/// Why a date answer was not accepted. The message is shown to the customer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateRejection {
    #[error("I couldn't understand that date. Please try something like 'tomorrow' or 'next Friday'.")]
    Unrecognized,

    #[error("Date must be in the future. Please try again.")]
    InPast,
}

/// Field validation and append-only persistence of finished bookings.
#[derive(Clone)]
pub struct BookingStore {
    db: Arc<Mutex<Connection>>,
    dates: DateInterpreter,
}

impl BookingStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self::with_interpreter(db, DateInterpreter::new())
    }

    pub fn with_interpreter(db: Arc<Mutex<Connection>>, dates: DateInterpreter) -> Self {
        Self { db, dates }
    }

    pub fn dates(&self) -> &DateInterpreter {
        &self.dates
    }

    pub fn validate_phone(&self, raw: &str) -> bool {
        let digits = raw.chars().filter(|c| c.is_ascii_digit()).count();
        (7..=15).contains(&digits)
    }

    pub fn validate_email(&self, raw: &str) -> bool {
        EMAIL_RE.is_match(raw)
    }

    pub fn validate_date(&self, raw: &str) -> Result<NaiveDate, DateRejection> {
        let date = self.dates.resolve(raw).ok_or(DateRejection::Unrecognized)?;

        if date < self.dates.today() {
            return Err(DateRejection::InPast);
        }
        Ok(date)
    }

    /// Insert a booking into the table for its kind. Callers validate first.
    pub fn save(
        &self,
        kind: BookingKind,
        name: &str,
        phone: &str,
        email: &str,
        date: NaiveDate,
    ) -> anyhow::Result<i64> {
        let booking = NewBooking {
            kind,
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
            date,
        };
        self.insert(&booking)
    }

    pub fn insert(&self, booking: &NewBooking) -> anyhow::Result<i64> {
        let created_at = Local::now().naive_local();
        let id = {
            let db = self.lock()?;
            queries::insert_booking(&db, booking, &created_at)?
        };

        tracing::info!(
            kind = booking.kind.as_str(),
            id,
            date = %booking.date,
            "saved booking"
        );
        Ok(id)
    }

    pub fn recent(&self, kind: BookingKind, limit: u32) -> anyhow::Result<Vec<BookingRecord>> {
        let db = self.lock()?;
        queries::recent_bookings(&db, kind, limit)
    }

    pub fn count(&self, kind: BookingKind) -> anyhow::Result<i64> {
        let db = self.lock()?;
        queries::count_bookings(&db, kind)
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| anyhow!("database connection lock poisoned"))
    }
}
