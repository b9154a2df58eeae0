use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Row};

use crate::models::{BookingKind, BookingRecord, NewBooking};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── Bookings ──

pub fn insert_booking(
    conn: &Connection,
    booking: &NewBooking,
    created_at: &NaiveDateTime,
) -> anyhow::Result<i64> {
    let date = booking.date.format(DATE_FORMAT).to_string();
    let timestamp = created_at.format(TIMESTAMP_FORMAT).to_string();

    let sql = format!(
        "INSERT INTO {} (name, phone, email, {}, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
        booking.kind.table(),
        booking.kind.date_column(),
    );
    conn.execute(
        &sql,
        params![booking.name, booking.phone, booking.email, date, timestamp],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn recent_bookings(
    conn: &Connection,
    kind: BookingKind,
    limit: u32,
) -> anyhow::Result<Vec<BookingRecord>> {
    let sql = format!(
        "SELECT id, name, phone, email, {}, timestamp FROM {} ORDER BY id DESC LIMIT ?1",
        kind.date_column(),
        kind.table(),
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt.query_map(params![limit], |row| Ok(parse_booking_row(kind, row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn count_bookings(conn: &Connection, kind: BookingKind) -> anyhow::Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(count)
}

fn parse_booking_row(kind: BookingKind, row: &Row) -> anyhow::Result<BookingRecord> {
    let date_str: String = row.get(4)?;
    let timestamp_str: String = row.get(5)?;

    Ok(BookingRecord {
        id: row.get(0)?,
        kind,
        name: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        date: NaiveDate::parse_from_str(&date_str, DATE_FORMAT)?,
        created_at: NaiveDateTime::parse_from_str(&timestamp_str, TIMESTAMP_FORMAT)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn booking(kind: BookingKind, name: &str) -> NewBooking {
        NewBooking {
            kind,
            name: name.to_string(),
            phone: "555-123-4567".to_string(),
            email: "someone@example.com".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
        }
    }

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    #[test]
    fn test_insert_routes_by_kind() {
        let conn = setup_db();
        let created = ts("2026-10-16 09:30:00");

        insert_booking(&conn, &booking(BookingKind::CallRequest, "Ada"), &created).unwrap();
        insert_booking(&conn, &booking(BookingKind::Appointment, "Grace"), &created).unwrap();
        insert_booking(&conn, &booking(BookingKind::Appointment, "Linus"), &created).unwrap();

        assert_eq!(count_bookings(&conn, BookingKind::CallRequest).unwrap(), 1);
        assert_eq!(count_bookings(&conn, BookingKind::Appointment).unwrap(), 2);
    }

    #[test]
    fn test_stored_columns_use_text_formats() {
        let conn = setup_db();
        let id = insert_booking(
            &conn,
            &booking(BookingKind::CallRequest, "Ada"),
            &ts("2026-10-16 09:30:05"),
        )
        .unwrap();

        let (date, timestamp): (String, String) = conn
            .query_row(
                "SELECT call_date, timestamp FROM call_requests WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(date, "2026-11-03");
        assert_eq!(timestamp, "2026-10-16 09:30:05");
    }

    #[test]
    fn test_recent_bookings_newest_first() {
        let conn = setup_db();
        let created = ts("2026-10-16 09:30:00");
        for name in ["first", "second", "third"] {
            insert_booking(&conn, &booking(BookingKind::Appointment, name), &created).unwrap();
        }

        let recent = recent_bookings(&conn, BookingKind::Appointment, 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].name, "third");
        assert_eq!(recent[1].name, "second");
        assert_eq!(recent[0].kind, BookingKind::Appointment);
        assert_eq!(recent[0].created_at, created);
    }

    #[test]
    fn test_recent_bookings_empty_table() {
        let conn = setup_db();
        let recent = recent_bookings(&conn, BookingKind::CallRequest, 10).unwrap();
        assert!(recent.is_empty());
    }
}
