use anyhow::Context;
use rusqlite::Connection;

const TABLES: &[(&str, &str)] = &[
    (
        "call_requests",
        "CREATE TABLE IF NOT EXISTS call_requests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            phone TEXT NOT NULL,
            email TEXT NOT NULL,
            call_date TEXT NOT NULL,
            timestamp TEXT NOT NULL
        );",
    ),
    (
        "appointments",
        "CREATE TABLE IF NOT EXISTS appointments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            phone TEXT NOT NULL,
            email TEXT NOT NULL,
            appointment_date TEXT NOT NULL,
            timestamp TEXT NOT NULL
        );",
    ),
];

pub fn ensure_schema(conn: &Connection) -> anyhow::Result<()> {
    for (name, sql) in TABLES {
        conn.execute_batch(sql)
            .with_context(|| format!("failed to create table: {name}"))?;
        tracing::debug!("table ready: {name}");
    }
    Ok(())
}
