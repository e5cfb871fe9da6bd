// 🗄️ Record Store Adapter - SQLite-backed document store keyed by username
//
// Each record is stored whole as JSON (the document), plus an append-only
// event table for the audit trail: every create/update leaves an event.

use crate::profile::StoredRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Persistence seam for stored records
pub trait RecordStore: Send + Sync {
    fn get(&self, username: &str) -> Result<Option<StoredRecord>>;

    /// Insert or fully replace the record for `username`
    fn put(&self, username: &str, record: &StoredRecord) -> Result<()>;

    /// Every record, in store order (callers sort)
    fn list_all(&self) -> Result<Vec<StoredRecord>>;

    fn append_event(&self, event: &RecordEvent) -> Result<()>;

    /// Events for one username, newest first
    fn events_for(&self, username: &str) -> Result<Vec<RecordEvent>>;
}

// ============================================================================
// RECORD EVENT (audit trail)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub username: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl RecordEvent {
    pub fn new(event_type: &str, username: &str, data: serde_json::Value, actor: &str) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            username: username.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteRecordStore {
            conn: Mutex::new(conn),
        })
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count)
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery (in-memory databases keep "memory")
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS records (
            username TEXT PRIMARY KEY NOT NULL,
            record TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS record_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            username TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_record_events_username ON record_events(username)",
        [],
    )?;

    Ok(())
}

fn decode_record(json: &str) -> Result<StoredRecord> {
    serde_json::from_str(json).context("Failed to decode stored record")
}

impl RecordStore for SqliteRecordStore {
    fn get(&self, username: &str) -> Result<Option<StoredRecord>> {
        let conn = self.conn.lock();
        let json: Option<String> = conn
            .query_row(
                "SELECT record FROM records WHERE username = ?1",
                [username],
                |row| row.get(0),
            )
            .optional()?;

        json.as_deref().map(decode_record).transpose()
    }

    fn put(&self, username: &str, record: &StoredRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO records (username, record, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(username) DO UPDATE SET
                record = excluded.record,
                updated_at = excluded.updated_at",
            params![username, json, Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }

    fn list_all(&self) -> Result<Vec<StoredRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT record FROM records ORDER BY rowid")?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.iter().map(|json| decode_record(json)).collect()
    }

    fn append_event(&self, event: &RecordEvent) -> Result<()> {
        let data_json = serde_json::to_string(&event.data)?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO record_events (
                event_id, timestamp, event_type, username, data, actor
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.event_id,
                event.timestamp.to_rfc3339(),
                event.event_type,
                event.username,
                data_json,
                event.actor,
            ],
        )?;

        Ok(())
    }

    fn events_for(&self, username: &str) -> Result<Vec<RecordEvent>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT event_id, timestamp, event_type, username, data, actor
             FROM record_events
             WHERE username = ?1
             ORDER BY timestamp DESC, id DESC",
        )?;

        let rows = stmt
            .query_map([username], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(event_id, timestamp, event_type, username, data, actor)| {
                Ok(RecordEvent {
                    event_id,
                    timestamp: DateTime::parse_from_rfc3339(&timestamp)
                        .context("Failed to parse event timestamp")?
                        .with_timezone(&Utc),
                    event_type,
                    username,
                    data: serde_json::from_str(&data).context("Failed to decode event data")?,
                    actor,
                })
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
