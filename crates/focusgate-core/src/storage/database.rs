//! SQLite-based session storage and statistics.
//!
//! Provides persistent storage for:
//! - Completed focus sessions, per owner
//! - Session statistics (today, last 7 days, all-time)
//! - Key-value store for the saved timer and entitlement state

use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use super::data_dir;
use super::session::{FocusSession, RecordId, SessionFeed, SessionStats, SessionStore};
use crate::error::{Result, StorageError};
use crate::timer::TimerMode;

const FEED_CAPACITY: usize = 64;

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
    feed: broadcast::Sender<FocusSession>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("subscribers", &self.feed.receiver_count())
            .finish_non_exhaustive()
    }
}

/// Fixed-width UTC timestamps so that string order is time order.
fn encode_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl Database {
    /// Open the database at `<data_dir>/focusgate.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("focusgate.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        let db = Self { conn, feed };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id      TEXT NOT NULL,
                mode          TEXT NOT NULL,
                duration_secs INTEGER NOT NULL,
                focus_score   INTEGER NOT NULL,
                completed_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_owner_completed_at
                ON sessions(owner_id, completed_at);",
        )?;
        Ok(())
    }

    /// Sessions for `owner_id` completed on the given UTC day, oldest first.
    pub fn sessions_on(
        &self,
        owner_id: &str,
        day: NaiveDate,
    ) -> Result<Vec<FocusSession>, StorageError> {
        let from = day_start(day);
        let to = from + Duration::days(1);
        let mut stmt = self.conn.prepare(
            "SELECT owner_id, mode, duration_secs, focus_score, completed_at
             FROM sessions
             WHERE owner_id = ?1 AND completed_at >= ?2 AND completed_at < ?3
             ORDER BY completed_at, id",
        )?;
        let rows = stmt.query_map(params![owner_id, encode_ts(from), encode_ts(to)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u8>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (owner_id, mode, duration_secs, focus_score, completed_at) = row?;
            let mode = mode
                .parse::<TimerMode>()
                .map_err(|message| StorageError::Corrupt {
                    key: "sessions.mode".into(),
                    message,
                })?;
            let completed_at = DateTime::parse_from_rfc3339(&completed_at)
                .map_err(|e| StorageError::Corrupt {
                    key: "sessions.completed_at".into(),
                    message: e.to_string(),
                })?
                .with_timezone(&Utc);
            sessions.push(FocusSession {
                owner_id,
                mode,
                duration_secs,
                focus_score,
                completed_at,
            });
        }
        Ok(sessions)
    }

    fn stats_where(
        &self,
        owner_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<SessionStats, StorageError> {
        let from = from.map(encode_ts).unwrap_or_default();
        let to = to.map(encode_ts).unwrap_or_else(|| "9999".into());
        let stats = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_secs), 0), AVG(focus_score)
             FROM sessions
             WHERE owner_id = ?1 AND completed_at >= ?2 AND completed_at < ?3",
            params![owner_id, from, to],
            |row| {
                Ok(SessionStats {
                    total_sessions: row.get(0)?,
                    total_focus_secs: row.get(1)?,
                    avg_focus_score: row.get(2)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// Stats for the UTC day containing `now`.
    pub fn stats_today(&self, owner_id: &str, now: DateTime<Utc>) -> Result<SessionStats, StorageError> {
        let from = day_start(now.date_naive());
        self.stats_where(owner_id, Some(from), Some(from + Duration::days(1)))
    }

    /// Stats for the seven days up to and including `now`.
    pub fn stats_week(&self, owner_id: &str, now: DateTime<Utc>) -> Result<SessionStats, StorageError> {
        let to = now + Duration::milliseconds(1);
        self.stats_where(owner_id, Some(now - Duration::days(7)), Some(to))
    }

    pub fn stats_all(&self, owner_id: &str) -> Result<SessionStats, StorageError> {
        self.stats_where(owner_id, None, None)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Decode a JSON value from the kv store.
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.kv_get(key)? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| StorageError::Corrupt {
                    key: key.into(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Encode a value as JSON into the kv store.
    pub fn save_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value).map_err(|e| StorageError::Corrupt {
            key: key.into(),
            message: e.to_string(),
        })?;
        self.kv_set(key, &json)
    }
}

impl SessionStore for Database {
    fn append_focus_session(&self, record: &FocusSession) -> Result<RecordId, StorageError> {
        self.conn.execute(
            "INSERT INTO sessions (owner_id, mode, duration_secs, focus_score, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.owner_id,
                record.mode.as_str(),
                record.duration_secs,
                record.focus_score,
                encode_ts(record.completed_at),
            ],
        )?;
        let id = RecordId(self.conn.last_insert_rowid());
        debug!(id = id.0, owner = %record.owner_id, "focus session stored");
        // No subscribers is fine.
        let _ = self.feed.send(record.clone());
        Ok(id)
    }

    fn subscribe_today(
        &self,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionFeed, StorageError> {
        let live = self.feed.subscribe();
        let day = now.date_naive();
        let backlog = self.sessions_on(owner_id, day)?;
        Ok(SessionFeed::new(owner_id, day, backlog, live))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    fn session(owner: &str, score: u8, at: DateTime<Utc>) -> FocusSession {
        FocusSession {
            owner_id: owner.into(),
            mode: TimerMode::Work,
            duration_secs: 1500,
            focus_score: score,
            completed_at: at,
        }
    }

    #[test]
    fn record_and_query() {
        let db = Database::open_memory().unwrap();
        let first = db.append_focus_session(&session("ada", 80, t(9, 0))).unwrap();
        let second = db.append_focus_session(&session("ada", 90, t(10, 0))).unwrap();
        assert_ne!(first, second);

        let stats = db.stats_today("ada", t(12, 0)).unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_focus_secs, 3000);
        assert_eq!(stats.avg_focus_score, Some(85.0));
    }

    #[test]
    fn stats_are_per_owner_and_per_day() {
        let db = Database::open_memory().unwrap();
        db.append_focus_session(&session("ada", 80, t(9, 0))).unwrap();
        db.append_focus_session(&session("bob", 70, t(9, 0))).unwrap();
        db.append_focus_session(&session("ada", 60, t(9, 0) - Duration::days(2)))
            .unwrap();
        db.append_focus_session(&session("ada", 60, t(9, 0) - Duration::days(10)))
            .unwrap();

        assert_eq!(db.stats_today("ada", t(12, 0)).unwrap().total_sessions, 1);
        assert_eq!(db.stats_week("ada", t(12, 0)).unwrap().total_sessions, 2);
        assert_eq!(db.stats_all("ada").unwrap().total_sessions, 3);
        assert_eq!(db.stats_all("bob").unwrap().total_sessions, 1);
    }

    #[test]
    fn empty_stats_have_no_average() {
        let db = Database::open_memory().unwrap();
        let stats = db.stats_all("nobody").unwrap();
        assert_eq!(stats, SessionStats::default());
    }

    #[test]
    fn sessions_on_round_trips_records() {
        let db = Database::open_memory().unwrap();
        let record = session("ada", 77, t(23, 59));
        db.append_focus_session(&record).unwrap();
        let day = db.sessions_on("ada", t(0, 0).date_naive()).unwrap();
        assert_eq!(day, vec![record]);
        assert!(db
            .sessions_on("ada", (t(0, 0) + Duration::days(1)).date_naive())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn subscribe_today_sees_backlog_and_new_appends() {
        let db = Database::open_memory().unwrap();
        db.append_focus_session(&session("ada", 80, t(9, 0))).unwrap();

        let mut feed = db.subscribe_today("ada", t(12, 0)).unwrap();
        db.append_focus_session(&session("ada", 95, t(12, 30))).unwrap();

        assert_eq!(feed.try_next().unwrap().focus_score, 80);
        assert_eq!(feed.try_next().unwrap().focus_score, 95);
        assert!(feed.try_next().is_none());
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }

    #[test]
    fn corrupt_json_is_reported() {
        let db = Database::open_memory().unwrap();
        db.kv_set("timer_state", "{not json").unwrap();
        let err = db.load_json::<crate::timer::TimerState>("timer_state").unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[test]
    fn file_database_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focusgate.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.append_focus_session(&session("ada", 80, t(9, 0))).unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.stats_all("ada").unwrap().total_sessions, 1);
    }
}
