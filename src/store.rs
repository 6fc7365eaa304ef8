//! SQLite-backed job and result store.
//!
//! The database lives at `~/.commuteplan/jobs.db` and holds only what is
//! needed to round-trip a plan: job rows (status, progress, result), ranked
//! recommendations per job, and the calendar-events cache queried by
//! `(user_id, target_date)`.

use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use thiserror::Error;

use crate::normalize;
use crate::types::{CalendarEvent, JobStatus, Recommendation};

/// Errors specific to store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A row from the `jobs` table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: String,
    pub user_id: String,
    pub target_date: String,
    pub status: String,
    pub progress: f64,
    pub current_step: Option<String>,
    pub result: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// SQLite connection wrapper for job state.
///
/// Intentionally NOT `Clone` or `Sync`; the dispatcher holds it behind a
/// `parking_lot::Mutex` and never keeps the guard across an await point.
pub struct JobStore {
    conn: Connection,
}

impl JobStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open_at(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(StoreError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;

        // WAL mode for concurrent reads while a job is being written
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(include_str!("schema.sql"))?;

        Ok(Self { conn })
    }

    /// Open the store at the default location (`~/.commuteplan/jobs.db`).
    pub fn open_default() -> Result<Self, StoreError> {
        let home = dirs::home_dir().ok_or(StoreError::HomeDirNotFound)?;
        Self::open_at(home.join(".commuteplan").join("jobs.db"))
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Insert a job row in QUEUED state, or leave an existing row untouched
    /// (re-submitted jobs keep their original created_at).
    pub fn create_job(
        &self,
        job_id: &str,
        user_id: &str,
        target_date: &str,
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR IGNORE INTO jobs (id, user_id, target_date, status, progress, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0.0, ?5, ?5)",
            params![job_id, user_id, target_date, JobStatus::Queued.as_str(), now],
        )?;
        Ok(())
    }

    /// Write a status transition, optionally with a result payload or error.
    pub fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        progress: f64,
        current_step: Option<&str>,
        result: Option<&serde_json::Value>,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let result_text = match result {
            Some(value) => Some(serde_json::to_string(value)?),
            None => None,
        };
        self.conn.execute(
            "UPDATE jobs SET status = ?2, progress = ?3,
                 current_step = COALESCE(?4, current_step),
                 result = COALESCE(?5, result),
                 error_message = COALESCE(?6, error_message),
                 updated_at = ?7
             WHERE id = ?1",
            params![job_id, status.as_str(), progress, current_step, result_text, error_message, now],
        )?;
        Ok(())
    }

    /// Mirror in-flight pipeline progress onto the job row.
    pub fn update_progress(
        &self,
        job_id: &str,
        progress: f64,
        current_step: &str,
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE jobs SET progress = ?2, current_step = ?3, updated_at = ?4 WHERE id = ?1",
            params![job_id, progress, current_step, now],
        )?;
        Ok(())
    }

    pub fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        let record = self
            .conn
            .query_row(
                "SELECT id, user_id, target_date, status, progress, current_step,
                        result, error_message, created_at, updated_at
                 FROM jobs WHERE id = ?1",
                params![job_id],
                |row| {
                    Ok(JobRecord {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        target_date: row.get(2)?,
                        status: row.get(3)?,
                        progress: row.get(4)?,
                        current_step: row.get(5)?,
                        result: row.get(6)?,
                        error_message: row.get(7)?,
                        created_at: row.get(8)?,
                        updated_at: row.get(9)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Replace the stored recommendations for a job with a freshly ranked set.
    pub fn save_recommendations(
        &self,
        job_id: &str,
        recommendations: &[Recommendation],
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute("DELETE FROM recommendations WHERE job_id = ?1", params![job_id])?;
        for rec in recommendations {
            let payload = serde_json::to_string(rec)?;
            self.conn.execute(
                "INSERT INTO recommendations (id, job_id, option_rank, payload, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    job_id,
                    rec.option_rank,
                    payload,
                    now
                ],
            )?;
        }
        Ok(())
    }

    /// Stored recommendations for a job, in rank order.
    pub fn get_recommendations(&self, job_id: &str) -> Result<Vec<serde_json::Value>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT payload FROM recommendations WHERE job_id = ?1 ORDER BY option_rank ASC",
        )?;
        let rows = stmt.query_map(params![job_id], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            let payload = row?;
            match serde_json::from_str(&payload) {
                Ok(value) => out.push(value),
                Err(e) => log::warn!("Skipping unreadable recommendation row: {}", e),
            }
        }
        Ok(out)
    }

    /// Cache a calendar event for a `(user_id, target_date)` query.
    pub fn insert_calendar_event(
        &self,
        user_id: &str,
        target_date: NaiveDate,
        event: &CalendarEvent,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(event)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO calendar_events (id, user_id, target_date, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![event.id, user_id, target_date.to_string(), payload],
        )?;
        Ok(())
    }

    /// Calendar events for a user and date, normalized. Unreadable rows are
    /// skipped with a warning, never failing the query.
    pub fn get_calendar_events(
        &self,
        user_id: &str,
        target_date: NaiveDate,
    ) -> Result<Vec<CalendarEvent>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT payload FROM calendar_events
             WHERE user_id = ?1 AND target_date = ?2
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![user_id, target_date.to_string()], |row| {
            row.get::<_, String>(0)
        })?;
        let mut events = Vec::new();
        for row in rows {
            let payload = row?;
            match serde_json::from_str::<serde_json::Value>(&payload) {
                Ok(value) => events.push(normalize::normalize_event(&value)),
                Err(e) => log::warn!("Skipping unreadable calendar event row: {}", e),
            }
        }
        // Stable chronological order for the pipeline
        events.sort_by_key(|e| e.start_time);
        Ok(events)
    }
}
