use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::Store;
use crate::error::{CoachError, Result};
use crate::types::check_percent;

/// Completion and score state of one student in one program.
///
/// `id` is `None` for the zero default returned when no row exists yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Progress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub student_id: i64,
    pub program_id: i64,
    pub lessons_total: i64,
    pub lessons_done: i64,
    pub avg_score: f64,
    pub last_active: Option<DateTime<Utc>>,
}

impl Progress {
    pub fn empty(student_id: i64, program_id: i64) -> Self {
        Self {
            id: None,
            student_id,
            program_id,
            lessons_total: 0,
            lessons_done: 0,
            avg_score: 0.0,
            last_active: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.lessons_total > 0 && self.lessons_done >= self.lessons_total
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            student_id: row.get("student_id")?,
            program_id: row.get("program_id")?,
            lessons_total: row.get("lessons_total")?,
            lessons_done: row.get("lessons_done")?,
            avg_score: row.get("avg_score")?,
            last_active: row.get("last_active")?,
        })
    }
}

impl Store {
    /// Progress for the pair, or an all-zero default when no row exists.
    pub fn get_progress(&self, student_id: i64, program_id: i64) -> Result<Progress> {
        let row = self
            .conn
            .query_row(
                "SELECT id, student_id, program_id, lessons_total, lessons_done, avg_score,
                        last_active
                 FROM progress WHERE student_id = ?1 AND program_id = ?2",
                params![student_id, program_id],
                Progress::from_row,
            )
            .optional()?;
        Ok(row.unwrap_or_else(|| Progress::empty(student_id, program_id)))
    }

    /// Set counters and average score, creating the row when missing.
    pub fn update_progress(
        &mut self,
        student_id: i64,
        program_id: i64,
        lessons_total: i64,
        lessons_done: i64,
        avg_score: f64,
        now: DateTime<Utc>,
    ) -> Result<Progress> {
        if lessons_total < 0 || lessons_done < 0 {
            return Err(CoachError::InvalidInput(
                "lesson counts must not be negative".into(),
            ));
        }
        if lessons_done > lessons_total {
            return Err(CoachError::InvalidInput(
                "lessons_done cannot exceed lessons_total".into(),
            ));
        }
        let avg_score = check_percent("avg_score", avg_score)?;

        self.conn.execute(
            "INSERT INTO progress (student_id, program_id, lessons_total, lessons_done,
                                   avg_score, last_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?6)
             ON CONFLICT(student_id, program_id) DO UPDATE SET
               lessons_total = excluded.lessons_total,
               lessons_done = excluded.lessons_done,
               avg_score = excluded.avg_score,
               updated_at = excluded.updated_at",
            params![student_id, program_id, lessons_total, lessons_done, avg_score, now],
        )?;
        self.get_progress(student_id, program_id)
    }

    /// Bump `last_active` for an existing row. Returns whether a row was touched.
    pub fn touch_progress(
        &mut self,
        student_id: i64,
        program_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE progress SET last_active = ?1, updated_at = ?1
             WHERE student_id = ?2 AND program_id = ?3",
            params![now, student_id, program_id],
        )?;
        Ok(changed > 0)
    }

    pub fn list_progress_for_program(&self, program_id: i64) -> Result<Vec<Progress>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, student_id, program_id, lessons_total, lessons_done, avg_score,
                    last_active
             FROM progress WHERE program_id = ?1 ORDER BY student_id ASC",
        )?;
        let rows = stmt.query_map(params![program_id], Progress::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
