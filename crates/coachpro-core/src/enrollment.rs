//! Enrollment upsert.
//!
//! Enrolling is a single IMMEDIATE transaction built from conflict clauses on
//! the `(student_id, program_id)` unique keys of `enrollments` and `progress`,
//! so concurrent enrolls of the same pair can never produce duplicate rows.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::db::Store;
use crate::error::{CoachError, Result};
use crate::types::EnrollmentStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub program_id: i64,
    pub status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollOutcome {
    /// A new enrollment (and its progress row) was written.
    Created,
    /// The pair was already enrolled; its status was reset to `enrolled`.
    Reactivated,
}

impl Enrollment {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let status: String = row.get("status")?;
        let status = status.parse::<EnrollmentStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(Self {
            id: row.get("id")?,
            student_id: row.get("student_id")?,
            program_id: row.get("program_id")?,
            status,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

const ENROLLMENT_COLUMNS: &str = "id, student_id, program_id, status, created_at, updated_at";

impl Store {
    pub fn enroll(
        &mut self,
        student_id: i64,
        program_id: i64,
        now: DateTime<Utc>,
    ) -> Result<EnrollOutcome> {
        if student_id <= 0 || program_id <= 0 {
            return Err(CoachError::MissingField("Missing data.".into()));
        }
        if !self.program_exists(program_id)? {
            return Err(CoachError::ProgramNotFound(program_id.to_string()));
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let inserted = tx.execute(
            "INSERT INTO enrollments (student_id, program_id, status, created_at, updated_at)
             VALUES (?1, ?2, 'enrolled', ?3, ?3)
             ON CONFLICT(student_id, program_id) DO NOTHING",
            params![student_id, program_id, now],
        )?;

        let outcome = if inserted == 1 {
            EnrollOutcome::Created
        } else {
            tx.execute(
                "UPDATE enrollments SET status = 'enrolled', updated_at = ?3
                 WHERE student_id = ?1 AND program_id = ?2",
                params![student_id, program_id, now],
            )?;
            EnrollOutcome::Reactivated
        };

        tx.execute(
            "INSERT INTO progress (student_id, program_id, lessons_total, lessons_done,
                                   avg_score, last_active, created_at, updated_at)
             VALUES (?1, ?2, 0, 0, 0, ?3, ?3, ?3)
             ON CONFLICT(student_id, program_id) DO NOTHING",
            params![student_id, program_id, now],
        )?;

        tx.commit()?;
        tracing::info!(student_id, program_id, ?outcome, "enrollment upserted");
        Ok(outcome)
    }

    pub fn load_enrollment(&self, student_id: i64, program_id: i64) -> Result<Enrollment> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {ENROLLMENT_COLUMNS} FROM enrollments
                     WHERE student_id = ?1 AND program_id = ?2"
                ),
                params![student_id, program_id],
                Enrollment::from_row,
            )
            .optional()?
            .ok_or(CoachError::EnrollmentNotFound {
                student_id,
                program_id,
            })
    }

    pub fn set_enrollment_status(
        &mut self,
        student_id: i64,
        program_id: i64,
        status: EnrollmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Enrollment> {
        let changed = self.conn.execute(
            "UPDATE enrollments SET status = ?1, updated_at = ?2
             WHERE student_id = ?3 AND program_id = ?4",
            params![status.as_str(), now, student_id, program_id],
        )?;
        if changed == 0 {
            return Err(CoachError::EnrollmentNotFound {
                student_id,
                program_id,
            });
        }
        self.load_enrollment(student_id, program_id)
    }

    pub fn list_enrollments_for_program(&self, program_id: i64) -> Result<Vec<Enrollment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE program_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![program_id], Enrollment::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn list_enrollments_for_student(&self, student_id: i64) -> Result<Vec<Enrollment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE student_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![student_id], Enrollment::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::program::ProgramInput;
    use tempfile::TempDir;

    fn store_with_program() -> (Store, i64) {
        let mut store = Store::open_in_memory().unwrap();
        let p = store
            .create_program(ProgramInput {
                title: Some("Leadership".into()),
                ..Default::default()
            })
            .unwrap();
        (store, p.id)
    }

    #[test]
    fn new_pair_creates_enrollment_and_zeroed_progress() {
        let (mut store, program) = store_with_program();
        let outcome = store.enroll(5, program, db::now()).unwrap();
        assert_eq!(outcome, EnrollOutcome::Created);
        assert_eq!(store.count_rows("enrollments").unwrap(), 1);
        assert_eq!(store.count_rows("progress").unwrap(), 1);

        let progress = store.get_progress(5, program).unwrap();
        assert_eq!(progress.lessons_done, 0);
        assert_eq!(progress.avg_score, 0.0);
        assert_eq!(
            store.load_enrollment(5, program).unwrap().status,
            EnrollmentStatus::Enrolled
        );
    }

    #[test]
    fn repeat_enroll_is_idempotent() {
        let (mut store, program) = store_with_program();
        store.enroll(5, program, db::now()).unwrap();
        let outcome = store.enroll(5, program, db::now()).unwrap();
        assert_eq!(outcome, EnrollOutcome::Reactivated);
        assert_eq!(store.count_rows("enrollments").unwrap(), 1);
        assert_eq!(store.count_rows("progress").unwrap(), 1);
    }

    #[test]
    fn re_enroll_resets_cancelled_status() {
        let (mut store, program) = store_with_program();
        store.enroll(5, program, db::now()).unwrap();
        store
            .set_enrollment_status(5, program, EnrollmentStatus::Cancelled, db::now())
            .unwrap();
        store.enroll(5, program, db::now()).unwrap();
        assert_eq!(
            store.load_enrollment(5, program).unwrap().status,
            EnrollmentStatus::Enrolled
        );
    }

    #[test]
    fn re_enroll_keeps_existing_progress() {
        let (mut store, program) = store_with_program();
        store.enroll(5, program, db::now()).unwrap();
        store.update_progress(5, program, 10, 4, 72.5, db::now()).unwrap();
        store.enroll(5, program, db::now()).unwrap();
        let p = store.get_progress(5, program).unwrap();
        assert_eq!(p.lessons_done, 4);
        assert_eq!(p.avg_score, 72.5);
    }

    #[test]
    fn unknown_program_is_not_found() {
        let (mut store, program) = store_with_program();
        let err = store.enroll(5, program + 100, db::now()).unwrap_err();
        assert!(matches!(err, CoachError::ProgramNotFound(_)));
        assert_eq!(store.count_rows("enrollments").unwrap(), 0);
    }

    #[test]
    fn zero_ids_are_missing_data() {
        let (mut store, program) = store_with_program();
        assert!(matches!(
            store.enroll(0, program, db::now()),
            Err(CoachError::MissingField(_))
        ));
    }

    #[test]
    fn concurrent_enrolls_write_one_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.db");
        let program = {
            let mut store = Store::open(&path).unwrap();
            store
                .create_program(ProgramInput {
                    title: Some("Race".into()),
                    ..Default::default()
                })
                .unwrap()
                .id
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let mut store = Store::open(&path).unwrap();
                    store.enroll(9, program, db::now()).unwrap()
                })
            })
            .collect();
        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(
            outcomes.iter().filter(|o| **o == EnrollOutcome::Created).count(),
            1
        );
        let store = Store::open(&path).unwrap();
        assert_eq!(store.count_rows("enrollments").unwrap(), 1);
        assert_eq!(store.count_rows("progress").unwrap(), 1);
    }

    #[test]
    fn listings_by_program_and_student() {
        let (mut store, program) = store_with_program();
        store.enroll(1, program, db::now()).unwrap();
        store.enroll(2, program, db::now()).unwrap();
        assert_eq!(store.list_enrollments_for_program(program).unwrap().len(), 2);
        assert_eq!(store.list_enrollments_for_student(2).unwrap().len(), 1);
        assert!(store.list_enrollments_for_student(3).unwrap().is_empty());
    }
}
