//! Per-program daily snapshots: enrollment count, completion rate and mean score.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::Store;
use crate::error::{CoachError, Result};
use crate::types::{check_percent, round2};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub id: i64,
    pub snapshot_date: NaiveDate,
    pub program_id: i64,
    pub enrollments: i64,
    pub completion_rate: f64,
    pub avg_score: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotInput {
    pub program_id: i64,
    pub snapshot_date: String,
    #[serde(default)]
    pub enrollments: i64,
    #[serde(default)]
    pub completion_rate: f64,
    #[serde(default)]
    pub avg_score: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(default)]
    pub program_id: Option<i64>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| CoachError::InvalidDate(s.to_string()))
}

fn parse_opt_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
    match s.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => parse_date(s).map(Some),
        None => Ok(None),
    }
}

impl Snapshot {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            snapshot_date: row.get("snapshot_date")?,
            program_id: row.get("program_id")?,
            enrollments: row.get("enrollments")?,
            completion_rate: row.get("completion_rate")?,
            avg_score: row.get("avg_score")?,
            created_at: row.get("created_at")?,
        })
    }
}

impl Store {
    pub fn query_analytics(&self, query: &AnalyticsQuery) -> Result<Vec<Snapshot>> {
        let from = parse_opt_date(query.from.as_deref())?;
        let to = parse_opt_date(query.to.as_deref())?;
        let program_id = query.program_id.filter(|id| *id > 0);

        let mut stmt = self.conn.prepare(
            "SELECT id, snapshot_date, program_id, enrollments, completion_rate, avg_score,
                    created_at
             FROM analytics
             WHERE (?1 IS NULL OR program_id = ?1)
               AND (?2 IS NULL OR snapshot_date >= ?2)
               AND (?3 IS NULL OR snapshot_date <= ?3)
             ORDER BY snapshot_date ASC, program_id ASC",
        )?;
        let rows = stmt.query_map(params![program_id, from, to], Snapshot::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Write a snapshot, replacing any existing row for the same program and date.
    pub fn record_snapshot(&mut self, input: &SnapshotInput, now: DateTime<Utc>) -> Result<Snapshot> {
        if input.program_id <= 0 {
            return Err(CoachError::MissingField("program_id is required".into()));
        }
        if input.enrollments < 0 {
            return Err(CoachError::InvalidInput(
                "enrollments must not be negative".into(),
            ));
        }
        let date = parse_date(&input.snapshot_date)?;
        let completion_rate = check_percent("completion_rate", input.completion_rate)?;
        let avg_score = check_percent("avg_score", input.avg_score)?;

        let snapshot = self.conn.query_row(
            "INSERT INTO analytics (snapshot_date, program_id, enrollments, completion_rate,
                                    avg_score, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(program_id, snapshot_date) DO UPDATE SET
               enrollments = excluded.enrollments,
               completion_rate = excluded.completion_rate,
               avg_score = excluded.avg_score
             RETURNING id, snapshot_date, program_id, enrollments, completion_rate, avg_score,
                       created_at",
            params![
                date,
                input.program_id,
                input.enrollments,
                completion_rate,
                avg_score,
                now
            ],
            Snapshot::from_row,
        )?;
        Ok(snapshot)
    }

    /// Aggregate current enrollments and progress for a program into a
    /// snapshot dated `date`.
    pub fn compute_snapshot(
        &mut self,
        program_id: i64,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Snapshot> {
        if !self.program_exists(program_id)? {
            return Err(CoachError::ProgramNotFound(program_id.to_string()));
        }
        let enrollments: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM enrollments
             WHERE program_id = ?1 AND status IN ('enrolled', 'completed')",
            params![program_id],
            |row| row.get(0),
        )?;
        let (rows, completed, avg): (i64, i64, Option<f64>) = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN lessons_total > 0 AND lessons_done >= lessons_total
                                      THEN 1 ELSE 0 END), 0),
                    AVG(avg_score)
             FROM progress WHERE program_id = ?1",
            params![program_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        let completion_rate = if rows == 0 {
            0.0
        } else {
            round2(completed as f64 * 100.0 / rows as f64)
        };

        let input = SnapshotInput {
            program_id,
            snapshot_date: date.format("%Y-%m-%d").to_string(),
            enrollments,
            completion_rate,
            avg_score: round2(avg.unwrap_or(0.0)),
        };
        self.record_snapshot(&input, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::program::ProgramInput;

    fn input(program_id: i64, date: &str, enrollments: i64) -> SnapshotInput {
        SnapshotInput {
            program_id,
            snapshot_date: date.to_string(),
            enrollments,
            completion_rate: 50.0,
            avg_score: 80.0,
        }
    }

    #[test]
    fn record_upserts_on_program_and_date() {
        let mut store = Store::open_in_memory().unwrap();
        store.record_snapshot(&input(1, "2024-03-01", 4), db::now()).unwrap();
        let s = store.record_snapshot(&input(1, "2024-03-01", 9), db::now()).unwrap();
        assert_eq!(s.enrollments, 9);
        assert_eq!(store.count_rows("analytics").unwrap(), 1);
    }

    #[test]
    fn query_filters_and_orders_by_date() {
        let mut store = Store::open_in_memory().unwrap();
        store.record_snapshot(&input(1, "2024-03-03", 3), db::now()).unwrap();
        store.record_snapshot(&input(1, "2024-03-01", 1), db::now()).unwrap();
        store.record_snapshot(&input(2, "2024-03-02", 2), db::now()).unwrap();

        let all = store.query_analytics(&AnalyticsQuery::default()).unwrap();
        let dates: Vec<_> = all.iter().map(|s| s.snapshot_date.to_string()).collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-03-02", "2024-03-03"]);

        let ranged = store
            .query_analytics(&AnalyticsQuery {
                program_id: Some(1),
                from: Some("2024-03-02".into()),
                to: None,
            })
            .unwrap();
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].enrollments, 3);
    }

    #[test]
    fn bad_dates_rejected() {
        let mut store = Store::open_in_memory().unwrap();
        let err = store
            .query_analytics(&AnalyticsQuery {
                from: Some("03/01/2024".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, CoachError::InvalidDate(_)));
        assert!(store.record_snapshot(&input(1, "2024-13-01", 1), db::now()).is_err());
    }

    #[test]
    fn compute_aggregates_enrollments_and_progress() {
        let mut store = Store::open_in_memory().unwrap();
        let program = store
            .create_program(ProgramInput {
                title: Some("Mindset".into()),
                ..Default::default()
            })
            .unwrap()
            .id;
        for student in 1..=4 {
            store.enroll(student, program, db::now()).unwrap();
        }
        store
            .set_enrollment_status(4, program, crate::types::EnrollmentStatus::Cancelled, db::now())
            .unwrap();
        store.update_progress(1, program, 5, 5, 90.0, db::now()).unwrap();
        store.update_progress(2, program, 5, 2, 70.0, db::now()).unwrap();

        let date = parse_date("2024-04-01").unwrap();
        let s = store.compute_snapshot(program, date, db::now()).unwrap();
        assert_eq!(s.enrollments, 3);
        assert_eq!(s.completion_rate, 25.0);
        assert_eq!(s.avg_score, 40.0);
    }

    #[test]
    fn compute_unknown_program_is_not_found() {
        let mut store = Store::open_in_memory().unwrap();
        let date = parse_date("2024-04-01").unwrap();
        assert!(matches!(
            store.compute_snapshot(42, date, db::now()),
            Err(CoachError::ProgramNotFound(_))
        ));
    }
}
