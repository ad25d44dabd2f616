//! Recommendation rules are stored verbatim as JSON and never evaluated.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::Store;
use crate::error::{CoachError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub id: i64,
    pub student_id: i64,
    pub program_id: i64,
    pub rule: serde_json::Value,
    pub output: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Recommendation {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            student_id: row.get("student_id")?,
            program_id: row.get("program_id")?,
            rule: json_column(row, "rule_json")?,
            output: json_column(row, "output_json")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub(crate) fn json_column(row: &Row<'_>, column: &str) -> rusqlite::Result<serde_json::Value> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

impl Store {
    pub fn create_recommendation(
        &mut self,
        student_id: i64,
        program_id: i64,
        rule: &serde_json::Value,
        output: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<Recommendation> {
        if student_id <= 0 || program_id <= 0 {
            return Err(CoachError::MissingField(
                "student_id and program_id are required".into(),
            ));
        }
        self.conn.execute(
            "INSERT INTO recommendations (student_id, program_id, rule_json, output_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![student_id, program_id, rule.to_string(), output.to_string(), now],
        )?;
        Ok(Recommendation {
            id: self.conn.last_insert_rowid(),
            student_id,
            program_id,
            rule: rule.clone(),
            output: output.clone(),
            created_at: now,
        })
    }

    /// Recommendations for a student, optionally narrowed to one program, oldest first.
    pub fn list_recommendations(
        &self,
        student_id: i64,
        program_id: Option<i64>,
    ) -> Result<Vec<Recommendation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, student_id, program_id, rule_json, output_json, created_at
             FROM recommendations
             WHERE student_id = ?1 AND (?2 IS NULL OR program_id = ?2)
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![student_id, program_id], Recommendation::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
