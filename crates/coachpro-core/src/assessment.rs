use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::Store;
use crate::error::{CoachError, Result};
use crate::recommendation::json_column;
use crate::types::check_percent;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assessment {
    pub id: i64,
    pub program_id: i64,
    pub title: String,
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssessmentResponse {
    pub id: i64,
    pub assessment_id: i64,
    pub student_id: i64,
    pub answers: serde_json::Value,
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAssessment {
    pub program_id: i64,
    pub title: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssessmentUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub config: Option<serde_json::Value>,
}

impl Assessment {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            program_id: row.get("program_id")?,
            title: row.get("title")?,
            config: json_column(row, "config_json")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

impl AssessmentResponse {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            assessment_id: row.get("assessment_id")?,
            student_id: row.get("student_id")?,
            answers: json_column(row, "answers_json")?,
            score: row.get("score")?,
            created_at: row.get("created_at")?,
        })
    }
}

fn normalize_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CoachError::MissingField("title is required".into()));
    }
    Ok(title.to_string())
}

/// A missing config is stored as an empty object.
fn normalize_config(config: serde_json::Value) -> serde_json::Value {
    if config.is_null() {
        serde_json::json!({})
    } else {
        config
    }
}

const ASSESSMENT_COLUMNS: &str = "id, program_id, title, config_json, created_at, updated_at";
const RESPONSE_COLUMNS: &str = "id, assessment_id, student_id, answers_json, score, created_at";

impl Store {
    pub fn create_assessment(
        &mut self,
        input: NewAssessment,
        now: DateTime<Utc>,
    ) -> Result<Assessment> {
        let title = normalize_title(&input.title)?;
        if !self.program_exists(input.program_id)? {
            return Err(CoachError::ProgramNotFound(input.program_id.to_string()));
        }
        let config = normalize_config(input.config);
        self.conn.execute(
            "INSERT INTO assessments (program_id, title, config_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![input.program_id, title, config.to_string(), now],
        )?;
        self.load_assessment(self.conn.last_insert_rowid())
    }

    pub fn update_assessment(
        &mut self,
        id: i64,
        update: AssessmentUpdate,
        now: DateTime<Utc>,
    ) -> Result<Assessment> {
        let mut current = self.load_assessment(id)?;
        if let Some(title) = update.title {
            current.title = normalize_title(&title)?;
        }
        if let Some(config) = update.config {
            current.config = normalize_config(config);
        }
        self.conn.execute(
            "UPDATE assessments SET title = ?1, config_json = ?2, updated_at = ?3 WHERE id = ?4",
            params![current.title, current.config.to_string(), now, id],
        )?;
        self.load_assessment(id)
    }

    pub fn load_assessment(&self, id: i64) -> Result<Assessment> {
        self.conn
            .query_row(
                &format!("SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE id = ?1"),
                params![id],
                Assessment::from_row,
            )
            .optional()?
            .ok_or(CoachError::AssessmentNotFound(id))
    }

    pub fn list_assessments(&self, program_id: Option<i64>) -> Result<Vec<Assessment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessments
             WHERE (?1 IS NULL OR program_id = ?1)
             ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![program_id], Assessment::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Record a student's answers. Responses start ungraded at score 0.
    pub fn submit_response(
        &mut self,
        assessment_id: i64,
        student_id: i64,
        answers: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<AssessmentResponse> {
        self.load_assessment(assessment_id)?;
        if answers.is_null() {
            return Err(CoachError::MissingField("answers are required".into()));
        }
        self.conn.execute(
            "INSERT INTO assessment_responses (assessment_id, student_id, answers_json, score,
                                               created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![assessment_id, student_id, answers.to_string(), now],
        )?;
        self.load_response(self.conn.last_insert_rowid())
    }

    pub fn grade_response(&mut self, response_id: i64, score: f64) -> Result<AssessmentResponse> {
        let score = check_percent("score", score)?;
        let changed = self.conn.execute(
            "UPDATE assessment_responses SET score = ?1 WHERE id = ?2",
            params![score, response_id],
        )?;
        if changed == 0 {
            return Err(CoachError::ResponseNotFound(response_id));
        }
        self.load_response(response_id)
    }

    pub fn load_response(&self, id: i64) -> Result<AssessmentResponse> {
        self.conn
            .query_row(
                &format!("SELECT {RESPONSE_COLUMNS} FROM assessment_responses WHERE id = ?1"),
                params![id],
                AssessmentResponse::from_row,
            )
            .optional()?
            .ok_or(CoachError::ResponseNotFound(id))
    }

    /// Responses to an assessment, optionally restricted to one student.
    pub fn list_responses(
        &self,
        assessment_id: i64,
        student_id: Option<i64>,
    ) -> Result<Vec<AssessmentResponse>> {
        self.load_assessment(assessment_id)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESPONSE_COLUMNS} FROM assessment_responses
             WHERE assessment_id = ?1 AND (?2 IS NULL OR student_id = ?2)
             ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![assessment_id, student_id], AssessmentResponse::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::program::ProgramInput;
    use serde_json::json;

    fn store_with_assessment() -> (Store, Assessment) {
        let mut store = Store::open_in_memory().unwrap();
        let program = store
            .create_program(ProgramInput {
                title: Some("Public Speaking".into()),
                ..Default::default()
            })
            .unwrap();
        let a = store
            .create_assessment(
                NewAssessment {
                    program_id: program.id,
                    title: "Week 1 quiz".into(),
                    config: json!({ "questions": 3 }),
                },
                db::now(),
            )
            .unwrap();
        (store, a)
    }

    #[test]
    fn create_requires_title_and_program() {
        let (mut store, a) = store_with_assessment();
        let blank = NewAssessment {
            program_id: a.program_id,
            title: "  ".into(),
            config: json!({}),
        };
        assert!(matches!(
            store.create_assessment(blank, db::now()),
            Err(CoachError::MissingField(_))
        ));
        let orphan = NewAssessment {
            program_id: 999,
            title: "Quiz".into(),
            config: serde_json::Value::Null,
        };
        assert!(matches!(
            store.create_assessment(orphan, db::now()),
            Err(CoachError::ProgramNotFound(_))
        ));
    }

    #[test]
    fn update_is_partial() {
        let (mut store, a) = store_with_assessment();
        let updated = store
            .update_assessment(
                a.id,
                AssessmentUpdate {
                    title: Some("Week 1 review".into()),
                    config: None,
                },
                db::now(),
            )
            .unwrap();
        assert_eq!(updated.title, "Week 1 review");
        assert_eq!(updated.config["questions"], 3);
    }

    #[test]
    fn responses_start_at_zero_and_can_be_graded() {
        let (mut store, a) = store_with_assessment();
        let r = store
            .submit_response(a.id, 12, &json!({ "q1": "b" }), db::now())
            .unwrap();
        assert_eq!(r.score, 0.0);
        let graded = store.grade_response(r.id, 88.888).unwrap();
        assert_eq!(graded.score, 88.89);
        assert!(store.grade_response(r.id, 120.0).is_err());
        assert!(matches!(
            store.grade_response(r.id + 50, 10.0),
            Err(CoachError::ResponseNotFound(_))
        ));
    }

    #[test]
    fn responses_filter_by_student() {
        let (mut store, a) = store_with_assessment();
        store.submit_response(a.id, 1, &json!(["a"]), db::now()).unwrap();
        store.submit_response(a.id, 2, &json!(["b"]), db::now()).unwrap();
        assert_eq!(store.list_responses(a.id, None).unwrap().len(), 2);
        let own = store.list_responses(a.id, Some(2)).unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].answers, json!(["b"]));
    }

    #[test]
    fn submit_to_missing_assessment_fails() {
        let (mut store, a) = store_with_assessment();
        assert!(matches!(
            store.submit_response(a.id + 1, 1, &json!({}), db::now()),
            Err(CoachError::AssessmentNotFound(_))
        ));
    }
}
