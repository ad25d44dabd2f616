//! Per-(student, program) message log between a student and a coach.
//! Rows are only ever appended.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::Store;
use crate::error::{CoachError, Result};
use crate::types::is_http_url;

pub const SESSION_STARTED: &str = "Session started.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionMessage {
    pub id: i64,
    pub student_id: i64,
    pub coach_id: i64,
    pub program_id: i64,
    pub message: String,
    pub attachment_url: Option<String>,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Who wrote a message, recorded in its `meta.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    Student,
    Coach,
}

impl Author {
    fn meta(self) -> serde_json::Value {
        match self {
            Author::Student => serde_json::json!({ "type": "user" }),
            Author::Coach => serde_json::json!({ "type": "coach" }),
        }
    }
}

impl SessionMessage {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let meta: Option<String> = row.get("meta_json")?;
        let meta = meta
            .as_deref()
            .and_then(|m| serde_json::from_str(m).ok())
            .unwrap_or_else(|| serde_json::json!({}));
        Ok(Self {
            id: row.get("id")?,
            student_id: row.get("student_id")?,
            coach_id: row.get("coach_id")?,
            program_id: row.get("program_id")?,
            message: row.get::<_, Option<String>>("message")?.unwrap_or_default(),
            attachment_url: row.get("attachment_url")?,
            meta,
            created_at: row.get("created_at")?,
        })
    }
}

fn require_program(program_id: i64) -> Result<()> {
    if program_id <= 0 {
        return Err(CoachError::MissingField("Program required.".into()));
    }
    Ok(())
}

impl Store {
    fn append_message(
        &mut self,
        student_id: i64,
        coach_id: i64,
        program_id: i64,
        message: &str,
        attachment_url: Option<&str>,
        meta: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<SessionMessage> {
        self.conn.execute(
            "INSERT INTO session_messages (student_id, coach_id, program_id, message,
                                           attachment_url, meta_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                student_id,
                coach_id,
                program_id,
                message,
                attachment_url,
                meta.to_string(),
                now
            ],
        )?;
        Ok(SessionMessage {
            id: self.conn.last_insert_rowid(),
            student_id,
            coach_id,
            program_id,
            message: message.to_string(),
            attachment_url: attachment_url.map(str::to_string),
            meta: meta.clone(),
            created_at: now,
        })
    }

    /// Open a thread by appending a system "start" message.
    pub fn start_session(
        &mut self,
        student_id: i64,
        coach_id: i64,
        program_id: i64,
        now: DateTime<Utc>,
    ) -> Result<SessionMessage> {
        require_program(program_id)?;
        let meta = serde_json::json!({ "type": "system", "event": "start" });
        self.append_message(student_id, coach_id, program_id, SESSION_STARTED, None, &meta, now)
    }

    /// Append a message to the (student, program) log. Empty text is rejected
    /// before anything is written. A student message also refreshes the
    /// student's `last_active`.
    #[allow(clippy::too_many_arguments)]
    pub fn send_message(
        &mut self,
        author: Author,
        student_id: i64,
        coach_id: i64,
        program_id: i64,
        message: &str,
        attachment_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SessionMessage> {
        let message = message.trim();
        if program_id <= 0 || message.is_empty() {
            return Err(CoachError::MissingField("Invalid message.".into()));
        }
        let attachment_url = attachment_url.map(str::trim).filter(|u| !u.is_empty());
        if let Some(url) = attachment_url {
            if !is_http_url(url) {
                return Err(CoachError::InvalidInput(format!(
                    "attachment_url must be an http(s) URL: {url}"
                )));
            }
        }

        let sent = self.append_message(
            student_id,
            coach_id,
            program_id,
            message,
            attachment_url,
            &author.meta(),
            now,
        )?;
        if author == Author::Student {
            self.touch_progress(student_id, program_id, now)?;
        }
        Ok(sent)
    }

    /// Coach reply into a student's thread.
    pub fn reply_message(
        &mut self,
        coach_id: i64,
        student_id: i64,
        program_id: i64,
        message: &str,
        attachment_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SessionMessage> {
        self.send_message(
            Author::Coach,
            student_id,
            coach_id,
            program_id,
            message,
            attachment_url,
            now,
        )
    }

    pub fn list_session_messages(
        &self,
        student_id: i64,
        program_id: i64,
    ) -> Result<Vec<SessionMessage>> {
        require_program(program_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, student_id, coach_id, program_id, message, attachment_url, meta_json,
                    created_at
             FROM session_messages
             WHERE student_id = ?1 AND program_id = ?2
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![student_id, program_id], SessionMessage::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn start_appends_system_message() {
        let mut store = Store::open_in_memory().unwrap();
        let m = store.start_session(3, 8, 1, db::now()).unwrap();
        assert_eq!(m.message, SESSION_STARTED);
        assert_eq!(m.meta["type"], "system");
        assert_eq!(m.meta["event"], "start");
    }

    #[test]
    fn start_requires_program() {
        let mut store = Store::open_in_memory().unwrap();
        let err = store.start_session(3, 8, 0, db::now()).unwrap_err();
        assert_eq!(err.to_string(), "Program required.");
    }

    #[test]
    fn empty_message_writes_nothing() {
        let mut store = Store::open_in_memory().unwrap();
        for text in ["", "   \n"] {
            let err = store
                .send_message(Author::Student, 3, 0, 1, text, None, db::now())
                .unwrap_err();
            assert!(matches!(err, CoachError::MissingField(_)));
        }
        assert_eq!(store.count_rows("session_messages").unwrap(), 0);
    }

    #[test]
    fn messages_listed_in_append_order() {
        let mut store = Store::open_in_memory().unwrap();
        store.start_session(3, 8, 1, db::now()).unwrap();
        store
            .send_message(Author::Student, 3, 8, 1, "Hello coach", None, db::now())
            .unwrap();
        store
            .reply_message(8, 3, 1, "Hi! Let's begin.", None, db::now())
            .unwrap();
        store
            .send_message(Author::Student, 4, 8, 1, "other student", None, db::now())
            .unwrap();

        let log = store.list_session_messages(3, 1).unwrap();
        let texts: Vec<_> = log.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, vec![SESSION_STARTED, "Hello coach", "Hi! Let's begin."]);
        assert_eq!(log[1].meta["type"], "user");
        assert_eq!(log[2].meta["type"], "coach");
        assert!(log.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn student_message_touches_progress() {
        let mut store = Store::open_in_memory().unwrap();
        store.update_progress(3, 1, 5, 1, 0.0, db::now()).unwrap();
        let now = db::now();
        store
            .send_message(Author::Student, 3, 0, 1, "progress ping", None, now)
            .unwrap();
        assert_eq!(store.get_progress(3, 1).unwrap().last_active, Some(now));
    }

    #[test]
    fn attachment_must_be_http() {
        let mut store = Store::open_in_memory().unwrap();
        assert!(store
            .send_message(Author::Student, 3, 0, 1, "see file", Some("file:///etc/passwd"), db::now())
            .is_err());
        let m = store
            .send_message(
                Author::Student,
                3,
                0,
                1,
                "see file",
                Some("https://files.example.com/plan.pdf"),
                db::now(),
            )
            .unwrap();
        assert_eq!(m.attachment_url.as_deref(), Some("https://files.example.com/plan.pdf"));
    }
}
