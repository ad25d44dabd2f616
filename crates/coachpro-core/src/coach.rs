use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{self, Store};
use crate::error::{CoachError, Result};
use crate::paths;
use crate::program::LIST_LIMIT;
use crate::types::PublishStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coach {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub excerpt: String,
    pub content: String,
    pub specialty: Option<String>,
    pub thumbnail_url: Option<String>,
    pub status: PublishStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoachInput {
    #[serde(default)]
    pub slug: Option<String>,
    pub name: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub status: Option<PublishStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoachSummary {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
    pub link: String,
    pub thumb: Option<String>,
}

impl Coach {
    pub fn summary(&self, base_url: &str) -> CoachSummary {
        CoachSummary {
            id: self.id,
            title: self.name.clone(),
            excerpt: self.excerpt.clone(),
            link: format!("{}/coaches/{}/", base_url.trim_end_matches('/'), self.slug),
            thumb: self.thumbnail_url.clone(),
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let status: String = row.get("status")?;
        Ok(Self {
            id: row.get("id")?,
            slug: row.get("slug")?,
            name: row.get("name")?,
            excerpt: row.get("excerpt")?,
            content: row.get("content")?,
            specialty: row.get("specialty")?,
            thumbnail_url: row.get("thumbnail_url")?,
            status: status.parse().unwrap_or(PublishStatus::Draft),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

const COACH_COLUMNS: &str = "id, slug, name, excerpt, content, specialty, thumbnail_url, \
                             status, created_at, updated_at";

/// Escape LIKE wildcards so user search text matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl Store {
    pub fn create_coach(&mut self, input: CoachInput) -> Result<Coach> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(CoachError::MissingField("name is required".into()));
        }
        let slug = match input.slug.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => paths::slug_for(&name, "coach"),
        };
        paths::validate_slug(&slug)?;
        let now = db::now();
        self.conn
            .execute(
                "INSERT INTO coaches (slug, name, excerpt, content, specialty, thumbnail_url,
                                      status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    slug,
                    name,
                    input.excerpt.unwrap_or_default(),
                    input.content.unwrap_or_default(),
                    input.specialty.filter(|s| !s.trim().is_empty()),
                    input.thumbnail_url,
                    input.status.unwrap_or_default().as_str(),
                    now,
                ],
            )
            .map_err(|e| db::on_unique_violation(e, CoachError::CoachExists(slug.clone())))?;
        let id = self.conn.last_insert_rowid();
        self.load_coach(id)
    }

    pub fn load_coach(&self, id: i64) -> Result<Coach> {
        self.conn
            .query_row(
                &format!("SELECT {COACH_COLUMNS} FROM coaches WHERE id = ?1"),
                params![id],
                Coach::from_row,
            )
            .optional()?
            .ok_or_else(|| CoachError::CoachNotFound(id.to_string()))
    }

    /// Published coaches, newest first. `specialty` is a free-text search over
    /// name, excerpt, content and specialty.
    pub fn list_published_coaches(&self, specialty: Option<&str>) -> Result<Vec<Coach>> {
        let pattern = specialty
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COACH_COLUMNS} FROM coaches
             WHERE status = 'publish'
               AND (?1 IS NULL
                    OR name LIKE ?1 ESCAPE '\\'
                    OR excerpt LIKE ?1 ESCAPE '\\'
                    OR content LIKE ?1 ESCAPE '\\'
                    OR specialty LIKE ?1 ESCAPE '\\')
             ORDER BY created_at DESC, id DESC
             LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![pattern, LIST_LIMIT as i64], Coach::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coach(name: &str, specialty: &str) -> CoachInput {
        CoachInput {
            name: name.to_string(),
            specialty: Some(specialty.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn specialty_search_matches_any_text_column() {
        let mut store = Store::open_in_memory().unwrap();
        store.create_coach(coach("Dana Fox", "career")).unwrap();
        let mut bio = coach("Eli Stone", "wellness");
        bio.excerpt = Some("Former career counsellor".into());
        store.create_coach(bio).unwrap();
        store.create_coach(coach("Kim Lau", "fitness")).unwrap();

        let career = store.list_published_coaches(Some("career")).unwrap();
        assert_eq!(career.len(), 2);
        assert_eq!(store.list_published_coaches(None).unwrap().len(), 3);
    }

    #[test]
    fn like_wildcards_are_literal() {
        let mut store = Store::open_in_memory().unwrap();
        store.create_coach(coach("Dana Fox", "career")).unwrap();
        assert!(store.list_published_coaches(Some("%")).unwrap().is_empty());
        assert!(store.list_published_coaches(Some("_")).unwrap().is_empty());
    }

    #[test]
    fn drafts_hidden() {
        let mut store = Store::open_in_memory().unwrap();
        let mut c = coach("Hidden", "career");
        c.status = Some(PublishStatus::Draft);
        store.create_coach(c).unwrap();
        assert!(store.list_published_coaches(None).unwrap().is_empty());
    }

    #[test]
    fn summary_link_uses_slug() {
        let mut store = Store::open_in_memory().unwrap();
        let c = store.create_coach(coach("Dana Fox", "career")).unwrap();
        assert_eq!(
            c.summary("http://localhost:3141").link,
            "http://localhost:3141/coaches/dana-fox/"
        );
    }

    #[test]
    fn non_latin_name_gets_fallback_slug() {
        let mut store = Store::open_in_memory().unwrap();
        let c = store.create_coach(coach("عائشہ خان", "career")).unwrap();
        assert!(c.slug.starts_with("coach-"), "{}", c.slug);
        assert_eq!(c.name, "عائشہ خان");
    }

    #[test]
    fn empty_name_rejected() {
        let mut store = Store::open_in_memory().unwrap();
        assert!(store.create_coach(coach("  ", "x")).is_err());
    }
}
