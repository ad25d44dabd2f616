use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{self, Store};
use crate::error::{CoachError, Result};
use crate::paths;
use crate::types::PublishStatus;

/// Page size of the public program and coach listings.
pub const LIST_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Program {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub category: Option<String>,
    pub price: Option<String>,
    pub thumbnail_url: Option<String>,
    pub status: PublishStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating or editing a program.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgramInput {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub status: Option<PublishStatus>,
}

/// Listing item returned by the public programs endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ProgramSummary {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
    pub link: String,
    pub thumb: Option<String>,
    pub price: String,
}

impl Program {
    pub fn permalink(&self, base_url: &str) -> String {
        format!("{}/coaching-programs/{}/", base_url.trim_end_matches('/'), self.slug)
    }

    /// Listed price, `"0"` when none is set.
    pub fn price_or_zero(&self) -> String {
        match self.price.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => "0".to_string(),
        }
    }

    pub fn summary(&self, base_url: &str) -> ProgramSummary {
        ProgramSummary {
            id: self.id,
            title: self.title.clone(),
            excerpt: self.excerpt.clone(),
            link: self.permalink(base_url),
            thumb: self.thumbnail_url.clone(),
            price: self.price_or_zero(),
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let status: String = row.get("status")?;
        Ok(Self {
            id: row.get("id")?,
            slug: row.get("slug")?,
            title: row.get("title")?,
            excerpt: row.get("excerpt")?,
            content: row.get("content")?,
            category: row.get("category")?,
            price: row.get("price")?,
            thumbnail_url: row.get("thumbnail_url")?,
            status: status.parse().unwrap_or(PublishStatus::Draft),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

const PROGRAM_COLUMNS: &str = "id, slug, title, excerpt, content, category, price, \
                               thumbnail_url, status, created_at, updated_at";

fn validate_price(price: Option<&str>) -> Result<()> {
    if let Some(p) = price.map(str::trim).filter(|p| !p.is_empty()) {
        let ok = p
            .parse::<f64>()
            .map(|v| v.is_finite() && v >= 0.0)
            .unwrap_or(false);
        if !ok {
            return Err(CoachError::InvalidInput(format!("invalid price: {p}")));
        }
    }
    Ok(())
}

fn normalize_category(category: Option<String>) -> Result<Option<String>> {
    match category.map(|c| c.trim().to_string()) {
        Some(c) if c.is_empty() => Ok(None),
        Some(c) => {
            paths::validate_slug(&c)?;
            Ok(Some(c))
        }
        None => Ok(None),
    }
}

impl Store {
    pub fn create_program(&mut self, input: ProgramInput) -> Result<Program> {
        let title = input
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CoachError::MissingField("title is required".into()))?
            .to_string();
        let slug = match input.slug.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => paths::slug_for(&title, "program"),
        };
        paths::validate_slug(&slug)?;
        validate_price(input.price.as_deref())?;
        let category = normalize_category(input.category)?;
        let status = input.status.unwrap_or_default();
        let now = db::now();

        self.conn
            .execute(
                "INSERT INTO programs (slug, title, excerpt, content, category, price,
                                       thumbnail_url, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                params![
                    slug,
                    title,
                    input.excerpt.unwrap_or_default(),
                    input.content.unwrap_or_default(),
                    category,
                    input.price,
                    input.thumbnail_url,
                    status.as_str(),
                    now,
                ],
            )
            .map_err(|e| db::on_unique_violation(e, CoachError::ProgramExists(slug.clone())))?;
        let id = self.conn.last_insert_rowid();
        self.load_program(id)
    }

    /// Apply the fields present in `input`; absent fields keep their value.
    pub fn update_program(&mut self, id: i64, input: ProgramInput) -> Result<Program> {
        let mut p = self.load_program(id)?;
        if let Some(slug) = input.slug {
            paths::validate_slug(&slug)?;
            p.slug = slug;
        }
        if let Some(title) = input.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(CoachError::MissingField("title is required".into()));
            }
            p.title = title;
        }
        if let Some(excerpt) = input.excerpt {
            p.excerpt = excerpt;
        }
        if let Some(content) = input.content {
            p.content = content;
        }
        if input.category.is_some() {
            p.category = normalize_category(input.category)?;
        }
        if let Some(price) = input.price {
            validate_price(Some(&price))?;
            p.price = Some(price).filter(|s| !s.trim().is_empty());
        }
        if let Some(thumb) = input.thumbnail_url {
            p.thumbnail_url = Some(thumb).filter(|s| !s.trim().is_empty());
        }
        if let Some(status) = input.status {
            p.status = status;
        }

        self.conn
            .execute(
                "UPDATE programs SET slug = ?1, title = ?2, excerpt = ?3, content = ?4,
                        category = ?5, price = ?6, thumbnail_url = ?7, status = ?8,
                        updated_at = ?9
                 WHERE id = ?10",
                params![
                    p.slug,
                    p.title,
                    p.excerpt,
                    p.content,
                    p.category,
                    p.price,
                    p.thumbnail_url,
                    p.status.as_str(),
                    db::now(),
                    id,
                ],
            )
            .map_err(|e| db::on_unique_violation(e, CoachError::ProgramExists(p.slug.clone())))?;
        self.load_program(id)
    }

    pub fn load_program(&self, id: i64) -> Result<Program> {
        self.conn
            .query_row(
                &format!("SELECT {PROGRAM_COLUMNS} FROM programs WHERE id = ?1"),
                params![id],
                Program::from_row,
            )
            .optional()?
            .ok_or_else(|| CoachError::ProgramNotFound(id.to_string()))
    }

    pub fn find_program_by_slug(&self, slug: &str) -> Result<Program> {
        self.conn
            .query_row(
                &format!("SELECT {PROGRAM_COLUMNS} FROM programs WHERE slug = ?1"),
                params![slug],
                Program::from_row,
            )
            .optional()?
            .ok_or_else(|| CoachError::ProgramNotFound(slug.to_string()))
    }

    pub fn program_exists(&self, id: i64) -> Result<bool> {
        Ok(self
            .conn
            .query_row("SELECT 1 FROM programs WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?
            .is_some())
    }

    /// Published programs, newest first, optionally restricted to one category.
    pub fn list_published_programs(&self, category: Option<&str>) -> Result<Vec<Program>> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROGRAM_COLUMNS} FROM programs
             WHERE status = 'publish' AND (?1 IS NULL OR category = ?1)
             ORDER BY created_at DESC, id DESC
             LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![category, LIST_LIMIT as i64], Program::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn list_programs(&self) -> Result<Vec<Program>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROGRAM_COLUMNS} FROM programs ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map([], Program::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
