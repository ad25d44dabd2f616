//! Custom GPT catalogue and its prompt builder.
//!
//! A GPT carries a prompt template with `{Label}` placeholders and a list of
//! fields describing how each placeholder is filled in.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::Store;
use crate::error::{CoachError, Result};
use crate::types::is_http_url;

pub const REQUIRED_FIELDS_MESSAGE: &str = "Please fill in all required fields.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Text,
    Select,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptField {
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default, deserialize_with = "de_options")]
    pub options: Vec<String>,
}

/// Options arrive as a list or as one comma-separated string.
fn de_options<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Csv(String),
        Nothing(()),
    }
    let raw = Raw::deserialize(d)?;
    let items = match raw {
        Raw::List(items) => items,
        Raw::Csv(s) => s.split(',').map(str::to_string).collect(),
        Raw::Nothing(()) => Vec::new(),
    };
    Ok(items
        .into_iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomGpt {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub gpt_url: String,
    pub prompt_template: Option<String>,
    pub prompt_fields: Vec<PromptField>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GptInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub gpt_url: String,
    #[serde(default)]
    pub prompt_template: Option<String>,
    #[serde(default)]
    pub prompt_fields: Vec<PromptField>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenderedPrompt {
    pub prompt: String,
    pub gpt_url: String,
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder regex is valid"))
}

impl CustomGpt {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let fields: Option<String> = row.get("prompt_fields")?;
        let prompt_fields = match fields.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => serde_json::from_str(raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            _ => Vec::new(),
        };
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            gpt_url: row.get("gpt_url")?,
            prompt_template: row.get("prompt_template")?,
            prompt_fields,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Fill the template's `{Label}` placeholders from `values`.
    ///
    /// Every declared field needs a non-empty value and select values must be
    /// one of the field's options. Placeholders without a declared field are
    /// left as written.
    pub fn render_prompt(&self, values: &BTreeMap<String, String>) -> Result<RenderedPrompt> {
        let mut resolved: BTreeMap<&str, &str> = BTreeMap::new();
        for field in &self.prompt_fields {
            let value = values
                .get(&field.label)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| CoachError::MissingField(REQUIRED_FIELDS_MESSAGE.into()))?;
            if field.field_type == FieldType::Select && !field.options.iter().any(|o| o == value) {
                return Err(CoachError::InvalidInput(format!(
                    "'{value}' is not an option for {}",
                    field.label
                )));
            }
            resolved.insert(field.label.as_str(), value);
        }

        let template = self.prompt_template.as_deref().unwrap_or_default();
        let prompt = placeholder_re().replace_all(template, |caps: &regex::Captures<'_>| {
            match resolved.get(caps[1].trim()) {
                Some(v) => (*v).to_string(),
                None => caps[0].to_string(),
            }
        });
        Ok(RenderedPrompt {
            prompt: prompt.into_owned(),
            gpt_url: self.gpt_url.clone(),
        })
    }
}

fn validate_input(input: &mut GptInput) -> Result<()> {
    input.name = input.name.trim().to_string();
    input.gpt_url = input.gpt_url.trim().to_string();
    if input.name.is_empty() || input.gpt_url.is_empty() {
        return Err(CoachError::MissingField(REQUIRED_FIELDS_MESSAGE.into()));
    }
    if !is_http_url(&input.gpt_url) {
        return Err(CoachError::InvalidInput(format!(
            "gpt_url must be an http(s) URL: {}",
            input.gpt_url
        )));
    }
    let mut seen = HashSet::new();
    for field in &mut input.prompt_fields {
        field.label = field.label.trim().to_string();
        if field.label.is_empty() {
            return Err(CoachError::InvalidInput("prompt field labels must not be empty".into()));
        }
        if !seen.insert(field.label.clone()) {
            return Err(CoachError::InvalidInput(format!(
                "duplicate prompt field label: {}",
                field.label
            )));
        }
        if field.field_type == FieldType::Select && field.options.is_empty() {
            return Err(CoachError::InvalidInput(format!(
                "select field '{}' needs at least one option",
                field.label
            )));
        }
    }
    Ok(())
}

const GPT_COLUMNS: &str =
    "id, name, description, gpt_url, prompt_template, prompt_fields, created_at, updated_at";

impl Store {
    pub fn create_gpt(&mut self, mut input: GptInput, now: DateTime<Utc>) -> Result<CustomGpt> {
        validate_input(&mut input)?;
        self.conn.execute(
            "INSERT INTO custom_gpts (name, description, gpt_url, prompt_template, prompt_fields,
                                      created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                input.name,
                input.description,
                input.gpt_url,
                input.prompt_template,
                serde_json::to_string(&input.prompt_fields)?,
                now
            ],
        )?;
        self.load_gpt(self.conn.last_insert_rowid())
    }

    pub fn update_gpt(&mut self, id: i64, mut input: GptInput, now: DateTime<Utc>) -> Result<CustomGpt> {
        validate_input(&mut input)?;
        let changed = self.conn.execute(
            "UPDATE custom_gpts SET name = ?1, description = ?2, gpt_url = ?3,
                    prompt_template = ?4, prompt_fields = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                input.name,
                input.description,
                input.gpt_url,
                input.prompt_template,
                serde_json::to_string(&input.prompt_fields)?,
                now,
                id
            ],
        )?;
        if changed == 0 {
            return Err(CoachError::GptNotFound(id));
        }
        self.load_gpt(id)
    }

    pub fn delete_gpt(&mut self, id: i64) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM custom_gpts WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Err(CoachError::GptNotFound(id));
        }
        Ok(())
    }

    pub fn load_gpt(&self, id: i64) -> Result<CustomGpt> {
        self.conn
            .query_row(
                &format!("SELECT {GPT_COLUMNS} FROM custom_gpts WHERE id = ?1"),
                params![id],
                CustomGpt::from_row,
            )
            .optional()?
            .ok_or(CoachError::GptNotFound(id))
    }

    /// All GPTs, newest first.
    pub fn list_gpts(&self) -> Result<Vec<CustomGpt>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GPT_COLUMNS} FROM custom_gpts ORDER BY id DESC"
        ))?;
        let rows = stmt.query_map([], CustomGpt::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn career_gpt() -> GptInput {
        serde_json::from_value(serde_json::json!({
            "name": "Career Coach GPT",
            "gpt_url": "https://chat.openai.com/g/g-career",
            "prompt_template": "I am a {Role} aiming for {Goal}. Tone: {Tone}. {Unknown}",
            "prompt_fields": [
                { "label": "Role", "type": "text" },
                { "label": "Goal", "type": "text" },
                { "label": "Tone", "type": "select", "options": "friendly, direct" }
            ]
        }))
        .unwrap()
    }

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn renders_declared_placeholders_only() {
        let mut store = Store::open_in_memory().unwrap();
        let gpt = store.create_gpt(career_gpt(), db::now()).unwrap();
        assert_eq!(gpt.prompt_fields[2].options, vec!["friendly", "direct"]);

        let out = gpt
            .render_prompt(&values(&[
                ("Role", "designer"),
                ("Goal", "a lead role"),
                ("Tone", "direct"),
            ]))
            .unwrap();
        assert_eq!(
            out.prompt,
            "I am a designer aiming for a lead role. Tone: direct. {Unknown}"
        );
        assert_eq!(out.gpt_url, "https://chat.openai.com/g/g-career");
    }

    #[test]
    fn missing_value_and_bad_option_rejected() {
        let mut store = Store::open_in_memory().unwrap();
        let gpt = store.create_gpt(career_gpt(), db::now()).unwrap();
        let err = gpt
            .render_prompt(&values(&[("Role", "designer"), ("Tone", "direct")]))
            .unwrap_err();
        assert_eq!(err.to_string(), REQUIRED_FIELDS_MESSAGE);
        assert!(gpt
            .render_prompt(&values(&[
                ("Role", "designer"),
                ("Goal", "x"),
                ("Tone", "sarcastic")
            ]))
            .is_err());
    }

    #[test]
    fn create_validates_required_fields_and_schema() {
        let mut store = Store::open_in_memory().unwrap();
        let mut no_url = career_gpt();
        no_url.gpt_url = " ".into();
        assert_eq!(
            store.create_gpt(no_url, db::now()).unwrap_err().to_string(),
            REQUIRED_FIELDS_MESSAGE
        );

        let mut bad_url = career_gpt();
        bad_url.gpt_url = "chat.openai.com".into();
        assert!(store.create_gpt(bad_url, db::now()).is_err());

        let mut dup = career_gpt();
        dup.prompt_fields[1].label = "Role".into();
        assert!(store.create_gpt(dup, db::now()).is_err());

        let mut empty_select = career_gpt();
        empty_select.prompt_fields[2].options.clear();
        assert!(store.create_gpt(empty_select, db::now()).is_err());
        assert_eq!(store.count_rows("custom_gpts").unwrap(), 0);
    }

    #[test]
    fn update_and_delete() {
        let mut store = Store::open_in_memory().unwrap();
        let gpt = store.create_gpt(career_gpt(), db::now()).unwrap();
        let mut edit = career_gpt();
        edit.name = "Career GPT v2".into();
        edit.prompt_fields.truncate(1);
        let updated = store.update_gpt(gpt.id, edit, db::now()).unwrap();
        assert_eq!(updated.name, "Career GPT v2");
        assert_eq!(updated.prompt_fields.len(), 1);

        store.delete_gpt(gpt.id).unwrap();
        assert!(matches!(store.load_gpt(gpt.id), Err(CoachError::GptNotFound(_))));
        assert!(store.delete_gpt(gpt.id).is_err());
        assert!(store.update_gpt(gpt.id, career_gpt(), db::now()).is_err());
    }

    #[test]
    fn list_is_newest_first() {
        let mut store = Store::open_in_memory().unwrap();
        let a = store.create_gpt(career_gpt(), db::now()).unwrap();
        let b = store.create_gpt(career_gpt(), db::now()).unwrap();
        let ids: Vec<_> = store.list_gpts().unwrap().iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }
}
