//! Site settings stored in the `options` key/value table.

use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::Store;
use crate::error::{CoachError, Result};

pub const OPT_CURRENCY: &str = "cpl_currency";
pub const OPT_PROGRAM_PAGE: &str = "cpl_program_page";
pub const OPT_WOO_ENABLE: &str = "cpl_woo_enable";
pub const OPT_RULES_JSON: &str = "cpl_rules_json";
pub const OPT_VERSION: &str = "coachpro_lms_version";

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Settings {
    pub currency: String,
    pub program_page: String,
    pub woo_enable: bool,
    pub rules_json: String,
    pub version: Option<String>,
}

/// A partial settings change. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub program_page: Option<String>,
    #[serde(default, deserialize_with = "de_flag")]
    pub woo_enable: Option<bool>,
    #[serde(default, deserialize_with = "de_rules")]
    pub rules_json: Option<String>,
}

/// Accept `true`, `1`, `"1"`, `"yes"`, `"on"` and their negatives, as form
/// and JSON clients send them. Anything else is rejected.
fn de_flag<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<bool>, D::Error> {
    use serde::de::Error;

    let v = Option::<serde_json::Value>::deserialize(d)?;
    v.map(|v| match v {
        serde_json::Value::Bool(b) => Ok(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(D::Error::custom(format!("invalid flag value: {n}"))),
        },
        serde_json::Value::String(s) => parse_flag(&s).map_err(D::Error::custom),
        other => Err(D::Error::custom(format!("invalid flag value: {other}"))),
    })
    .transpose()
}

pub fn parse_flag(s: &str) -> Result<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CoachError::InvalidInput(format!(
            "invalid flag value '{}': use yes/no, on/off, true/false or 1/0",
            s.trim()
        ))),
    }
}

/// Rules arrive either as a JSON string or as inline JSON.
fn de_rules<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(v.map(|v| match v {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }))
}

impl Store {
    pub fn get_option(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM options WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO options (name, value) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value",
            params![name, value],
        )?;
        Ok(())
    }

    pub fn load_settings(&self) -> Result<Settings> {
        let currency = self
            .get_option(OPT_CURRENCY)?
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        Ok(Settings {
            currency,
            program_page: self.get_option(OPT_PROGRAM_PAGE)?.unwrap_or_default(),
            woo_enable: self
                .get_option(OPT_WOO_ENABLE)?
                .as_deref()
                .is_some_and(|v| parse_flag(v).unwrap_or(false)),
            rules_json: self
                .get_option(OPT_RULES_JSON)?
                .unwrap_or_else(|| "[]".to_string()),
            version: self.get_option(OPT_VERSION)?,
        })
    }

    /// Merge `update` onto the stored settings and write every option in one
    /// transaction. Malformed rules JSON aborts before anything is written.
    pub fn apply_settings(&mut self, update: SettingsUpdate) -> Result<Settings> {
        let mut next = self.load_settings()?;
        if let Some(currency) = update.currency {
            let currency = currency.trim();
            next.currency = if currency.is_empty() {
                DEFAULT_CURRENCY.to_string()
            } else {
                currency.to_string()
            };
        }
        if let Some(page) = update.program_page {
            next.program_page = page.trim().to_string();
        }
        if let Some(flag) = update.woo_enable {
            next.woo_enable = flag;
        }
        if let Some(rules) = update.rules_json {
            serde_json::from_str::<serde_json::Value>(&rules)
                .map_err(|e| CoachError::InvalidRulesJson(e.to_string()))?;
            next.rules_json = rules;
        }

        let tx = self.conn.transaction()?;
        for (name, value) in [
            (OPT_CURRENCY, next.currency.as_str()),
            (OPT_PROGRAM_PAGE, next.program_page.as_str()),
            (OPT_WOO_ENABLE, if next.woo_enable { "1" } else { "0" }),
            (OPT_RULES_JSON, next.rules_json.as_str()),
        ] {
            tx.execute(
                "INSERT INTO options (name, value) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET value = excluded.value",
                params![name, value],
            )?;
        }
        tx.commit()?;
        tracing::info!(currency = %next.currency, woo_enable = next.woo_enable, "settings saved");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_after_install() {
        let store = Store::open_in_memory().unwrap();
        let s = store.load_settings().unwrap();
        assert_eq!(s.currency, "USD");
        assert_eq!(s.program_page, "");
        assert!(!s.woo_enable);
        assert_eq!(s.rules_json, "[]");
        assert_eq!(s.version.as_deref(), Some(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn partial_update_keeps_other_values() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .apply_settings(SettingsUpdate {
                currency: Some("EUR".into()),
                woo_enable: Some(true),
                ..Default::default()
            })
            .unwrap();
        let s = store
            .apply_settings(SettingsUpdate {
                program_page: Some("/programs".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(s.currency, "EUR");
        assert!(s.woo_enable);
        assert_eq!(store.load_settings().unwrap().program_page, "/programs");
    }

    #[test]
    fn blank_currency_falls_back_to_usd() {
        let mut store = Store::open_in_memory().unwrap();
        let s = store
            .apply_settings(SettingsUpdate {
                currency: Some("   ".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(s.currency, "USD");
    }

    #[test]
    fn invalid_rules_json_writes_nothing() {
        let mut store = Store::open_in_memory().unwrap();
        let err = store
            .apply_settings(SettingsUpdate {
                currency: Some("GBP".into()),
                woo_enable: Some(true),
                rules_json: Some("[{\"when\":".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid rules JSON"));
        let s = store.load_settings().unwrap();
        assert_eq!(s.currency, "USD");
        assert!(!s.woo_enable);
        assert_eq!(s.rules_json, "[]");
    }

    #[test]
    fn update_deserializes_loose_flags_and_inline_rules() {
        let u: SettingsUpdate =
            serde_json::from_str(r#"{"woo_enable":"1","rules_json":[{"when":{}}]}"#).unwrap();
        assert_eq!(u.woo_enable, Some(true));
        assert_eq!(u.rules_json.as_deref(), Some(r#"[{"when":{}}]"#));
        let u: SettingsUpdate = serde_json::from_str(r#"{"woo_enable":0}"#).unwrap();
        assert_eq!(u.woo_enable, Some(false));
    }

    #[test]
    fn unknown_flag_text_is_rejected() {
        assert!(matches!(parse_flag("ture"), Err(CoachError::InvalidInput(_))));
        assert!(!parse_flag(" Off ").unwrap());
        assert!(parse_flag("YES").unwrap());
        assert!(serde_json::from_str::<SettingsUpdate>(r#"{"woo_enable":"garbage"}"#).is_err());
        assert!(serde_json::from_str::<SettingsUpdate>(r#"{"woo_enable":{}}"#).is_err());
        assert!(serde_json::from_str::<SettingsUpdate>(r#"{"woo_enable":7}"#).is_err());
        let u: SettingsUpdate = serde_json::from_str(r#"{"woo_enable":null}"#).unwrap();
        assert_eq!(u.woo_enable, None);
    }
}
