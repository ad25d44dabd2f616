use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::Store;
use crate::error::{CoachError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub preferences: Option<String>,
    pub goals: Option<String>,
    pub tags: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a user may set on their own profile. `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileInput {
    #[serde(default)]
    pub preferences: Option<String>,
    #[serde(default)]
    pub goals: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
}

impl Profile {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            preferences: row.get("preferences")?,
            goals: row.get("goals")?,
            tags: row.get("tags")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

impl Store {
    pub fn get_profile(&self, user_id: i64) -> Result<Option<Profile>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, user_id, preferences, goals, tags, created_at, updated_at
                 FROM profiles WHERE user_id = ?1",
                params![user_id],
                Profile::from_row,
            )
            .optional()?)
    }

    /// Insert or merge the user's single profile row.
    pub fn upsert_profile(
        &mut self,
        user_id: i64,
        input: ProfileInput,
        now: DateTime<Utc>,
    ) -> Result<Profile> {
        self.conn.execute(
            "INSERT INTO profiles (user_id, preferences, goals, tags, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(user_id) DO UPDATE SET
               preferences = COALESCE(excluded.preferences, profiles.preferences),
               goals = COALESCE(excluded.goals, profiles.goals),
               tags = COALESCE(excluded.tags, profiles.tags),
               updated_at = excluded.updated_at",
            params![user_id, input.preferences, input.goals, input.tags, now],
        )?;
        let profile = self.get_profile(user_id)?;
        profile.ok_or_else(|| CoachError::UserNotFound(user_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn missing_profile_is_none() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.get_profile(4).unwrap().is_none());
    }

    #[test]
    fn upsert_merges_fields_into_one_row() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .upsert_profile(
                4,
                ProfileInput {
                    goals: Some("Run a marathon".into()),
                    tags: Some("fitness".into()),
                    ..Default::default()
                },
                db::now(),
            )
            .unwrap();
        let p = store
            .upsert_profile(
                4,
                ProfileInput {
                    tags: Some("fitness,nutrition".into()),
                    ..Default::default()
                },
                db::now(),
            )
            .unwrap();
        assert_eq!(p.goals.as_deref(), Some("Run a marathon"));
        assert_eq!(p.tags.as_deref(), Some("fitness,nutrition"));
        assert!(p.preferences.is_none());
        assert_eq!(store.count_rows("profiles").unwrap(), 1);
    }
}
