use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{self, Store};
use crate::error::{CoachError, Result};
use crate::types::{Capability, Role};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub display_name: String,
    pub email: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn can(&self, cap: Capability) -> bool {
        self.role.has(cap)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let role: String = row.get("role")?;
        let role = role.parse::<Role>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;
        Ok(Self {
            id: row.get("id")?,
            login: row.get("login")?,
            display_name: row.get("display_name")?,
            email: row.get("email")?,
            role,
            created_at: row.get("created_at")?,
        })
    }
}

const USER_COLUMNS: &str = "id, login, display_name, email, role, created_at";

impl Store {
    pub fn create_user(
        &mut self,
        login: &str,
        display_name: &str,
        email: Option<&str>,
        role: Role,
    ) -> Result<User> {
        let login = login.trim();
        if login.is_empty() {
            return Err(CoachError::MissingField("login is required".into()));
        }
        let display_name = match display_name.trim() {
            "" => login,
            name => name,
        };
        let now = db::now();
        self.conn
            .execute(
                "INSERT INTO users (login, display_name, email, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![login, display_name, email, role.as_str(), now],
            )
            .map_err(|e| db::on_unique_violation(e, CoachError::UserExists(login.to_string())))?;
        let id = self.conn.last_insert_rowid();
        self.load_user(id)
    }

    pub fn load_user(&self, id: i64) -> Result<User> {
        self.conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                User::from_row,
            )
            .optional()?
            .ok_or_else(|| CoachError::UserNotFound(id.to_string()))
    }

    pub fn find_user_by_login(&self, login: &str) -> Result<User> {
        self.conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE login = ?1"),
                params![login],
                User::from_row,
            )
            .optional()?
            .ok_or_else(|| CoachError::UserNotFound(login.to_string()))
    }

    pub fn user_exists(&self, id: i64) -> Result<bool> {
        Ok(self
            .conn
            .query_row("SELECT 1 FROM users WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?
            .is_some())
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"))?;
        let rows = stmt.query_map([], User::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn set_user_role(&mut self, login: &str, role: Role) -> Result<User> {
        let changed = self.conn.execute(
            "UPDATE users SET role = ?1 WHERE login = ?2",
            params![role.as_str(), login],
        )?;
        if changed == 0 {
            return Err(CoachError::UserNotFound(login.to_string()));
        }
        self.find_user_by_login(login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_load() {
        let mut store = Store::open_in_memory().unwrap();
        let u = store
            .create_user("amira", "Amira K", Some("amira@example.com"), Role::Student)
            .unwrap();
        assert_eq!(u.login, "amira");
        assert_eq!(store.load_user(u.id).unwrap(), u);
        assert_eq!(store.find_user_by_login("amira").unwrap().id, u.id);
        assert!(store.user_exists(u.id).unwrap());
        assert!(!store.user_exists(u.id + 1).unwrap());
    }

    #[test]
    fn duplicate_login_conflicts() {
        let mut store = Store::open_in_memory().unwrap();
        store.create_user("sam", "", None, Role::Coach).unwrap();
        let err = store.create_user("sam", "", None, Role::Coach).unwrap_err();
        assert!(matches!(err, CoachError::UserExists(_)));
    }

    #[test]
    fn blank_display_name_falls_back_to_login() {
        let mut store = Store::open_in_memory().unwrap();
        let u = store.create_user("lee", "  ", None, Role::Student).unwrap();
        assert_eq!(u.display_name, "lee");
    }

    #[test]
    fn set_role_changes_capabilities() {
        let mut store = Store::open_in_memory().unwrap();
        store.create_user("jo", "Jo", None, Role::Student).unwrap();
        let u = store.set_user_role("jo", Role::Admin).unwrap();
        assert!(u.can(Capability::Manage));
        assert!(matches!(
            store.set_user_role("nobody", Role::Admin),
            Err(CoachError::UserNotFound(_))
        ));
    }
}
