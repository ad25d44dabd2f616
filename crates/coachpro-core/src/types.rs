use crate::error::{CoachError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// The three permission levels every protected operation checks against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    View,
    Edit,
    Manage,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::View => "view_coachpro",
            Capability::Edit => "edit_coachpro",
            Capability::Manage => "manage_coachpro",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    Editor,
    Author,
    Subscriber,
    #[serde(rename = "coachpro_student")]
    Student,
    #[serde(rename = "coachpro_coach")]
    Coach,
    #[serde(rename = "coachpro_admin")]
    Admin,
}

impl Role {
    pub fn all() -> &'static [Role] {
        &[
            Role::Administrator,
            Role::Editor,
            Role::Author,
            Role::Subscriber,
            Role::Student,
            Role::Coach,
            Role::Admin,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Editor => "editor",
            Role::Author => "author",
            Role::Subscriber => "subscriber",
            Role::Student => "coachpro_student",
            Role::Coach => "coachpro_coach",
            Role::Admin => "coachpro_admin",
        }
    }

    pub fn capabilities(self) -> &'static [Capability] {
        use Capability::*;
        match self {
            Role::Administrator | Role::Admin => &[Manage, Edit, View],
            Role::Editor | Role::Coach => &[Edit, View],
            Role::Author => &[View],
            Role::Subscriber | Role::Student => &[],
        }
    }

    pub fn has(self, cap: Capability) -> bool {
        self.capabilities().contains(&cap)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "student" => Ok(Role::Student),
            "coach" => Ok(Role::Coach),
            "admin" => Ok(Role::Admin),
            _ => Role::all()
                .iter()
                .copied()
                .find(|r| r.as_str() == s)
                .ok_or_else(|| CoachError::InvalidRole(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// EnrollmentStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Enrolled,
    Completed,
    Cancelled,
}

impl EnrollmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EnrollmentStatus::Enrolled => "enrolled",
            EnrollmentStatus::Completed => "completed",
            EnrollmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrollmentStatus {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "enrolled" => Ok(EnrollmentStatus::Enrolled),
            "completed" => Ok(EnrollmentStatus::Completed),
            "cancelled" => Ok(EnrollmentStatus::Cancelled),
            other => Err(CoachError::InvalidStatus(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// PublishStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    #[default]
    Publish,
    Draft,
}

impl PublishStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PublishStatus::Publish => "publish",
            PublishStatus::Draft => "draft",
        }
    }
}

impl FromStr for PublishStatus {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "publish" => Ok(PublishStatus::Publish),
            "draft" => Ok(PublishStatus::Draft),
            other => Err(CoachError::InvalidStatus(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Round to the two decimals the score and rate columns carry.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Validate that `value` is a percentage in 0..=100.
pub fn check_percent(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(CoachError::InvalidInput(format!(
            "{field} must be between 0 and 100"
        )));
    }
    Ok(round2(value))
}

/// Accept only absolute http(s) URLs without whitespace.
pub fn is_http_url(s: &str) -> bool {
    let rest = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"));
    matches!(rest, Some(r) if !r.is_empty() && !r.starts_with('/') && !r.chars().any(char::is_whitespace))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_capabilities_match_install_table() {
        assert!(Role::Administrator.has(Capability::Manage));
        assert!(Role::Admin.has(Capability::Manage));
        assert!(Role::Editor.has(Capability::Edit));
        assert!(!Role::Editor.has(Capability::Manage));
        assert!(Role::Coach.has(Capability::Edit));
        assert!(Role::Author.has(Capability::View));
        assert!(!Role::Author.has(Capability::Edit));
        assert!(Role::Student.capabilities().is_empty());
    }

    #[test]
    fn role_parses_full_and_short_names() {
        assert_eq!("coachpro_student".parse::<Role>().unwrap(), Role::Student);
        assert_eq!("student".parse::<Role>().unwrap(), Role::Student);
        assert_eq!("coach".parse::<Role>().unwrap(), Role::Coach);
        assert_eq!("administrator".parse::<Role>().unwrap(), Role::Administrator);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn role_serde_uses_stored_names() {
        let json = serde_json::to_string(&Role::Coach).unwrap();
        assert_eq!(json, "\"coachpro_coach\"");
    }

    #[test]
    fn enrollment_status_round_trips_through_str() {
        for s in ["enrolled", "completed", "cancelled"] {
            assert_eq!(s.parse::<EnrollmentStatus>().unwrap().as_str(), s);
        }
        assert!("paused".parse::<EnrollmentStatus>().is_err());
    }

    #[test]
    fn percent_bounds() {
        assert_eq!(check_percent("avg_score", 87.456).unwrap(), 87.46);
        assert!(check_percent("avg_score", -1.0).is_err());
        assert!(check_percent("avg_score", 100.5).is_err());
        assert!(check_percent("avg_score", f64::NAN).is_err());
    }

    #[test]
    fn http_url_check() {
        assert!(is_http_url("https://chat.openai.com/g/abc"));
        assert!(is_http_url("http://files.example.com/a.pdf"));
        assert!(!is_http_url("ftp://x"));
        assert!(!is_http_url("https://"));
        assert!(!is_http_url("https://a b"));
        assert!(!is_http_url("javascript:alert(1)"));
    }
}
