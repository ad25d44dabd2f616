use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoachError {
    #[error("not initialized: run 'coachpro init'")]
    NotInitialized,

    #[error("Authentication required.")]
    Unauthenticated,

    #[error("invalid auth token")]
    InvalidToken,

    #[error("auth token expired")]
    TokenExpired,

    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("Invalid security token.")]
    InvalidNonce,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    MissingField(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("invalid rules JSON: {0}")]
    InvalidRulesJson(String),

    #[error("invalid {field} JSON: {reason}")]
    InvalidJsonField { field: String, reason: String },

    #[error("invalid slug '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidSlug(String),

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("user already exists: {0}")]
    UserExists(String),

    #[error("program not found: {0}")]
    ProgramNotFound(String),

    #[error("program already exists: {0}")]
    ProgramExists(String),

    #[error("coach not found: {0}")]
    CoachNotFound(String),

    #[error("coach already exists: {0}")]
    CoachExists(String),

    #[error("enrollment not found: student {student_id}, program {program_id}")]
    EnrollmentNotFound { student_id: i64, program_id: i64 },

    #[error("assessment not found: {0}")]
    AssessmentNotFound(i64),

    #[error("assessment response not found: {0}")]
    ResponseNotFound(i64),

    #[error("custom GPT not found: {0}")]
    GptNotFound(i64),

    #[error("database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },

    #[error("store lock poisoned")]
    StorePoisoned,

    #[error(transparent)]
    Db(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoachError>;
