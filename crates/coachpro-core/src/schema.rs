//! SQLite schema, versioned through `PRAGMA user_version`.
//!
//! Each entry in [`MIGRATIONS`] moves the database from version `i` to `i + 1`.
//! Append new migrations; never edit a shipped one.

pub const MIGRATIONS: &[&str] = &[V1];

pub const SCHEMA_VERSION: i64 = MIGRATIONS.len() as i64;

/// Every table the schema owns, in drop order.
pub const TABLES: &[&str] = &[
    "custom_gpts",
    "options",
    "product_programs",
    "enrollments",
    "assessment_responses",
    "assessments",
    "analytics",
    "recommendations",
    "progress",
    "session_messages",
    "profiles",
    "coaches",
    "programs",
    "users",
];

const V1: &str = r#"
CREATE TABLE IF NOT EXISTS users (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  login TEXT NOT NULL UNIQUE,
  display_name TEXT NOT NULL,
  email TEXT,
  role TEXT NOT NULL,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS programs (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  slug TEXT NOT NULL UNIQUE,
  title TEXT NOT NULL,
  excerpt TEXT NOT NULL DEFAULT '',
  content TEXT NOT NULL DEFAULT '',
  category TEXT,
  price TEXT,
  thumbnail_url TEXT,
  status TEXT NOT NULL DEFAULT 'publish',
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_programs_category ON programs(category);
CREATE INDEX IF NOT EXISTS idx_programs_status ON programs(status);

CREATE TABLE IF NOT EXISTS coaches (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  slug TEXT NOT NULL UNIQUE,
  name TEXT NOT NULL,
  excerpt TEXT NOT NULL DEFAULT '',
  content TEXT NOT NULL DEFAULT '',
  specialty TEXT,
  thumbnail_url TEXT,
  status TEXT NOT NULL DEFAULT 'publish',
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS profiles (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id INTEGER NOT NULL UNIQUE,
  preferences TEXT,
  goals TEXT,
  tags TEXT,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS session_messages (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  student_id INTEGER NOT NULL,
  coach_id INTEGER NOT NULL DEFAULT 0,
  program_id INTEGER NOT NULL,
  message TEXT,
  attachment_url TEXT,
  meta_json TEXT,
  created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_session_messages_student_program
  ON session_messages(student_id, program_id);

CREATE TABLE IF NOT EXISTS progress (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  student_id INTEGER NOT NULL,
  program_id INTEGER NOT NULL,
  lessons_total INTEGER NOT NULL DEFAULT 0,
  lessons_done INTEGER NOT NULL DEFAULT 0,
  avg_score REAL NOT NULL DEFAULT 0,
  last_active TEXT,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL,
  UNIQUE (student_id, program_id)
);

CREATE TABLE IF NOT EXISTS recommendations (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  student_id INTEGER NOT NULL,
  program_id INTEGER NOT NULL,
  rule_json TEXT NOT NULL,
  output_json TEXT NOT NULL,
  created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_recommendations_student_program
  ON recommendations(student_id, program_id);

CREATE TABLE IF NOT EXISTS analytics (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  snapshot_date TEXT NOT NULL,
  program_id INTEGER NOT NULL,
  enrollments INTEGER NOT NULL DEFAULT 0,
  completion_rate REAL NOT NULL DEFAULT 0,
  avg_score REAL NOT NULL DEFAULT 0,
  created_at TEXT NOT NULL,
  UNIQUE (program_id, snapshot_date)
);

CREATE TABLE IF NOT EXISTS assessments (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  program_id INTEGER NOT NULL,
  title TEXT NOT NULL,
  config_json TEXT NOT NULL,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_assessments_program ON assessments(program_id);

CREATE TABLE IF NOT EXISTS assessment_responses (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  assessment_id INTEGER NOT NULL,
  student_id INTEGER NOT NULL,
  answers_json TEXT NOT NULL,
  score REAL NOT NULL DEFAULT 0,
  created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_responses_assessment ON assessment_responses(assessment_id);
CREATE INDEX IF NOT EXISTS idx_responses_student ON assessment_responses(student_id);

CREATE TABLE IF NOT EXISTS enrollments (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  student_id INTEGER NOT NULL,
  program_id INTEGER NOT NULL,
  status TEXT NOT NULL DEFAULT 'enrolled',
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL,
  UNIQUE (student_id, program_id)
);

CREATE TABLE IF NOT EXISTS product_programs (
  product_id INTEGER PRIMARY KEY,
  program_id INTEGER NOT NULL,
  updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS options (
  name TEXT PRIMARY KEY,
  value TEXT NOT NULL
);

INSERT OR IGNORE INTO options (name, value) VALUES
  ('cpl_currency', 'USD'),
  ('cpl_program_page', ''),
  ('cpl_woo_enable', '0'),
  ('cpl_rules_json', '[]');

CREATE TABLE IF NOT EXISTS custom_gpts (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  description TEXT,
  gpt_url TEXT NOT NULL,
  prompt_template TEXT,
  prompt_fields TEXT,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
"#;
