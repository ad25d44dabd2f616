use crate::error::{CoachError, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const COACHPRO_DIR: &str = ".coachpro";
pub const CONFIG_FILE: &str = ".coachpro/config.yaml";
pub const DEFAULT_DB_FILE: &str = ".coachpro/coachpro.db";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn coachpro_dir(root: &Path) -> PathBuf {
    root.join(COACHPRO_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve a configured database path against the project root.
/// Absolute paths are returned untouched.
pub fn database_path(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}

// ---------------------------------------------------------------------------
// Slug validation
// ---------------------------------------------------------------------------

fn slug_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("valid regex"))
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 200 || !slug_regex().is_match(slug) {
        return Err(CoachError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

/// Derive a slug from a free-text title ("Career Coaching 101" → "career-coaching-101").
pub fn slugify(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Slug for a title, or `<prefix>-<hash>` when the title has no ASCII
/// letters or digits to build one from.
pub fn slug_for(title: &str, prefix: &str) -> String {
    let slug = slugify(title);
    if !slug.is_empty() {
        return slug;
    }
    let digest = Sha256::digest(title.trim().as_bytes());
    let hash: String = digest[..4].iter().map(|b| format!("{b:02x}")).collect();
    format!("{prefix}-{hash}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_slugs() {
        assert!(validate_slug("career-coaching").is_ok());
        assert!(validate_slug("a1").is_ok());
    }

    #[test]
    fn invalid_slugs() {
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Career").is_err());
        assert!(validate_slug("-lead").is_err());
        assert!(validate_slug("double--dash").is_err());
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Career Coaching 101"), "career-coaching-101");
        assert_eq!(slugify("  Lead & Grow!  "), "lead-grow");
    }

    #[test]
    fn slug_for_non_latin_title_falls_back_to_hash() {
        let a = slug_for("کوچنگ پروگرام", "program");
        let b = slug_for("ذہنی صحت", "program");
        assert!(a.starts_with("program-"));
        assert_eq!(a.len(), "program-".len() + 8);
        assert!(validate_slug(&a).is_ok());
        assert_ne!(a, b);
        assert_eq!(a, slug_for("کوچنگ پروگرام", "program"));
        assert_eq!(slug_for("Lead & Grow", "program"), "lead-grow");
    }

    #[test]
    fn relative_database_path_joins_root() {
        let p = database_path(Path::new("/srv/site"), Path::new(DEFAULT_DB_FILE));
        assert_eq!(p, PathBuf::from("/srv/site/.coachpro/coachpro.db"));
        let abs = database_path(Path::new("/srv/site"), Path::new("/var/db/c.db"));
        assert_eq!(abs, PathBuf::from("/var/db/c.db"));
    }
}
