use crate::error::{CoachError, Result};
use crate::paths;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// SiteConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    /// Public base URL used to build program and coach permalinks.
    #[serde(default = "default_site_url")]
    pub url: String,
}

fn default_site_url() -> String {
    "http://localhost:3141".to_string()
}

impl SiteConfig {
    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3141
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// AuthConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for auth tokens and nonces. Base64 text; treated as opaque bytes.
    pub secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u32,
    #[serde(default = "default_nonce_lifetime_secs")]
    pub nonce_lifetime_secs: u64,
}

fn default_token_ttl_hours() -> u32 {
    14 * 24
}

fn default_nonce_lifetime_secs() -> u64 {
    24 * 60 * 60
}

impl AuthConfig {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            secret: STANDARD.encode(bytes),
            token_ttl_hours: default_token_ttl_hours(),
            nonce_lifetime_secs: default_nonce_lifetime_secs(),
        }
    }

    pub fn key(&self) -> &[u8] {
        self.secret.as_bytes()
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.token_ttl_hours))
    }
}

// ---------------------------------------------------------------------------
// CommerceConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CommerceConfig {
    /// Shared secret of the store's order webhook. Unset means every delivery is rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,
}

// ---------------------------------------------------------------------------
// DatabaseConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(paths::DEFAULT_DB_FILE)
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub site: SiteConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub commerce: CommerceConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(site_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            site: SiteConfig {
                name: site_name.into(),
                url: default_site_url(),
            },
            server: ServerConfig::default(),
            auth: AuthConfig::generate(),
            commerce: CommerceConfig::default(),
            database: DatabaseConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(CoachError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn database_path(&self, root: &Path) -> PathBuf {
        paths::database_path(root, &self.database.path)
    }

    /// Sanity-check values that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.auth.secret.trim().len() < 16 {
            return Err(CoachError::InvalidInput(
                "auth.secret must be at least 16 characters".into(),
            ));
        }
        if self.auth.nonce_lifetime_secs < 2 {
            return Err(CoachError::InvalidInput(
                "auth.nonce_lifetime_secs must be at least 2".into(),
            ));
        }
        if !(self.site.url.starts_with("http://") || self.site.url.starts_with("https://")) {
            return Err(CoachError::InvalidInput(format!(
                "site.url must be an http(s) URL, got '{}'",
                self.site.url
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("Acme Coaching");
        cfg.commerce.webhook_secret = Some("whsec".into());
        cfg.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.site.name, "Acme Coaching");
        assert_eq!(loaded.auth.secret, cfg.auth.secret);
        assert_eq!(loaded.commerce.webhook_secret.as_deref(), Some("whsec"));
        assert_eq!(loaded.server.port, 3141);
    }

    #[test]
    fn load_missing_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(CoachError::NotInitialized)
        ));
    }

    #[test]
    fn minimal_yaml_fills_defaults() {
        let yaml = "site:\n  name: Mini\nauth:\n  secret: 0123456789abcdef0123\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.site.url, "http://localhost:3141");
        assert_eq!(cfg.auth.token_ttl_hours, 336);
        assert_eq!(cfg.auth.nonce_lifetime_secs, 86_400);
        assert_eq!(cfg.database.path, PathBuf::from(".coachpro/coachpro.db"));
        assert!(cfg.commerce.webhook_secret.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn generated_secrets_differ() {
        assert_ne!(AuthConfig::generate().secret, AuthConfig::generate().secret);
    }

    #[test]
    fn short_secret_fails_validation() {
        let mut cfg = Config::new("x");
        cfg.auth.secret = "short".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn base_url_strips_trailing_slash() {
        let mut cfg = Config::new("x");
        cfg.site.url = "https://coach.example.com/".into();
        assert_eq!(cfg.site.base_url(), "https://coach.example.com");
    }
}
