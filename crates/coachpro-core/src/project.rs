//! Project lifecycle: create, open and purge a `.coachpro/` directory.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::db::Store;
use crate::error::{CoachError, Result};
use crate::paths;

/// Walk up from `start` looking for a directory that contains `.coachpro/`.
pub fn find_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| paths::coachpro_dir(dir).is_dir())
        .map(Path::to_path_buf)
}

/// Write a fresh config and create the database. An existing config is kept
/// unless `force` is set.
pub fn init(root: &Path, site_name: &str, force: bool) -> Result<Config> {
    crate::io::ensure_dir(&paths::coachpro_dir(root))?;
    let config = match Config::load(root) {
        Ok(existing) if !force => existing,
        Ok(_) | Err(CoachError::NotInitialized) => {
            let config = Config::new(site_name);
            config.save(root)?;
            config
        }
        Err(e) => return Err(e),
    };
    Store::open(&config.database_path(root))?;
    tracing::info!(root = %root.display(), "project initialized");
    Ok(config)
}

/// Load config and open the store for an initialized project.
pub fn open(root: &Path) -> Result<(Config, Store)> {
    let config = Config::load(root)?;
    config.validate()?;
    let store = Store::open(&config.database_path(root))?;
    Ok((config, store))
}

/// Drop every table and option, then remove the config file.
pub fn uninstall(root: &Path) -> Result<()> {
    let (config, mut store) = open(root)?;
    store.purge()?;
    drop(store);
    let config_path = paths::config_path(root);
    if config_path.exists() {
        std::fs::remove_file(&config_path)?;
    }
    tracing::info!(db = %config.database_path(root).display(), "coachpro data removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_then_open() {
        let dir = TempDir::new().unwrap();
        let cfg = init(dir.path(), "Acme", false).unwrap();
        assert!(paths::config_path(dir.path()).exists());
        assert!(cfg.database_path(dir.path()).exists());
        let (loaded, store) = open(dir.path()).unwrap();
        assert_eq!(loaded.auth.secret, cfg.auth.secret);
        assert_eq!(store.load_settings().unwrap().currency, "USD");
    }

    #[test]
    fn reinit_keeps_secret_unless_forced() {
        let dir = TempDir::new().unwrap();
        let first = init(dir.path(), "Acme", false).unwrap();
        let again = init(dir.path(), "Other", false).unwrap();
        assert_eq!(first.auth.secret, again.auth.secret);
        let forced = init(dir.path(), "Other", true).unwrap();
        assert_ne!(first.auth.secret, forced.auth.secret);
        assert_eq!(forced.site.name, "Other");
    }

    #[test]
    fn find_root_walks_up() {
        let dir = TempDir::new().unwrap();
        init(dir.path(), "Acme", false).unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_root(&nested).as_deref(), Some(dir.path()));
    }

    #[test]
    fn uninstall_removes_tables_and_config() {
        let dir = TempDir::new().unwrap();
        let cfg = init(dir.path(), "Acme", false).unwrap();
        uninstall(dir.path()).unwrap();
        assert!(!paths::config_path(dir.path()).exists());
        let conn = rusqlite::Connection::open(cfg.database_path(dir.path())).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 0);
    }
}
