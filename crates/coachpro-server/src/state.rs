use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use coachpro_core::config::Config;
use coachpro_core::error::CoachError;
use coachpro_core::Store;

use crate::error::AppError;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub config: Arc<Config>,
    pub store: Arc<Mutex<Store>>,
}

impl AppState {
    pub fn new(root: PathBuf, config: Config, store: Store) -> Self {
        Self {
            root,
            config: Arc::new(config),
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Load config and open the database of the project at `root`.
    pub fn open(root: PathBuf) -> coachpro_core::Result<Self> {
        let (config, store) = coachpro_core::project::open(&root)?;
        Ok(Self::new(root, config, store))
    }

    pub fn key(&self) -> &[u8] {
        self.config.auth.key()
    }

    /// Run `f` against the store on the blocking pool.
    pub async fn with_store<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Store) -> coachpro_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = store.lock().map_err(|_| CoachError::StorePoisoned)?;
            f(&mut guard)
        })
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))?
        .map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn with_store_runs_on_blocking_pool() {
        let state = AppState::new(
            PathBuf::from("/tmp/test"),
            Config::new("Test"),
            Store::open_in_memory().unwrap(),
        );
        let currency = state
            .with_store(|s| Ok(s.load_settings()?.currency))
            .await
            .unwrap();
        assert_eq!(currency, "USD");
        assert_eq!(state.root, PathBuf::from("/tmp/test"));
    }
}
