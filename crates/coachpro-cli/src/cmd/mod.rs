pub mod analytics;
pub mod coach;
pub mod init;
pub mod product;
pub mod program;
pub mod serve;
pub mod settings;
pub mod uninstall;
pub mod user;

use anyhow::Context;
use coachpro_core::config::Config;
use coachpro_core::Store;
use std::path::Path;

/// Load the config and open the database of an initialized project.
pub fn open(root: &Path) -> anyhow::Result<(Config, Store)> {
    coachpro_core::project::open(root)
        .with_context(|| format!("cannot open CoachPro project at {}", root.display()))
}
