pub mod analytics;
pub mod assessment;
pub mod auth;
pub mod coach;
pub mod commerce;
pub mod config;
pub mod db;
pub mod enrollment;
pub mod error;
pub mod gpt;
pub mod io;
pub mod paths;
pub mod profile;
pub mod program;
pub mod progress;
pub mod project;
pub mod recommendation;
pub mod schema;
pub mod seo;
pub mod session;
pub mod settings;
pub mod types;
pub mod user;

pub use db::Store;
pub use error::{CoachError, Result};
