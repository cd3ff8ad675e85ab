//! Bulletin kernel library.
//!
//! Block-based newsletters and blog posts: the content model, its
//! sanitizing renderer, persistence, and the HTTP surface. The `bulletin`
//! binary wires these together into a server.

pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{AppError, AppResult, ContentError, ContentResult};
pub use state::AppState;
