//! HTTP route handlers.

pub mod api;
pub mod health;
pub mod public;

use axum::Router;

use crate::state::AppState;

/// All routes, without middleware or state.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(api::router())
        .merge(public::router())
}
