//! Referral-code lifecycle and referrer-graph lookups.

mod code;
mod dto;
pub mod handlers;
pub mod query;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::code_routes())
        .merge(handlers::query_routes())
}
