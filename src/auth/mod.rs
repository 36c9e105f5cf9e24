use crate::state::AppState;
use axum::Router;

mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod jwt;
pub(crate) mod password;
pub mod services;

pub(crate) use dto::MessageResponse;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
