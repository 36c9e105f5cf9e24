use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{delete, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{CodeByEmailRequest, ReferralCodeResponse, ReferralsRequest, ReferralsResponse};
use crate::{
    auth::{extractors::AuthUser, MessageResponse},
    error::AppError,
    state::AppState,
};

/// Routes that act on the caller's own code; all require a bearer token.
pub fn code_routes() -> Router<AppState> {
    Router::new()
        .route("/create-referral-code", post(create_code))
        .route("/referral-code/delete", delete(delete_code))
}

pub fn query_routes() -> Router<AppState> {
    Router::new()
        .route("/referral-code/email", post(code_by_email))
        .route("/referrals", post(referrals))
}

#[instrument(skip(state))]
pub async fn create_code(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ReferralCodeResponse>, AppError> {
    let referral_code = state.referrals.create_code(user_id).await?;
    Ok(Json(ReferralCodeResponse { referral_code }))
}

#[instrument(skip(state))]
pub async fn delete_code(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MessageResponse>, AppError> {
    state.referrals.delete_code(user_id).await?;
    Ok(Json(MessageResponse {
        message: "referral code deleted successfully",
    }))
}

#[instrument(skip(state, payload))]
pub async fn code_by_email(
    State(state): State<AppState>,
    payload: Result<Json<CodeByEmailRequest>, JsonRejection>,
) -> Result<Json<ReferralCodeResponse>, AppError> {
    let Json(payload) = payload?;
    let referral_code = state.graph.code_by_email(&payload.email).await?;
    Ok(Json(ReferralCodeResponse { referral_code }))
}

#[instrument(skip(state, payload))]
pub async fn referrals(
    State(state): State<AppState>,
    payload: Result<Json<ReferralsRequest>, JsonRejection>,
) -> Result<Json<ReferralsResponse>, AppError> {
    let Json(payload) = payload?;
    let emails = state.graph.referrals_by_referrer(payload.referrer_id).await?;
    Ok(Json(ReferralsResponse { emails }))
}
