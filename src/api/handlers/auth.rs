use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    api::{extract::AppJson, middleware::auth::CurrentUser, state::AppState},
    domain::*,
    error::Result,
    service::user_service::ResetTokenStatus,
};

use super::message;

pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let response = state.service_context.user_service.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let response = state.service_context.user_service.login(request).await?;
    Ok(Json(response))
}

/// Tokens are stateless, so there is nothing to revoke server-side.
pub async fn logout() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Logged out successfully."
    }))
}

pub async fn reissue_token(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<AuthResponse>> {
    let response = state.service_context.user_service.reissue(&current.claims).await?;
    Ok(Json(response))
}

pub async fn request_password_reset(
    State(state): State<AppState>,
    AppJson(request): AppJson<PasswordResetRequest>,
) -> Result<Json<Value>> {
    state.service_context.user_service.request_password_reset(request).await?;
    Ok(message("Password reset email sent."))
}

pub async fn verify_reset_token(
    State(state): State<AppState>,
    AppJson(request): AppJson<VerifyResetTokenRequest>,
) -> Result<Json<ResetTokenStatus>> {
    let status = state.service_context.user_service.verify_reset_token(request).await?;
    Ok(Json(status))
}

pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(request): AppJson<ResetPasswordRequest>,
) -> Result<Json<Value>> {
    state.service_context.user_service.reset_password(request).await?;
    Ok(message("Password has been reset successfully."))
}
