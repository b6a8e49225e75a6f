use axum::{
    extract::{Extension, Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde_json::Value;

use crate::{
    api::{
        extract::{parse_id, AppJson},
        middleware::auth::{authenticate, CurrentUser},
        state::AppState,
    },
    domain::*,
    error::{AppError, Result},
};

use super::message;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    let users = state.service_context.user_service.list().await?;
    Ok(Json(users))
}

pub async fn roles(State(state): State<AppState>) -> Json<Vec<Role>> {
    Json(state.service_context.user_service.roles())
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>> {
    let id = parse_id(&id, "id")?;
    let user = state.service_context.user_service.get(id).await?;
    Ok(Json(user))
}

pub async fn classes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EnrollmentWithClass>>> {
    let id = parse_id(&id, "id")?;
    let bookings = state.service_context.class_service.user_classes(id, Utc::now()).await?;
    Ok(Json(bookings))
}

/// Ids are checked before the caller, so a malformed path is a 400 even
/// without a token.
pub async fn cancel_enrollment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, class_id)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let user_id = parse_id(&id, "id")?;
    let class_id = parse_id(&class_id, "classId")?;

    let services = &state.service_context;
    let claims = authenticate(&headers, services.user_service.tokens())?;
    if claims.id != user_id && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "You can only cancel your own enrollments.".to_string(),
        ));
    }

    services.enrollment_service.unenroll(user_id, class_id).await?;
    Ok(message("Enrollment cancelled successfully."))
}

pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(request): AppJson<UpdateRoleRequest>,
) -> Result<Json<User>> {
    let id = parse_id(&id, "id")?;
    let user = state.service_context.user_service.update_role(id, request).await?;
    Ok(Json(user))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppJson(request): AppJson<ChangePasswordRequest>,
) -> Result<Json<Value>> {
    state
        .service_context
        .user_service
        .change_password(current.claims.id, request)
        .await?;
    Ok(message("Password changed successfully."))
}
