use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    api::{
        extract::{parse_id, AppJson},
        middleware::auth::CurrentUser,
        state::AppState,
    },
    domain::*,
    error::Result,
    service::class_service::{ClassRoster, TrainerClasses},
};

use super::message;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    category_id: Option<String>,
    trainer_id: Option<String>,
}

fn optional_id(raw: Option<&str>, name: &str) -> Result<Option<i64>> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_id(s, name))
        .transpose()
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ClassView>>> {
    let filter = ClassFilter {
        category_id: optional_id(params.category_id.as_deref(), "categoryId")?,
        trainer_id: optional_id(params.trainer_id.as_deref(), "trainerId")?,
    };

    let classes = state.service_context.class_service.list(filter, Utc::now()).await?;
    Ok(Json(classes))
}

pub async fn list_upcoming(State(state): State<AppState>) -> Result<Json<Vec<ClassView>>> {
    let classes = state.service_context.class_service.list_upcoming(Utc::now()).await?;
    Ok(Json(classes))
}

pub async fn get(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<Json<ClassDetail>> {
    let class_id = parse_id(&class_id, "classId")?;
    let class = state.service_context.class_service.get(class_id, Utc::now()).await?;
    Ok(Json(class))
}

pub async fn enrollments(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<Json<ClassRoster>> {
    let class_id = parse_id(&class_id, "classId")?;
    let roster = state.service_context.class_service.enrollments(class_id, Utc::now()).await?;
    Ok(Json(roster))
}

pub async fn trainer_classes(
    State(state): State<AppState>,
    current: Option<Extension<CurrentUser>>,
    Path(trainer_id): Path<String>,
) -> Result<Json<TrainerClasses>> {
    let trainer_id = parse_id(&trainer_id, "trainerId")?;
    let caller = current.as_ref().map(|Extension(user)| &user.claims);

    let classes = state
        .service_context
        .class_service
        .trainer_classes(trainer_id, caller, Utc::now())
        .await?;
    Ok(Json(classes))
}

pub async fn my_classes(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<TrainerClasses>> {
    let classes = state
        .service_context
        .class_service
        .my_classes(&current.claims, Utc::now())
        .await?;
    Ok(Json(classes))
}

pub async fn enroll(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(class_id): Path<String>,
) -> Result<(StatusCode, Json<EnrollmentDetail>)> {
    let class_id = parse_id(&class_id, "classId")?;
    let enrollment = state
        .service_context
        .enrollment_service
        .enroll(current.claims.id, class_id, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

pub async fn unenroll(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(class_id): Path<String>,
) -> Result<Json<Value>> {
    let class_id = parse_id(&class_id, "classId")?;
    state
        .service_context
        .enrollment_service
        .unenroll(current.claims.id, class_id)
        .await?;
    Ok(message("Unenrolled successfully."))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppJson(request): AppJson<CreateClassRequest>,
) -> Result<(StatusCode, Json<ClassView>)> {
    let class = state
        .service_context
        .class_service
        .create(request, current.claims.id, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(class)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
    AppJson(request): AppJson<UpdateClassRequest>,
) -> Result<Json<ClassView>> {
    let class_id = parse_id(&class_id, "classId")?;
    let class = state
        .service_context
        .class_service
        .update(class_id, request, Utc::now())
        .await?;
    Ok(Json(class))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<Json<Value>> {
    let class_id = parse_id(&class_id, "classId")?;
    state.service_context.class_service.delete(class_id).await?;
    Ok(message("Class deleted successfully."))
}
