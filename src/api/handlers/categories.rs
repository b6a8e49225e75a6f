use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::{
    api::{
        extract::{parse_id, AppJson},
        state::AppState,
    },
    domain::*,
    error::Result,
};

use super::message;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<CategoryWithUsage>>> {
    let categories = state.service_context.category_service.list().await?;
    Ok(Json(categories))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClassCategory>> {
    let id = parse_id(&id, "id")?;
    let category = state.service_context.category_service.get(id).await?;
    Ok(Json(category))
}

pub async fn create(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ClassCategory>)> {
    let category = state.service_context.category_service.create(request).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(request): AppJson<UpdateCategoryRequest>,
) -> Result<Json<ClassCategory>> {
    let id = parse_id(&id, "id")?;
    let category = state.service_context.category_service.update(id, request).await?;
    Ok(Json(category))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let id = parse_id(&id, "id")?;
    state.service_context.category_service.delete(id).await?;
    Ok(message("Category deleted successfully."))
}
