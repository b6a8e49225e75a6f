use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::{
    api::{
        extract::{parse_id, AppJson},
        middleware::auth::CurrentUser,
        state::AppState,
    },
    domain::*,
    error::Result,
};

use super::message;

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppJson(request): AppJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewView>)> {
    let review = state
        .service_context
        .review_service
        .create(current.claims.id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ReviewView>>> {
    let reviews = state.service_context.review_service.list().await?;
    Ok(Json(reviews))
}

pub async fn summary(State(state): State<AppState>) -> Result<Json<RatingStats>> {
    let stats = state.service_context.review_service.summary().await?;
    Ok(Json(stats))
}

pub async fn for_trainer(
    State(state): State<AppState>,
    Path(trainer_id): Path<String>,
) -> Result<Json<TrainerReviews>> {
    let trainer_id = parse_id(&trainer_id, "trainerId")?;
    let reviews = state.service_context.review_service.for_trainer(trainer_id).await?;
    Ok(Json(reviews))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
) -> Result<Json<Value>> {
    let review_id = parse_id(&review_id, "reviewId")?;
    state.service_context.review_service.delete(review_id).await?;
    Ok(message("Review deleted successfully."))
}
