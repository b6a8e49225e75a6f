use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    api::{extract::parse_id, state::AppState},
    domain::TrainerProfile,
    error::Result,
};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<TrainerProfile>>> {
    let trainers = state.service_context.review_service.trainers().await?;
    Ok(Json(trainers))
}

pub async fn get(
    State(state): State<AppState>,
    Path(trainer_id): Path<String>,
) -> Result<Json<TrainerProfile>> {
    let trainer_id = parse_id(&trainer_id, "trainerId")?;
    let trainer = state.service_context.review_service.trainer(trainer_id).await?;
    Ok(Json(trainer))
}
