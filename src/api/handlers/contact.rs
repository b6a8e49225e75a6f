use axum::{extract::State, http::StatusCode, Json};

use crate::{
    api::{extract::AppJson, state::AppState},
    domain::{ContactRequest, CreateContactRequest},
    error::Result,
};

pub async fn submit(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateContactRequest>,
) -> Result<(StatusCode, Json<ContactRequest>)> {
    let contact = state.service_context.contact_service.submit(request).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ContactRequest>>> {
    let requests = state.service_context.contact_service.list().await?;
    Ok(Json(requests))
}
