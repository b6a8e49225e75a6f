use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::{
    api::{extract::AppJson, state::AppState},
    error::Result,
    payments::Plan,
    service::membership_service::{CheckoutBody, CheckoutResponse, VerifyResponse, WebhookFailure},
};

#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    session_id: Option<String>,
}

pub async fn checkout(
    State(state): State<AppState>,
    AppJson(body): AppJson<CheckoutBody>,
) -> Result<Json<CheckoutResponse>> {
    let session = state.service_context.membership_service.checkout(body).await?;
    Ok(Json(session))
}

/// Signature failures answer in plain text, which is what the payment
/// provider's dashboard displays.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: String,
) -> Response {
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    match state
        .service_context
        .membership_service
        .handle_webhook(&payload, signature)
        .await
    {
        Ok(()) => Json(serde_json::json!({ "received": true })).into_response(),
        Err(WebhookFailure::Rejected(rejection)) => (
            StatusCode::BAD_REQUEST,
            format!("Webhook Error: {}", rejection.0),
        )
            .into_response(),
        Err(WebhookFailure::Failed(err)) => err.into_response(),
    }
}

pub async fn verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Result<Json<VerifyResponse>> {
    let result = state
        .service_context
        .membership_service
        .verify(params.session_id)
        .await?;
    Ok(Json(result))
}

pub async fn plans(State(state): State<AppState>) -> Json<Vec<Plan>> {
    Json(state.service_context.membership_service.plans().to_vec())
}
