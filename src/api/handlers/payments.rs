use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection}, Multipart, Path, Query, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::{
    api::{extract::parse_id, state::AppState},
    domain::PaymentProof,
    error::{AppError, Result},
    service::payment_proof_service::{parse_user_filter, PaymentUpload, UploadedFile},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    user_id: Option<String>,
}

fn bad_form(err: MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart form: {}", err))
}

/// A body that is not multipart at all cannot carry the image.
fn not_multipart(rejection: MultipartRejection) -> AppError {
    tracing::debug!("Payment upload without a multipart body: {}", rejection.body_text());
    AppError::Validation("paymentImage file is required.".to_string())
}

/// Multipart fields: `paymentImage` (file), `userId`, `amount`, `note`.
pub async fn upload(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<PaymentProof>)> {
    let mut multipart = multipart.map_err(not_multipart)?;
    let mut upload = PaymentUpload::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "paymentImage" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(bad_form)?;
                upload.file = Some(UploadedFile {
                    filename,
                    data: data.to_vec(),
                });
            }
            "userId" => upload.user_id = Some(field.text().await.map_err(bad_form)?),
            "amount" => upload.amount = Some(field.text().await.map_err(bad_form)?),
            "note" => upload.note = Some(field.text().await.map_err(bad_form)?),
            other => tracing::debug!("Ignoring unexpected form field {}", other),
        }
    }

    let proof = state.service_context.payment_proof_service.upload(upload).await?;
    Ok((StatusCode::CREATED, Json(proof)))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<PaymentProof>>> {
    let user_id = parse_user_filter(params.user_id.as_deref())?;
    let proofs = state.service_context.payment_proof_service.list(user_id).await?;
    Ok(Json(proofs))
}

pub async fn list_all(State(state): State<AppState>) -> Result<Json<Vec<PaymentProof>>> {
    let proofs = state.service_context.payment_proof_service.list(None).await?;
    Ok(Json(proofs))
}

pub async fn image(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<impl IntoResponse> {
    let payment_id = parse_id(&payment_id, "paymentId")?;
    let image = state.service_context.payment_proof_service.image(payment_id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, image.mime_type),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", image.filename.replace('"', "")),
            ),
        ],
        image.data,
    ))
}
