use std::sync::Arc;

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::{PaymentProofRepository, UserRepository},
    uploads,
};

/// Raw multipart fields of a payment-proof upload.
#[derive(Debug, Clone, Default)]
pub struct PaymentUpload {
    pub file: Option<UploadedFile>,
    pub user_id: Option<String>,
    pub amount: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

pub struct PaymentProofService {
    proof_repo: Arc<dyn PaymentProofRepository>,
    user_repo: Arc<dyn UserRepository>,
    max_file_size: usize,
}

/// Optional numeric user id from a form field or query string.
pub fn parse_user_filter(raw: Option<&str>) -> Result<Option<i64>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| AppError::Validation("userId must be a number.".to_string())),
        None => Ok(None),
    }
}

impl PaymentProofService {
    pub fn new(
        proof_repo: Arc<dyn PaymentProofRepository>,
        user_repo: Arc<dyn UserRepository>,
        max_file_size: usize,
    ) -> Self {
        Self {
            proof_repo,
            user_repo,
            max_file_size,
        }
    }

    pub async fn upload(&self, upload: PaymentUpload) -> Result<PaymentProof> {
        let file = upload
            .file
            .ok_or_else(|| AppError::Validation("paymentImage file is required.".to_string()))?;

        let user_id = parse_user_filter(upload.user_id.as_deref())?;

        let amount = upload
            .amount
            .as_deref()
            .map(str::trim)
            .and_then(|raw| raw.parse::<f64>().ok())
            .filter(|amount| amount.is_finite())
            .ok_or_else(|| AppError::Validation("amount must be a number.".to_string()))?;

        if let Some(user_id) = user_id {
            self.user_repo
                .find_by_id(user_id)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;
        }

        let image = uploads::accept_image(&file.filename, &file.data, self.max_file_size)?;

        let proof = self.proof_repo.create(NewPaymentProof {
            user_id,
            amount,
            note: upload.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            filename: image.filename,
            mime_type: image.mime_type,
            image_data: file.data,
        }).await?;

        tracing::info!(
            "Payment proof {} uploaded (user {:?}, amount {})",
            proof.id,
            user_id,
            amount
        );
        Ok(proof)
    }

    pub async fn list(&self, user_id: Option<i64>) -> Result<Vec<PaymentProof>> {
        self.proof_repo.list(user_id).await
    }

    pub async fn image(&self, id: i64) -> Result<PaymentImage> {
        self.proof_repo
            .find_image(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment proof not found.".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_filter_parsing() {
        assert_eq!(parse_user_filter(None).unwrap(), None);
        assert_eq!(parse_user_filter(Some("")).unwrap(), None);
        assert_eq!(parse_user_filter(Some(" 12 ")).unwrap(), Some(12));

        let err = parse_user_filter(Some("invalid")).unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m.contains("must be a number")));
    }
}
