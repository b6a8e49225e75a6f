use axum::extract::{rejection::JsonRejection, FromRequest};

use crate::error::{AppError, Result};

/// `axum::Json` whose rejections come back as ordinary validation errors.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Parse a numeric path segment, naming the parameter in the error.
pub fn parse_id(raw: &str, name: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::Validation(format!("{} must be a valid number.", name)))
}
