use crate::error::{AppError, Result};

/// Allowed image extensions
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// An uploaded image that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedImage {
    pub filename: String,
    pub mime_type: String,
}

fn mime_for(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        _ => "image/webp",
    }
}

/// Check an uploaded image against the size limit and extension list.
/// Any client-side directory part is dropped from the stored name.
pub fn accept_image(filename: &str, data: &[u8], max_file_size: usize) -> Result<AcceptedImage> {
    if data.is_empty() {
        return Err(AppError::Validation("paymentImage file is required.".to_string()));
    }

    if data.len() > max_file_size {
        return Err(AppError::Validation(format!(
            "File too large (max {} MB)",
            max_file_size / (1024 * 1024)
        )));
    }

    let filename = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .ok_or_else(|| AppError::Validation("Invalid filename".to_string()))?;

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::Validation(format!(
            "Invalid file type. Allowed: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    Ok(AcceptedImage {
        filename: filename.to_string(),
        mime_type: mime_for(&extension).to_string(),
    })
}
