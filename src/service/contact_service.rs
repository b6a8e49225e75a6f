use std::sync::Arc;

use validator::Validate;

use crate::{
    domain::*,
    email::Mailer,
    error::{AppError, Result},
    repository::ContactRepository,
};

pub struct ContactService {
    repo: Arc<dyn ContactRepository>,
    mailer: Option<Arc<dyn Mailer>>,
    admin_address: Option<String>,
}

impl ContactService {
    pub fn new(
        repo: Arc<dyn ContactRepository>,
        mailer: Option<Arc<dyn Mailer>>,
        admin_address: Option<String>,
    ) -> Self {
        Self {
            repo,
            mailer,
            admin_address,
        }
    }

    pub async fn submit(&self, request: CreateContactRequest) -> Result<ContactRequest> {
        let field = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let (Some(name), Some(email), Some(phone_number), Some(subject), Some(message)) = (
            field(request.name),
            field(request.email),
            field(request.phone_number),
            field(request.subject),
            field(request.message),
        ) else {
            return Err(AppError::Validation(
                "name, email, phoneNumber, subject and message are required.".to_string(),
            ));
        };

        let new_request = NewContactRequest {
            name,
            email,
            phone_number,
            subject,
            message,
        };
        if let Err(errors) = new_request.validate() {
            if errors.field_errors().contains_key("email") {
                return Err(AppError::Validation(
                    "email must be a valid email address.".to_string(),
                ));
            }
            return Err(AppError::Validation(format!("Invalid contact request: {}", errors)));
        }

        let contact = self.repo.create(new_request).await?;
        tracing::info!("Contact request {} received", contact.id);

        self.notify(&contact).await;
        Ok(contact)
    }

    /// Best effort: a mail failure never fails the submission.
    async fn notify(&self, contact: &ContactRequest) {
        let (Some(mailer), Some(to)) = (self.mailer.as_ref(), self.admin_address.as_deref()) else {
            return;
        };

        let body = format!(
            "From: {} <{}>\nPhone: {}\n\n{}",
            contact.name, contact.email, contact.phone_number, contact.message
        );
        let subject = format!("[Contact] {}", contact.subject);

        if let Err(e) = mailer.send(to, &subject, &body).await {
            tracing::warn!("Failed to send contact notification {}: {}", contact.id, e);
        }
    }

    pub async fn list(&self) -> Result<Vec<ContactRequest>> {
        self.repo.list().await
    }
}
