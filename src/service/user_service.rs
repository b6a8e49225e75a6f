use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use validator::Validate;

use crate::{
    auth::{self, Claims, TokenService, MIN_PASSWORD_LENGTH},
    domain::*,
    email::Mailer,
    error::{AppError, Result},
    repository::UserRepository,
};

/// Outcome of checking a password-reset token.
#[derive(Debug, Clone, Serialize)]
pub struct ResetTokenStatus {
    pub valid: bool,
    pub email: String,
}

pub struct UserService {
    repo: Arc<dyn UserRepository>,
    tokens: TokenService,
    mailer: Option<Arc<dyn Mailer>>,
    frontend_url: String,
    reset_token_ttl: Duration,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password.".to_string())
}

impl UserService {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        tokens: TokenService,
        mailer: Option<Arc<dyn Mailer>>,
        frontend_url: String,
        reset_token_ttl_minutes: i64,
    ) -> Self {
        Self {
            repo,
            tokens,
            mailer,
            frontend_url,
            reset_token_ttl: Duration::minutes(reset_token_ttl_minutes),
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    fn respond(&self, user: User) -> Result<AuthResponse> {
        Ok(AuthResponse {
            token: self.tokens.issue(&user)?,
            user,
        })
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse> {
        let email = present(request.email);
        let (Some(email), Some(password)) = (email, present(request.password)) else {
            return Err(AppError::Validation(
                "email and password are required.".to_string(),
            ));
        };

        let registration = NewRegistration {
            email: email.trim().to_lowercase(),
            password,
        };
        if let Err(errors) = registration.validate() {
            let fields = errors.field_errors();
            if fields.contains_key("email") {
                return Err(AppError::Validation(
                    "email must be a valid email address.".to_string(),
                ));
            }
            return Err(AppError::Validation(format!(
                "password must be at least {} characters.",
                MIN_PASSWORD_LENGTH
            )));
        }

        if self.repo.find_by_email(&registration.email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered.".to_string()));
        }

        let user = self.repo.create(CreateUserRequest {
            email: registration.email,
            password_hash: auth::hash_password(&registration.password)?,
            name: present(request.name).map(|n| n.trim().to_string()),
            role: Role::User,
        }).await?;

        tracing::info!("Registered user {} ({})", user.id, user.email);
        self.respond(user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse> {
        let email = present(request.email);
        let (Some(email), Some(password)) = (email, present(request.password)) else {
            return Err(AppError::Validation(
                "email and password are required.".to_string(),
            ));
        };

        let user = self
            .repo
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(invalid_credentials)?;
        let hash = self
            .repo
            .get_password_hash(user.id)
            .await?
            .ok_or_else(invalid_credentials)?;

        if !auth::verify_password(&password, &hash)? {
            tracing::debug!("Failed login for {}", user.email);
            return Err(invalid_credentials());
        }

        self.respond(user)
    }

    /// New token carrying the role currently stored for the caller.
    pub async fn reissue(&self, claims: &Claims) -> Result<AuthResponse> {
        let user = self.get(claims.id).await?;
        self.respond(user)
    }

    pub async fn request_password_reset(&self, request: PasswordResetRequest) -> Result<()> {
        let email = present(request.email)
            .ok_or_else(|| AppError::Validation("email is required.".to_string()))?;

        let user = self
            .repo
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        let mailer = self
            .mailer
            .as_ref()
            .ok_or_else(|| {
                AppError::NotConfigured("Email service is not configured.".to_string())
            })?;

        let reset = auth::generate_reset_token();
        let expires_at = Utc::now() + self.reset_token_ttl;
        self.repo.set_reset_token(user.id, &reset.digest, expires_at).await?;

        let link = format!(
            "{}/resetpass?token={}",
            self.frontend_url.trim_end_matches('/'),
            reset.token
        );
        let body = format!(
            "A password reset was requested for your Fitmat account.\n\n\
             Open the link below to choose a new password. It expires in {} minutes.\n\n{}\n\n\
             If you did not ask for this, you can ignore this email.",
            self.reset_token_ttl.num_minutes(),
            link
        );
        mailer.send(&user.email, "Reset your Fitmat password", &body).await?;

        tracing::info!("Password reset requested for user {}", user.id);
        Ok(())
    }

    pub async fn verify_reset_token(
        &self,
        request: VerifyResetTokenRequest,
    ) -> Result<ResetTokenStatus> {
        let token = present(request.reset_token)
            .ok_or_else(|| AppError::Validation("resetToken is required.".to_string()))?;

        let (user, expires_at) = self
            .repo
            .find_by_reset_token(&auth::digest_token(token.trim()))
            .await?
            .ok_or_else(|| AppError::Validation("Invalid reset token.".to_string()))?;

        if expires_at < Utc::now() {
            return Err(AppError::Validation("Reset token has expired.".to_string()));
        }

        Ok(ResetTokenStatus {
            valid: true,
            email: user.email,
        })
    }

    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<()> {
        let token = present(request.reset_token);
        let (Some(token), Some(new_password)) = (token, present(request.new_password)) else {
            return Err(AppError::Validation(
                "resetToken and newPassword are required.".to_string(),
            ));
        };

        if new_password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "New password must be at least {} characters.",
                MIN_PASSWORD_LENGTH
            )));
        }

        let invalid = || AppError::Validation("Invalid or expired reset token.".to_string());
        let (user, expires_at) = self
            .repo
            .find_by_reset_token(&auth::digest_token(token.trim()))
            .await?
            .ok_or_else(invalid)?;
        if expires_at < Utc::now() {
            return Err(invalid());
        }

        self.repo.update_password(user.id, &auth::hash_password(&new_password)?).await?;
        self.repo.clear_reset_token(user.id).await?;

        tracing::info!("Password reset completed for user {}", user.id);
        Ok(())
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        request: ChangePasswordRequest,
    ) -> Result<()> {
        let current = present(request.current_password);
        let (Some(current), Some(new_password)) = (current, present(request.new_password)) else {
            return Err(AppError::Validation(
                "currentPassword and newPassword are required.".to_string(),
            ));
        };

        if new_password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "New password must be at least {} characters.",
                MIN_PASSWORD_LENGTH
            )));
        }

        let hash = self
            .repo
            .get_password_hash(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        if !auth::verify_password(&current, &hash)? {
            return Err(AppError::Validation("Current password is incorrect.".to_string()));
        }

        self.repo.update_password(user_id, &auth::hash_password(&new_password)?).await?;
        tracing::info!("User {} changed their password", user_id);
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        self.repo.list().await
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))
    }

    pub fn roles(&self) -> Vec<Role> {
        ALL_ROLES.to_vec()
    }

    pub async fn update_role(&self, id: i64, request: UpdateRoleRequest) -> Result<User> {
        let raw = present(request.role)
            .ok_or_else(|| AppError::Validation("role is required.".to_string()))?;
        let role = raw.trim().parse::<Role>().map_err(|_| {
            let known = ALL_ROLES.iter().map(Role::as_str).collect::<Vec<_>>().join(", ");
            AppError::Validation(format!("role must be one of {}.", known))
        })?;

        self.get(id).await?;
        let user = self.repo.update_role(id, role).await?;
        tracing::info!("User {} role set to {}", id, role);
        Ok(user)
    }
}
