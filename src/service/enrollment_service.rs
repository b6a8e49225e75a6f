use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::{ClassRepository, EnrollmentRepository, UserRepository},
};

/// Decides who may join or leave a class.
pub struct EnrollmentService {
    class_repo: Arc<dyn ClassRepository>,
    user_repo: Arc<dyn UserRepository>,
    enrollment_repo: Arc<dyn EnrollmentRepository>,
}

impl EnrollmentService {
    pub fn new(
        class_repo: Arc<dyn ClassRepository>,
        user_repo: Arc<dyn UserRepository>,
        enrollment_repo: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            class_repo,
            user_repo,
            enrollment_repo,
        }
    }

    /// Enroll `user_id` in `class_id`. Checks run in a fixed order and the
    /// first failure wins; nothing is written unless every check passes.
    pub async fn enroll(
        &self,
        user_id: i64,
        class_id: i64,
        now: DateTime<Utc>,
    ) -> Result<EnrollmentDetail> {
        let CountedClass { class, enrollment_count } = self
            .class_repo
            .find_by_id(class_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Class not found.".to_string()))?;

        if class.has_started(now) {
            return Err(AppError::Validation(
                "Cannot enroll: class has started or finished.".to_string(),
            ));
        }

        // The stored role is authoritative; token claims may predate an upgrade.
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        if let Some(required) = class.required_role {
            if !role_satisfies(user.role, required) {
                return Err(AppError::Forbidden(format!(
                    "This class is only available to {} members or higher.",
                    required
                )));
            }
        }

        if let Some(capacity) = class.capacity {
            if enrollment_count >= capacity {
                return Err(class_full());
            }
        }

        if self.enrollment_repo.find(class_id, user_id).await?.is_some() {
            return Err(already_enrolled());
        }

        match self.enrollment_repo.enroll_if_available(class_id, user_id).await? {
            EnrollOutcome::Created(enrollment) => {
                tracing::info!("User {} enrolled in class {}", user_id, class_id);
                Ok(EnrollmentDetail { enrollment, class, user })
            }
            // Lost a race between the checks above and the insert.
            EnrollOutcome::ClassFull => Err(class_full()),
            EnrollOutcome::AlreadyEnrolled => Err(already_enrolled()),
        }
    }

    /// Cancel an enrollment. Unlike enroll this is allowed at any time.
    pub async fn unenroll(&self, user_id: i64, class_id: i64) -> Result<()> {
        if !self.enrollment_repo.delete(class_id, user_id).await? {
            return Err(AppError::NotFound("Enrollment not found.".to_string()));
        }

        tracing::info!("User {} left class {}", user_id, class_id);
        Ok(())
    }
}

fn class_full() -> AppError {
    AppError::Validation("Cannot enroll: class is already full.".to_string())
}

fn already_enrolled() -> AppError {
    AppError::Conflict("You are already enrolled in this class.".to_string())
}
