use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::domain::*;
use crate::error::{AppError, Result};

pub mod user_repository;
pub mod category_repository;
pub mod class_repository;
pub mod enrollment_repository;
pub mod review_repository;
pub mod payment_repository;
pub mod membership_repository;
pub mod contact_repository;

pub use user_repository::SqliteUserRepository;
pub use category_repository::SqliteCategoryRepository;
pub use class_repository::SqliteClassRepository;
pub use enrollment_repository::SqliteEnrollmentRepository;
pub use review_repository::SqliteReviewRepository;
pub use payment_repository::SqlitePaymentProofRepository;
pub use membership_repository::{Fulfillment, SqliteMembershipRepository};
pub use contact_repository::SqliteContactRepository;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: CreateUserRequest) -> Result<User>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list(&self) -> Result<Vec<User>>;
    async fn list_by_role(&self, role: Role) -> Result<Vec<User>>;
    async fn update_role(&self, id: i64, role: Role) -> Result<User>;
    async fn get_password_hash(&self, id: i64) -> Result<Option<String>>;
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()>;
    async fn set_reset_token(
        &self,
        id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;
    async fn find_by_reset_token(&self, token_hash: &str) -> Result<Option<(User, DateTime<Utc>)>>;
    async fn clear_reset_token(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, name: &str, description: Option<&str>) -> Result<ClassCategory>;
    async fn find_by_id(&self, id: i64) -> Result<Option<ClassCategory>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<ClassCategory>>;
    async fn list_with_usage(&self) -> Result<Vec<CategoryWithUsage>>;
    async fn update(&self, id: i64, name: &str, description: Option<&str>) -> Result<ClassCategory>;
    async fn delete(&self, id: i64) -> Result<()>;
    async fn count_classes(&self, id: i64) -> Result<i64>;
}

#[async_trait]
pub trait ClassRepository: Send + Sync {
    async fn create(&self, class: NewClass) -> Result<Class>;
    async fn find_by_id(&self, id: i64) -> Result<Option<CountedClass>>;
    async fn list(&self, filter: ClassFilter) -> Result<Vec<CountedClass>>;
    async fn list_upcoming(&self, now: DateTime<Utc>) -> Result<Vec<CountedClass>>;
    async fn update(&self, class: Class) -> Result<Class>;
    async fn delete(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Insert an enrollment only while the class still has room. The
    /// capacity check and the insert are a single atomic write.
    async fn enroll_if_available(&self, class_id: i64, user_id: i64) -> Result<EnrollOutcome>;
    async fn find(&self, class_id: i64, user_id: i64) -> Result<Option<Enrollment>>;
    async fn delete(&self, class_id: i64, user_id: i64) -> Result<bool>;
    async fn count_for_class(&self, class_id: i64) -> Result<i64>;
    async fn list_for_class(&self, class_id: i64) -> Result<Vec<(Enrollment, User)>>;
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<(Enrollment, Class)>>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn create(
        &self,
        reviewer_id: i64,
        trainer_id: i64,
        rating: i64,
        comment: &str,
    ) -> Result<Review>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Review>>;
    async fn list(&self) -> Result<Vec<Review>>;
    async fn list_for_trainer(&self, trainer_id: i64) -> Result<Vec<Review>>;
    async fn delete(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait PaymentProofRepository: Send + Sync {
    async fn create(&self, proof: NewPaymentProof) -> Result<PaymentProof>;
    async fn list(&self, user_id: Option<i64>) -> Result<Vec<PaymentProof>>;
    async fn find_image(&self, id: i64) -> Result<Option<PaymentImage>>;
}

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Record the purchase and raise the buyer's role in one transaction.
    /// Replaying the same checkout session is a no-op.
    async fn fulfill(&self, purchase: NewMembershipPurchase) -> Result<Fulfillment>;
    async fn find_by_session(&self, stripe_session_id: &str) -> Result<Option<MembershipPurchase>>;
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn create(&self, request: NewContactRequest) -> Result<ContactRequest>;
    async fn list(&self) -> Result<Vec<ContactRequest>>;
}

pub(crate) fn to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(naive, Utc)
}

pub(crate) fn parse_role(s: &str) -> Result<Role> {
    s.parse::<Role>()
        .map_err(|e| AppError::Database(e.to_string()))
}
