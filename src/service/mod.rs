pub mod category_service;
pub mod class_service;
pub mod contact_service;
pub mod enrollment_service;
pub mod membership_service;
pub mod payment_proof_service;
pub mod review_service;
pub mod user_service;

use std::sync::Arc;
use sqlx::SqlitePool;

use crate::auth::TokenService;
use crate::config::Settings;
use crate::email::Mailer;
use crate::payments::{PaymentGateway, PlanCatalog};
use crate::repository::*;

pub use category_service::CategoryService;
pub use class_service::ClassService;
pub use contact_service::ContactService;
pub use enrollment_service::EnrollmentService;
pub use membership_service::MembershipService;
pub use payment_proof_service::PaymentProofService;
pub use review_service::ReviewService;
pub use user_service::UserService;

pub struct ServiceContext {
    pub user_service: Arc<UserService>,
    pub class_service: Arc<ClassService>,
    pub enrollment_service: Arc<EnrollmentService>,
    pub category_service: Arc<CategoryService>,
    pub review_service: Arc<ReviewService>,
    pub membership_service: Arc<MembershipService>,
    pub payment_proof_service: Arc<PaymentProofService>,
    pub contact_service: Arc<ContactService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    /// Build every repository over `db_pool` and wire the services on top.
    /// `gateway` and `mailer` are optional; features that need them answer
    /// with a configuration error while they are absent.
    pub fn new(
        db_pool: SqlitePool,
        settings: &Settings,
        gateway: Option<Arc<dyn PaymentGateway>>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        let user_repo: Arc<dyn UserRepository> =
            Arc::new(SqliteUserRepository::new(db_pool.clone()));
        let category_repo: Arc<dyn CategoryRepository> =
            Arc::new(SqliteCategoryRepository::new(db_pool.clone()));
        let class_repo: Arc<dyn ClassRepository> =
            Arc::new(SqliteClassRepository::new(db_pool.clone()));
        let enrollment_repo: Arc<dyn EnrollmentRepository> =
            Arc::new(SqliteEnrollmentRepository::new(db_pool.clone()));
        let review_repo: Arc<dyn ReviewRepository> =
            Arc::new(SqliteReviewRepository::new(db_pool.clone()));
        let proof_repo: Arc<dyn PaymentProofRepository> =
            Arc::new(SqlitePaymentProofRepository::new(db_pool.clone()));
        let membership_repo: Arc<dyn MembershipRepository> =
            Arc::new(SqliteMembershipRepository::new(db_pool.clone()));
        let contact_repo: Arc<dyn ContactRepository> =
            Arc::new(SqliteContactRepository::new(db_pool.clone()));

        let tokens = TokenService::new(&settings.auth.jwt_secret, settings.auth.token_ttl_hours);
        let frontend_url = settings.server.frontend_url.clone();

        let user_service = Arc::new(UserService::new(
            user_repo.clone(),
            tokens,
            mailer.clone(),
            frontend_url.clone(),
            settings.auth.reset_token_ttl_minutes,
        ));
        let class_service = Arc::new(ClassService::new(
            class_repo.clone(),
            user_repo.clone(),
            category_repo.clone(),
            enrollment_repo.clone(),
        ));
        let enrollment_service = Arc::new(EnrollmentService::new(
            class_repo,
            user_repo.clone(),
            enrollment_repo,
        ));
        let category_service = Arc::new(CategoryService::new(category_repo));
        let review_service = Arc::new(ReviewService::new(review_repo, user_repo.clone()));
        let membership_service = Arc::new(MembershipService::new(
            gateway,
            PlanCatalog::from_config(&settings.stripe),
            user_repo.clone(),
            membership_repo,
            frontend_url,
        ));
        let payment_proof_service = Arc::new(PaymentProofService::new(
            proof_repo,
            user_repo,
            settings.uploads.max_file_size,
        ));
        let contact_service = Arc::new(ContactService::new(
            contact_repo,
            mailer,
            settings.email.admin_address.clone(),
        ));

        Self {
            user_service,
            class_service,
            enrollment_service,
            category_service,
            review_service,
            membership_service,
            payment_proof_service,
            contact_service,
            db_pool,
        }
    }
}
