pub mod gateway;
pub mod plans;
pub mod stripe_client;

pub use gateway::{
    CheckoutRequest, CheckoutSessionInfo, PaymentGateway, SessionSummary, WebhookEvent,
    WebhookRejection,
};
#[cfg(any(test, feature = "test-utils"))]
pub use gateway::FakePaymentGateway;
pub use plans::{Plan, PlanCatalog};
pub use stripe_client::StripeGateway;
