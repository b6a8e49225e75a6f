use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

use super::plans::Plan;

/// Everything needed to open a hosted checkout for one plan.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: i64,
    pub email: String,
    pub plan: Plan,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSessionInfo {
    pub id: String,
    pub url: String,
}

/// Gateway-neutral view of a checkout session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSummary {
    pub id: String,
    pub status: Option<String>,
    pub paid: bool,
    pub metadata: HashMap<String, String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    CheckoutCompleted(SessionSummary),
    Ignored(String),
}

/// Webhook payload that failed signature verification or parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookRejection(pub String);

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSessionInfo>;
    async fn retrieve_session(&self, session_id: &str) -> Result<SessionSummary>;
    async fn parse_webhook(
        &self,
        payload: &str,
        signature: &str,
    ) -> std::result::Result<WebhookEvent, WebhookRejection>;
}

#[cfg(any(test, feature = "test-utils"))]
pub use fake::FakePaymentGateway;

#[cfg(any(test, feature = "test-utils"))]
mod fake {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use serde::Deserialize;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use super::*;
    use crate::error::AppError;

    /// In-memory gateway for tests. Sessions start unpaid; call
    /// [`FakePaymentGateway::mark_paid`] to simulate the customer paying.
    #[derive(Default)]
    pub struct FakePaymentGateway {
        sessions: Mutex<HashMap<String, SessionSummary>>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct FakeEvent {
        #[serde(rename = "type")]
        kind: String,
        session_id: String,
    }

    impl FakePaymentGateway {
        pub const VALID_SIGNATURE: &'static str = "t=0,v1=fake-signature";

        pub fn new() -> Self {
            Self::default()
        }

        pub async fn mark_paid(&self, session_id: &str) {
            if let Some(session) = self.sessions.lock().await.get_mut(session_id) {
                session.paid = true;
                session.status = Some("complete".to_string());
            }
        }

        pub async fn session(&self, session_id: &str) -> Option<SessionSummary> {
            self.sessions.lock().await.get(session_id).cloned()
        }

        /// Body of a `checkout.session.completed` delivery for `session_id`.
        pub fn completed_event(session_id: &str) -> String {
            serde_json::json!({
                "type": "checkout.session.completed",
                "sessionId": session_id,
            })
            .to_string()
        }
    }

    #[async_trait]
    impl PaymentGateway for FakePaymentGateway {
        async fn create_checkout_session(
            &self,
            request: CheckoutRequest,
        ) -> Result<CheckoutSessionInfo> {
            let id = format!("cs_test_{}", Uuid::new_v4().simple());
            let metadata = HashMap::from([
                ("userId".to_string(), request.user_id.to_string()),
                ("role".to_string(), request.plan.role.to_string()),
                ("priceId".to_string(), request.plan.price_id.clone()),
            ]);

            self.sessions.lock().await.insert(
                id.clone(),
                SessionSummary {
                    id: id.clone(),
                    status: Some("open".to_string()),
                    paid: false,
                    metadata,
                    amount_total: Some(request.plan.amount),
                    currency: Some(request.plan.currency.clone()),
                },
            );

            Ok(CheckoutSessionInfo {
                url: format!("https://checkout.stripe.test/pay/{}", id),
                id,
            })
        }

        async fn retrieve_session(&self, session_id: &str) -> Result<SessionSummary> {
            self.session(session_id)
                .await
                .ok_or_else(|| {
                    AppError::External(format!("No such checkout session: {}", session_id))
                })
        }

        async fn parse_webhook(
            &self,
            payload: &str,
            signature: &str,
        ) -> std::result::Result<WebhookEvent, WebhookRejection> {
            if signature != Self::VALID_SIGNATURE {
                return Err(WebhookRejection(
                    "No signatures found matching the expected signature for payload".to_string(),
                ));
            }

            let event: FakeEvent = serde_json::from_str(payload)
                .map_err(|e| WebhookRejection(e.to_string()))?;

            if event.kind != "checkout.session.completed" {
                return Ok(WebhookEvent::Ignored(event.kind));
            }

            self.session(&event.session_id)
                .await
                .map(WebhookEvent::CheckoutCompleted)
                .ok_or_else(|| WebhookRejection(format!("Unknown session {}", event.session_id)))
        }
    }
}
