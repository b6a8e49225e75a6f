use std::collections::HashMap;

use async_trait::async_trait;
use stripe::{
    CheckoutSession, CheckoutSessionId, CheckoutSessionMode, CheckoutSessionPaymentStatus,
    Client, CreateCheckoutSession, CreateCheckoutSessionLineItems, EventObject, EventType,
    Webhook,
};

use crate::error::{AppError, Result};

use super::gateway::{
    CheckoutRequest, CheckoutSessionInfo, PaymentGateway, SessionSummary, WebhookEvent,
    WebhookRejection,
};

/// Hosted-checkout gateway backed by the Stripe API.
pub struct StripeGateway {
    client: Client,
    webhook_secret: String,
}

impl StripeGateway {
    pub fn new(api_key: String, webhook_secret: String) -> Self {
        Self {
            client: Client::new(api_key),
            webhook_secret,
        }
    }

    fn summarize(session: CheckoutSession) -> SessionSummary {
        SessionSummary {
            id: session.id.to_string(),
            status: session.status.map(|s| s.as_str().to_string()),
            paid: session.payment_status == CheckoutSessionPaymentStatus::Paid,
            metadata: session.metadata.unwrap_or_default(),
            amount_total: session.amount_total,
            currency: session.currency.map(|c| c.to_string().to_uppercase()),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSessionInfo> {
        let user_id = request.user_id.to_string();

        let mut params = CreateCheckoutSession::new();
        params.mode = Some(CheckoutSessionMode::Payment);
        params.success_url = Some(&request.success_url);
        params.cancel_url = Some(&request.cancel_url);
        params.customer_email = Some(&request.email);
        params.client_reference_id = Some(&user_id);
        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            price: Some(request.plan.price_id.clone()),
            quantity: Some(1),
            ..Default::default()
        }]);

        // Read back by the webhook and verify endpoints to fulfill.
        let mut metadata = HashMap::new();
        metadata.insert("userId".to_string(), user_id.clone());
        metadata.insert("role".to_string(), request.plan.role.to_string());
        metadata.insert("priceId".to_string(), request.plan.price_id.clone());
        params.metadata = Some(metadata);

        let session = CheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| AppError::External(format!("Stripe error: {}", e)))?;

        let url = session
            .url
            .clone()
            .ok_or_else(|| AppError::External("No checkout URL returned".to_string()))?;

        Ok(CheckoutSessionInfo {
            id: session.id.to_string(),
            url,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionSummary> {
        let id = session_id
            .parse::<CheckoutSessionId>()
            .map_err(|_| AppError::Validation("invalid session_id".to_string()))?;

        let session = CheckoutSession::retrieve(&self.client, &id, &[])
            .await
            .map_err(|e| AppError::External(format!("Stripe error: {}", e)))?;

        Ok(Self::summarize(session))
    }

    async fn parse_webhook(
        &self,
        payload: &str,
        signature: &str,
    ) -> std::result::Result<WebhookEvent, WebhookRejection> {
        let event = Webhook::construct_event(payload, signature, &self.webhook_secret)
            .map_err(|e| WebhookRejection(e.to_string()))?;

        match (event.type_, event.data.object) {
            (EventType::CheckoutSessionCompleted, EventObject::CheckoutSession(session)) => {
                Ok(WebhookEvent::CheckoutCompleted(Self::summarize(session)))
            }
            (other, _) => Ok(WebhookEvent::Ignored(other.to_string())),
        }
    }
}
