use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::*,
    error::{AppError, Result},
    payments::{
        CheckoutRequest, PaymentGateway, Plan, PlanCatalog, SessionSummary, WebhookEvent,
        WebhookRejection,
    },
    repository::{Fulfillment, MembershipRepository, UserRepository},
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    /// Accepted as a number or a numeric string.
    pub user_id: Option<Value>,
    pub price_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub url: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    pub status: Option<String>,
    pub paid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Why a webhook delivery was refused.
#[derive(Debug)]
pub enum WebhookFailure {
    Rejected(WebhookRejection),
    Failed(AppError),
}

/// Sells membership plans through the payment gateway and applies paid
/// checkouts to user roles.
pub struct MembershipService {
    gateway: Option<Arc<dyn PaymentGateway>>,
    plans: PlanCatalog,
    user_repo: Arc<dyn UserRepository>,
    membership_repo: Arc<dyn MembershipRepository>,
    frontend_url: String,
}

fn not_configured() -> AppError {
    AppError::ServiceUnavailable("Payment processing is not configured".to_string())
}

fn parse_user_id(value: Option<Value>) -> Result<i64> {
    match value {
        None | Some(Value::Null) => Err(AppError::Validation("userId required".to_string())),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| AppError::Validation("userId must be a number.".to_string())),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(AppError::Validation("userId required".to_string()))
        }
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| AppError::Validation("userId must be a number.".to_string())),
        Some(_) => Err(AppError::Validation("userId must be a number.".to_string())),
    }
}

impl MembershipService {
    pub fn new(
        gateway: Option<Arc<dyn PaymentGateway>>,
        plans: PlanCatalog,
        user_repo: Arc<dyn UserRepository>,
        membership_repo: Arc<dyn MembershipRepository>,
        frontend_url: String,
    ) -> Self {
        Self {
            gateway,
            plans,
            user_repo,
            membership_repo,
            frontend_url,
        }
    }

    fn gateway(&self) -> Result<&Arc<dyn PaymentGateway>> {
        self.gateway.as_ref().ok_or_else(not_configured)
    }

    pub fn plans(&self) -> &[Plan] {
        self.plans.all()
    }

    pub async fn checkout(&self, body: CheckoutBody) -> Result<CheckoutResponse> {
        let user_id = parse_user_id(body.user_id)?;
        let price_id = body
            .price_id
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| AppError::Validation("priceId required".to_string()))?;
        let plan = self
            .plans
            .find(price_id.trim())
            .cloned()
            .ok_or_else(|| AppError::Validation("invalid priceId".to_string()))?;

        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

        // Staff accounts have no tier and cannot buy one.
        let already_covered = match user.role.tier_rank() {
            Some(current) => plan.role.tier_rank().map_or(true, |wanted| current >= wanted),
            None => true,
        };
        if already_covered {
            return Err(AppError::Conflict("user already has equal or higher role".to_string()));
        }

        let base = self.frontend_url.trim_end_matches('/');
        let session = self
            .gateway()?
            .create_checkout_session(CheckoutRequest {
                user_id: user.id,
                email: user.email.clone(),
                plan,
                success_url: format!(
                    "{}/membership/success?session_id={{CHECKOUT_SESSION_ID}}",
                    base
                ),
                cancel_url: format!("{}/membership/cancel", base),
            })
            .await?;

        tracing::info!("Checkout session {} opened for user {}", session.id, user.id);

        Ok(CheckoutResponse {
            url: session.url,
            session_id: session.id,
        })
    }

    /// Record a paid session and upgrade the buyer. Safe to call more than
    /// once for the same session.
    pub async fn fulfill(&self, session: &SessionSummary) -> Result<Fulfillment> {
        let user_id = session
            .metadata
            .get("userId")
            .and_then(|id| id.parse::<i64>().ok())
            .ok_or_else(|| AppError::Validation(format!("Session {} has no userId", session.id)))?;
        let plan = session
            .metadata
            .get("priceId")
            .and_then(|price_id| self.plans.find(price_id))
            .ok_or_else(|| {
                AppError::Validation(format!("Session {} has no known priceId", session.id))
            })?;

        let fulfillment = self
            .membership_repo
            .fulfill(NewMembershipPurchase {
                user_id,
                role: plan.role,
                price_id: plan.price_id.clone(),
                amount: session.amount_total.unwrap_or(plan.amount),
                currency: session.currency.clone().unwrap_or_else(|| plan.currency.clone()),
                stripe_session_id: session.id.clone(),
            })
            .await?;

        if fulfillment.newly_recorded {
            tracing::info!(
                "Session {} fulfilled: user {} is now {}",
                session.id,
                user_id,
                fulfillment.role
            );
        } else {
            tracing::debug!("Session {} was already fulfilled", session.id);
        }

        Ok(fulfillment)
    }

    pub async fn handle_webhook(
        &self,
        payload: &str,
        signature: &str,
    ) -> std::result::Result<(), WebhookFailure> {
        let gateway = self.gateway().map_err(WebhookFailure::Failed)?;

        let event = gateway
            .parse_webhook(payload, signature)
            .await
            .map_err(|rejection| {
                tracing::warn!("Rejected webhook: {}", rejection.0);
                WebhookFailure::Rejected(rejection)
            })?;

        match event {
            WebhookEvent::CheckoutCompleted(session) if session.paid => {
                self.fulfill(&session).await.map_err(WebhookFailure::Failed)?;
            }
            WebhookEvent::CheckoutCompleted(session) => {
                tracing::info!("Checkout {} completed without payment yet", session.id);
            }
            WebhookEvent::Ignored(kind) => {
                tracing::debug!("Unhandled webhook event type: {}", kind);
            }
        }

        Ok(())
    }

    pub async fn verify(&self, session_id: Option<String>) -> Result<VerifyResponse> {
        let session_id = session_id
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::Validation("session_id required".to_string()))?;

        let session = self.gateway()?.retrieve_session(session_id.trim()).await?;

        let role = if session.paid {
            Some(self.fulfill(&session).await?.role)
        } else {
            None
        };

        Ok(VerifyResponse {
            status: session.status,
            paid: session.paid,
            role,
        })
    }
}
