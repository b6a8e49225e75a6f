use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

/// Uploaded proof-of-payment image. The image bytes are served by a
/// dedicated endpoint and never embedded in JSON.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProof {
    pub id: i64,
    pub user_id: Option<i64>,
    pub amount: f64,
    pub note: Option<String>,
    pub filename: String,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPaymentProof {
    pub user_id: Option<i64>,
    pub amount: f64,
    pub note: Option<String>,
    pub filename: String,
    pub mime_type: String,
    pub image_data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct PaymentImage {
    pub mime_type: String,
    pub filename: String,
    pub data: Vec<u8>,
}

/// Completed subscription checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MembershipPurchase {
    pub id: i64,
    pub user_id: i64,
    pub role: Role,
    pub price_id: String,
    pub amount: i64,
    pub currency: String,
    pub stripe_session_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMembershipPurchase {
    pub user_id: i64,
    pub role: Role,
    pub price_id: String,
    pub amount: i64,
    pub currency: String,
    pub stripe_session_id: String,
}
