pub mod auth;
pub mod categories;
pub mod classes;
pub mod contact;
pub mod payments;
pub mod reviews;
pub mod root;
pub mod stripe;
pub mod trainers;
pub mod users;

use axum::Json;
use serde_json::{json, Value};

/// Plain confirmation body for operations that return nothing else.
pub(crate) fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}
