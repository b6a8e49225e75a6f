use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Class, ClassView, User};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: i64,
    pub class_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Enrollment returned to callers with its class and user nested.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentDetail {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub class: Class,
    pub user: User,
}

/// Outcome of the conditional insert performed by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrollOutcome {
    Created(Enrollment),
    ClassFull,
    AlreadyEnrolled,
}

/// A class roster entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentWithUser {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub user: User,
}

/// One of a user's bookings, with the class and its derived fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentWithClass {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub class: ClassView,
}
