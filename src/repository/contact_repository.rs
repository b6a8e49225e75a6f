use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{ContactRequest, NewContactRequest},
    error::{AppError, Result},
    repository::{to_utc, ContactRepository},
};

#[derive(FromRow)]
struct ContactRow {
    id: i64,
    name: String,
    email: String,
    phone_number: String,
    subject: String,
    message: String,
    created_at: NaiveDateTime,
}

pub struct SqliteContactRepository {
    pool: SqlitePool,
}

impl SqliteContactRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_contact(row: ContactRow) -> ContactRequest {
        ContactRequest {
            id: row.id,
            name: row.name,
            email: row.email,
            phone_number: row.phone_number,
            subject: row.subject,
            message: row.message,
            created_at: to_utc(row.created_at),
        }
    }
}

#[async_trait]
impl ContactRepository for SqliteContactRepository {
    async fn create(&self, request: NewContactRequest) -> Result<ContactRequest> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO contact_requests (name, email, phone_number, subject, message, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.phone_number)
        .bind(&request.subject)
        .bind(&request.message)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, ContactRow>(
            "SELECT id, name, email, phone_number, subject, message, created_at FROM contact_requests WHERE id = ?"
        )
        .bind(result.last_insert_rowid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::Database("Failed to retrieve contact request".to_string()))?;

        Ok(Self::row_to_contact(row))
    }

    async fn list(&self) -> Result<Vec<ContactRequest>> {
        let rows = sqlx::query_as::<_, ContactRow>(
            "SELECT id, name, email, phone_number, subject, message, created_at FROM contact_requests ORDER BY created_at DESC, id DESC"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::row_to_contact).collect())
    }
}
