use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{NewPaymentProof, PaymentImage, PaymentProof},
    error::{AppError, Result},
    repository::{to_utc, PaymentProofRepository},
};

#[derive(FromRow)]
struct PaymentProofRow {
    id: i64,
    user_id: Option<i64>,
    amount: f64,
    note: Option<String>,
    filename: String,
    mime_type: String,
    created_at: NaiveDateTime,
}

#[derive(FromRow)]
struct PaymentImageRow {
    mime_type: String,
    filename: String,
    image_data: Vec<u8>,
}

pub struct SqlitePaymentProofRepository {
    pool: SqlitePool,
}

impl SqlitePaymentProofRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_proof(row: PaymentProofRow) -> PaymentProof {
        PaymentProof {
            id: row.id,
            user_id: row.user_id,
            amount: row.amount,
            note: row.note,
            filename: row.filename,
            mime_type: row.mime_type,
            created_at: to_utc(row.created_at),
        }
    }
}

#[async_trait]
impl PaymentProofRepository for SqlitePaymentProofRepository {
    async fn create(&self, proof: NewPaymentProof) -> Result<PaymentProof> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO payment_proofs (
                user_id, amount, note, filename, mime_type, image_data, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(proof.user_id)
        .bind(proof.amount)
        .bind(&proof.note)
        .bind(&proof.filename)
        .bind(&proof.mime_type)
        .bind(&proof.image_data)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, PaymentProofRow>(
            "SELECT id, user_id, amount, note, filename, mime_type, created_at FROM payment_proofs WHERE id = ?"
        )
        .bind(result.last_insert_rowid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::Database("Failed to retrieve created payment proof".to_string()))?;

        Ok(Self::row_to_proof(row))
    }

    async fn list(&self, user_id: Option<i64>) -> Result<Vec<PaymentProof>> {
        let rows = match user_id {
            Some(user_id) => {
                sqlx::query_as::<_, PaymentProofRow>(
                    r#"
                    SELECT id, user_id, amount, note, filename, mime_type, created_at
                    FROM payment_proofs
                    WHERE user_id = ?
                    ORDER BY created_at DESC, id DESC
                    "#
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, PaymentProofRow>(
                    r#"
                    SELECT id, user_id, amount, note, filename, mime_type, created_at
                    FROM payment_proofs
                    ORDER BY created_at DESC, id DESC
                    "#
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(Self::row_to_proof).collect())
    }

    async fn find_image(&self, id: i64) -> Result<Option<PaymentImage>> {
        let row = sqlx::query_as::<_, PaymentImageRow>(
            "SELECT mime_type, filename, image_data FROM payment_proofs WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| PaymentImage {
            mime_type: r.mime_type,
            filename: r.filename,
            data: r.image_data,
        }))
    }
}
