use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::Review,
    error::{AppError, Result},
    repository::{to_utc, ReviewRepository},
};

#[derive(FromRow)]
struct ReviewRow {
    id: i64,
    reviewer_id: i64,
    trainer_id: i64,
    rating: i64,
    comment: String,
    created_at: NaiveDateTime,
}

pub struct SqliteReviewRepository {
    pool: SqlitePool,
}

impl SqliteReviewRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_review(row: ReviewRow) -> Review {
        Review {
            id: row.id,
            reviewer_id: row.reviewer_id,
            trainer_id: row.trainer_id,
            rating: row.rating,
            comment: row.comment,
            created_at: to_utc(row.created_at),
        }
    }
}

#[async_trait]
impl ReviewRepository for SqliteReviewRepository {
    async fn create(
        &self,
        reviewer_id: i64,
        trainer_id: i64,
        rating: i64,
        comment: &str,
    ) -> Result<Review> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO trainer_reviews (reviewer_id, trainer_id, rating, comment, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#
        )
        .bind(reviewer_id)
        .bind(trainer_id)
        .bind(rating)
        .bind(comment)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(result.last_insert_rowid()).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created review".to_string())
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Review>> {
        let row = sqlx::query_as::<_, ReviewRow>(
            "SELECT id, reviewer_id, trainer_id, rating, comment, created_at FROM trainer_reviews WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::row_to_review))
    }

    async fn list(&self) -> Result<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            "SELECT id, reviewer_id, trainer_id, rating, comment, created_at FROM trainer_reviews ORDER BY created_at DESC, id DESC"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::row_to_review).collect())
    }

    async fn list_for_trainer(&self, trainer_id: i64) -> Result<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT id, reviewer_id, trainer_id, rating, comment, created_at
            FROM trainer_reviews
            WHERE trainer_id = ?
            ORDER BY created_at DESC, id DESC
            "#
        )
        .bind(trainer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::row_to_review).collect())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM trainer_reviews WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
