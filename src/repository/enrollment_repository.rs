use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{Class, EnrollOutcome, Enrollment, User},
    error::{is_unique_violation, AppError, Result},
    repository::{parse_role, to_utc, EnrollmentRepository},
};

#[derive(FromRow)]
struct EnrollmentRow {
    id: i64,
    class_id: i64,
    user_id: i64,
    created_at: NaiveDateTime,
}

#[derive(FromRow)]
struct EnrolledUserRow {
    id: i64,
    class_id: i64,
    user_id: i64,
    created_at: NaiveDateTime,
    email: String,
    name: Option<String>,
    role: String,
    user_created_at: NaiveDateTime,
    user_updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct EnrolledClassRow {
    id: i64,
    class_id: i64,
    user_id: i64,
    created_at: NaiveDateTime,
    title: String,
    description: Option<String>,
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    capacity: Option<i64>,
    required_role: Option<String>,
    trainer_id: i64,
    created_by_id: i64,
    category_id: Option<i64>,
    class_created_at: NaiveDateTime,
    class_updated_at: NaiveDateTime,
}

pub struct SqliteEnrollmentRepository {
    pool: SqlitePool,
}

impl SqliteEnrollmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_enrollment(row: EnrollmentRow) -> Enrollment {
        Enrollment {
            id: row.id,
            class_id: row.class_id,
            user_id: row.user_id,
            created_at: to_utc(row.created_at),
        }
    }
}

#[async_trait]
impl EnrollmentRepository for SqliteEnrollmentRepository {
    async fn enroll_if_available(&self, class_id: i64, user_id: i64) -> Result<EnrollOutcome> {
        let now = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;

        // Count and insert in one statement so two callers can never both
        // take the last seat.
        let inserted = sqlx::query(
            r#"
            INSERT INTO class_enrollments (class_id, user_id, created_at)
            SELECT c.id, ?, ?
            FROM classes c
            WHERE c.id = ?
              AND (
                c.capacity IS NULL
                OR (SELECT COUNT(*) FROM class_enrollments e WHERE e.class_id = c.id) < c.capacity
              )
            "#
        )
        .bind(user_id)
        .bind(now)
        .bind(class_id)
        .execute(&mut *tx)
        .await;

        let result = match inserted {
            Ok(result) => result,
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                return Ok(EnrollOutcome::AlreadyEnrolled);
            }
            Err(e) => return Err(AppError::Database(e.to_string())),
        };

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(EnrollOutcome::ClassFull);
        }

        let row = sqlx::query_as::<_, EnrollmentRow>(
            "SELECT id, class_id, user_id, created_at FROM class_enrollments WHERE id = ?"
        )
        .bind(result.last_insert_rowid())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(EnrollOutcome::Created(Self::row_to_enrollment(row)))
    }

    async fn find(&self, class_id: i64, user_id: i64) -> Result<Option<Enrollment>> {
        let row = sqlx::query_as::<_, EnrollmentRow>(
            "SELECT id, class_id, user_id, created_at FROM class_enrollments WHERE class_id = ? AND user_id = ?"
        )
        .bind(class_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::row_to_enrollment))
    }

    async fn delete(&self, class_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM class_enrollments WHERE class_id = ? AND user_id = ?")
            .bind(class_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_for_class(&self, class_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM class_enrollments WHERE class_id = ?")
                .bind(class_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn list_for_class(&self, class_id: i64) -> Result<Vec<(Enrollment, User)>> {
        let rows = sqlx::query_as::<_, EnrolledUserRow>(
            r#"
            SELECT e.id, e.class_id, e.user_id, e.created_at,
                   u.email, u.name, u.role,
                   u.created_at AS user_created_at, u.updated_at AS user_updated_at
            FROM class_enrollments e
            JOIN users u ON u.id = e.user_id
            WHERE e.class_id = ?
            ORDER BY e.created_at ASC, e.id ASC
            "#
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let user = User {
                    id: row.user_id,
                    email: row.email,
                    name: row.name,
                    role: parse_role(&row.role)?,
                    created_at: to_utc(row.user_created_at),
                    updated_at: to_utc(row.user_updated_at),
                };
                let enrollment = Self::row_to_enrollment(EnrollmentRow {
                    id: row.id,
                    class_id: row.class_id,
                    user_id: row.user_id,
                    created_at: row.created_at,
                });
                Ok((enrollment, user))
            })
            .collect()
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<(Enrollment, Class)>> {
        let rows = sqlx::query_as::<_, EnrolledClassRow>(
            r#"
            SELECT e.id, e.class_id, e.user_id, e.created_at,
                   c.title, c.description, c.start_time, c.end_time, c.capacity,
                   c.required_role, c.trainer_id, c.created_by_id, c.category_id,
                   c.created_at AS class_created_at, c.updated_at AS class_updated_at
            FROM class_enrollments e
            JOIN classes c ON c.id = e.class_id
            WHERE e.user_id = ?
            ORDER BY c.start_time ASC
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let required_role = match row.required_role.as_deref() {
                    Some(role) => Some(parse_role(role)?),
                    None => None,
                };
                let class = Class {
                    id: row.class_id,
                    title: row.title,
                    description: row.description,
                    start_time: to_utc(row.start_time),
                    end_time: to_utc(row.end_time),
                    capacity: row.capacity,
                    required_role,
                    trainer_id: row.trainer_id,
                    created_by_id: row.created_by_id,
                    category_id: row.category_id,
                    created_at: to_utc(row.class_created_at),
                    updated_at: to_utc(row.class_updated_at),
                };
                let enrollment = Self::row_to_enrollment(EnrollmentRow {
                    id: row.id,
                    class_id: row.class_id,
                    user_id: row.user_id,
                    created_at: row.created_at,
                });
                Ok((enrollment, class))
            })
            .collect()
    }
}
