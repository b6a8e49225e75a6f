use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::{
    domain::{Class, ClassFilter, CountedClass, NewClass},
    error::{AppError, Result},
    repository::{parse_role, to_utc, ClassRepository},
};

#[derive(FromRow)]
struct ClassRow {
    id: i64,
    title: String,
    description: Option<String>,
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    capacity: Option<i64>,
    required_role: Option<String>,
    trainer_id: i64,
    created_by_id: i64,
    category_id: Option<i64>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    enrollment_count: i64,
}

const COUNTED_SELECT: &str = r#"
    SELECT c.id, c.title, c.description, c.start_time, c.end_time, c.capacity,
           c.required_role, c.trainer_id, c.created_by_id, c.category_id,
           c.created_at, c.updated_at,
           (SELECT COUNT(*) FROM class_enrollments e WHERE e.class_id = c.id) AS enrollment_count
    FROM classes c
"#;

pub struct SqliteClassRepository {
    pool: SqlitePool,
}

impl SqliteClassRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_class(row: ClassRow) -> Result<CountedClass> {
        let required_role = match row.required_role.as_deref() {
            Some(role) => Some(parse_role(role)?),
            None => None,
        };

        Ok(CountedClass {
            enrollment_count: row.enrollment_count,
            class: Class {
                id: row.id,
                title: row.title,
                description: row.description,
                start_time: to_utc(row.start_time),
                end_time: to_utc(row.end_time),
                capacity: row.capacity,
                required_role,
                trainer_id: row.trainer_id,
                created_by_id: row.created_by_id,
                category_id: row.category_id,
                created_at: to_utc(row.created_at),
                updated_at: to_utc(row.updated_at),
            },
        })
    }
}

#[async_trait]
impl ClassRepository for SqliteClassRepository {
    async fn create(&self, class: NewClass) -> Result<Class> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO classes (
                title, description, start_time, end_time, capacity, required_role,
                trainer_id, created_by_id, category_id, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(&class.title)
        .bind(&class.description)
        .bind(class.start_time.naive_utc())
        .bind(class.end_time.naive_utc())
        .bind(class.capacity)
        .bind(class.required_role.map(|r| r.as_str()))
        .bind(class.trainer_id)
        .bind(class.created_by_id)
        .bind(class.category_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .map(|counted| counted.class)
            .ok_or_else(|| AppError::Database("Failed to retrieve created class".to_string()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<CountedClass>> {
        let row = sqlx::query_as::<_, ClassRow>(&format!("{COUNTED_SELECT} WHERE c.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_class).transpose()
    }

    async fn list(&self, filter: ClassFilter) -> Result<Vec<CountedClass>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(COUNTED_SELECT);
        query.push(" WHERE 1 = 1");

        if let Some(category_id) = filter.category_id {
            query.push(" AND c.category_id = ").push_bind(category_id);
        }
        if let Some(trainer_id) = filter.trainer_id {
            query.push(" AND c.trainer_id = ").push_bind(trainer_id);
        }
        query.push(" ORDER BY c.start_time ASC");

        let rows = query
            .build_query_as::<ClassRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(Self::row_to_class)
            .collect()
    }

    async fn list_upcoming(&self, now: DateTime<Utc>) -> Result<Vec<CountedClass>> {
        let rows = sqlx::query_as::<_, ClassRow>(&format!(
            "{COUNTED_SELECT} WHERE c.start_time > ? ORDER BY c.start_time ASC"
        ))
        .bind(now.naive_utc())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(Self::row_to_class)
            .collect()
    }

    async fn update(&self, class: Class) -> Result<Class> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE classes
            SET title = ?, description = ?, start_time = ?, end_time = ?, capacity = ?,
                required_role = ?, trainer_id = ?, category_id = ?, updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(&class.title)
        .bind(&class.description)
        .bind(class.start_time.naive_utc())
        .bind(class.end_time.naive_utc())
        .bind(class.capacity)
        .bind(class.required_role.map(|r| r.as_str()))
        .bind(class.trainer_id)
        .bind(class.category_id)
        .bind(now)
        .bind(class.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Class not found.".to_string()));
        }

        self.find_by_id(class.id)
            .await?
            .map(|counted| counted.class)
            .ok_or_else(|| AppError::Database("Failed to retrieve updated class".to_string()))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM classes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
