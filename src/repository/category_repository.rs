use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{CategoryWithUsage, ClassCategory},
    error::{is_unique_violation, AppError, Result},
    repository::{to_utc, CategoryRepository},
};

#[derive(FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    description: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct CategoryUsageRow {
    id: i64,
    name: String,
    description: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    class_count: i64,
}

pub struct SqliteCategoryRepository {
    pool: SqlitePool,
}

impl SqliteCategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_category(row: CategoryRow) -> ClassCategory {
        ClassCategory {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
        }
    }

    fn duplicate_name(e: sqlx::Error) -> AppError {
        if is_unique_violation(&e) {
            AppError::Conflict("Category name already exists.".to_string())
        } else {
            AppError::Database(e.to_string())
        }
    }
}

#[async_trait]
impl CategoryRepository for SqliteCategoryRepository {
    async fn create(&self, name: &str, description: Option<&str>) -> Result<ClassCategory> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO class_categories (name, description, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            "#
        )
        .bind(name)
        .bind(description)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Self::duplicate_name)?;

        self.find_by_id(result.last_insert_rowid()).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created category".to_string())
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ClassCategory>> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, description, created_at, updated_at FROM class_categories WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::row_to_category))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ClassCategory>> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, description, created_at, updated_at FROM class_categories WHERE name = ?"
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::row_to_category))
    }

    async fn list_with_usage(&self) -> Result<Vec<CategoryWithUsage>> {
        let rows = sqlx::query_as::<_, CategoryUsageRow>(
            r#"
            SELECT cc.id, cc.name, cc.description, cc.created_at, cc.updated_at,
                   (SELECT COUNT(*) FROM classes c WHERE c.category_id = cc.id) AS class_count
            FROM class_categories cc
            ORDER BY cc.name ASC
            "#
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CategoryWithUsage {
                class_count: row.class_count,
                category: Self::row_to_category(CategoryRow {
                    id: row.id,
                    name: row.name,
                    description: row.description,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                }),
            })
            .collect())
    }

    async fn update(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<ClassCategory> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            "UPDATE class_categories SET name = ?, description = ?, updated_at = ? WHERE id = ?"
        )
        .bind(name)
        .bind(description)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Self::duplicate_name)?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::NotFound("Category not found.".to_string())
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM class_categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn count_classes(&self, id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM classes WHERE category_id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
