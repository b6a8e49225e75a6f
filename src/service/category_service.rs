use std::sync::Arc;

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::CategoryRepository,
};

pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<CategoryWithUsage>> {
        self.repo.list_with_usage().await
    }

    pub async fn get(&self, id: i64) -> Result<ClassCategory> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found.".to_string()))
    }

    pub async fn create(&self, request: CreateCategoryRequest) -> Result<ClassCategory> {
        let name = request
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::Validation("name is required.".to_string()))?;

        if self.repo.find_by_name(&name).await?.is_some() {
            return Err(AppError::Conflict("Category name already exists.".to_string()));
        }

        let description = request.description.as_deref().map(str::trim);
        let category = self.repo.create(&name, description).await?;
        tracing::info!("Category '{}' created", category.name);

        Ok(category)
    }

    pub async fn update(&self, id: i64, request: UpdateCategoryRequest) -> Result<ClassCategory> {
        if request.name.is_none() && request.description.is_none() {
            return Err(AppError::Validation("No fields to update.".to_string()));
        }

        let existing = self.get(id).await?;

        let name = match request.name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(AppError::Validation("name is required.".to_string()));
                }
                if name != existing.name && self.repo.find_by_name(&name).await?.is_some() {
                    return Err(AppError::Conflict("Category name already exists.".to_string()));
                }
                name
            }
            None => existing.name,
        };
        let description = request
            .description
            .map(|d| d.trim().to_string())
            .or(existing.description);

        self.repo.update(id, &name, description.as_deref()).await
    }

    /// Delete a category that no class refers to.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.get(id).await?;

        let in_use = self.repo.count_classes(id).await?;
        if in_use > 0 {
            return Err(AppError::Validation(format!(
                "Cannot delete category in use by {} class(es).",
                in_use
            )));
        }

        self.repo.delete(id).await?;
        tracing::info!("Category {} deleted", id);
        Ok(())
    }
}
