use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::{
    auth::Claims,
    domain::*,
    error::{AppError, Result},
    repository::{CategoryRepository, ClassRepository, EnrollmentRepository, UserRepository},
};

/// Roster of one class.
#[derive(Debug, Clone, Serialize)]
pub struct ClassRoster {
    pub class: ClassView,
    pub enrollments: Vec<EnrollmentWithUser>,
}

/// A trainer and the classes they run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainerClasses {
    pub trainer: User,
    pub classes: Vec<ClassView>,
}

pub struct ClassService {
    class_repo: Arc<dyn ClassRepository>,
    user_repo: Arc<dyn UserRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    enrollment_repo: Arc<dyn EnrollmentRepository>,
}

/// Parse an ISO-8601 timestamp. Offsets are honoured; a bare local
/// timestamp is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_window(start: &str, end: &str) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    match (parse_timestamp(start), parse_timestamp(end)) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(AppError::Validation(
            "startTime and endTime must be valid ISO-8601 dates.".to_string(),
        )),
    }
}

fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end <= start {
        return Err(AppError::Validation("endTime must be after startTime.".to_string()));
    }
    Ok(())
}

fn check_capacity(capacity: Option<i64>) -> Result<()> {
    match capacity {
        Some(c) if c <= 0 => Err(AppError::Validation(
            "capacity must be greater than zero.".to_string(),
        )),
        _ => Ok(()),
    }
}

fn parse_optional_role(raw: Option<&str>) -> Result<Option<Role>> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => parse_required_role(raw).map(Some).map_err(AppError::Validation),
        None => Ok(None),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ClassService {
    pub fn new(
        class_repo: Arc<dyn ClassRepository>,
        user_repo: Arc<dyn UserRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        enrollment_repo: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            class_repo,
            user_repo,
            category_repo,
            enrollment_repo,
        }
    }

    /// Attach trainer, category and derived fields to each class. Lookups
    /// are memoised across the batch.
    pub async fn views(
        &self,
        classes: Vec<CountedClass>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ClassView>> {
        let mut trainers: HashMap<i64, Option<User>> = HashMap::new();
        let mut categories: HashMap<i64, Option<ClassCategory>> = HashMap::new();
        let mut views = Vec::with_capacity(classes.len());

        for counted in classes {
            let trainer_id = counted.class.trainer_id;
            if !trainers.contains_key(&trainer_id) {
                let trainer = self.user_repo.find_by_id(trainer_id).await?;
                trainers.insert(trainer_id, trainer);
            }

            let category = match counted.class.category_id {
                Some(category_id) => {
                    if !categories.contains_key(&category_id) {
                        let category = self.category_repo.find_by_id(category_id).await?;
                        categories.insert(category_id, category);
                    }
                    categories.get(&category_id).cloned().flatten()
                }
                None => None,
            };

            views.push(ClassView::new(
                counted.class,
                trainers.get(&trainer_id).cloned().flatten(),
                category,
                counted.enrollment_count,
                now,
            ));
        }

        Ok(views)
    }

    async fn view(&self, counted: CountedClass, now: DateTime<Utc>) -> Result<ClassView> {
        self.views(vec![counted], now)
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("Empty class view".to_string()))
    }

    async fn find_counted(&self, id: i64) -> Result<CountedClass> {
        self.class_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Class not found.".to_string()))
    }

    async fn roster(&self, class_id: i64) -> Result<Vec<EnrollmentWithUser>> {
        Ok(self
            .enrollment_repo
            .list_for_class(class_id)
            .await?
            .into_iter()
            .map(|(enrollment, user)| EnrollmentWithUser { enrollment, user })
            .collect())
    }

    pub async fn list(&self, filter: ClassFilter, now: DateTime<Utc>) -> Result<Vec<ClassView>> {
        let classes = self.class_repo.list(filter).await?;
        self.views(classes, now).await
    }

    pub async fn list_upcoming(&self, now: DateTime<Utc>) -> Result<Vec<ClassView>> {
        let classes = self.class_repo.list_upcoming(now).await?;
        self.views(classes, now).await
    }

    pub async fn get(&self, id: i64, now: DateTime<Utc>) -> Result<ClassDetail> {
        let counted = self.find_counted(id).await?;
        let enrollments = self.roster(id).await?;
        let view = self.view(counted, now).await?;

        Ok(ClassDetail { view, enrollments })
    }

    pub async fn enrollments(&self, id: i64, now: DateTime<Utc>) -> Result<ClassRoster> {
        let counted = self.find_counted(id).await?;
        let enrollments = self.roster(id).await?;
        let class = self.view(counted, now).await?;

        Ok(ClassRoster { class, enrollments })
    }

    /// Classes run by `trainer_id`. Anyone may look, except that a trainer
    /// may only look at their own schedule.
    pub async fn trainer_classes(
        &self,
        trainer_id: i64,
        caller: Option<&Claims>,
        now: DateTime<Utc>,
    ) -> Result<TrainerClasses> {
        if let Some(caller) = caller {
            if caller.is_trainer() && caller.id != trainer_id {
                return Err(AppError::Forbidden("You can only view your own classes.".to_string()));
            }
        }

        let trainer = self
            .user_repo
            .find_by_id(trainer_id)
            .await?
            .filter(|user| user.role == Role::Trainer)
            .ok_or_else(|| AppError::NotFound("Trainer not found.".to_string()))?;

        let classes = self.class_repo.list(ClassFilter {
            trainer_id: Some(trainer_id),
            ..Default::default()
        }).await?;

        Ok(TrainerClasses {
            trainer,
            classes: self.views(classes, now).await?,
        })
    }

    pub async fn my_classes(&self, caller: &Claims, now: DateTime<Utc>) -> Result<TrainerClasses> {
        if !caller.is_trainer() {
            return Err(AppError::Forbidden("Only trainers can view their classes.".to_string()));
        }
        self.trainer_classes(caller.id, Some(caller), now).await
    }

    /// A user's bookings, soonest class first.
    pub async fn user_classes(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<EnrollmentWithClass>> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        let mut bookings = Vec::new();
        for (enrollment, class) in self.enrollment_repo.list_for_user(user_id).await? {
            let enrollment_count = self.enrollment_repo.count_for_class(class.id).await?;
            let class = self.view(CountedClass { class, enrollment_count }, now).await?;
            bookings.push(EnrollmentWithClass { enrollment, class });
        }

        Ok(bookings)
    }

    async fn require_trainer(&self, trainer_id: i64) -> Result<()> {
        match self.user_repo.find_by_id(trainer_id).await? {
            Some(user) if user.role == Role::Trainer => Ok(()),
            _ => Err(AppError::Validation(
                "trainerId must reference a user with the TRAINER role.".to_string(),
            )),
        }
    }

    async fn require_category(&self, category_id: i64) -> Result<()> {
        match self.category_repo.find_by_id(category_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("Category not found.".to_string())),
        }
    }

    pub async fn create(
        &self,
        request: CreateClassRequest,
        created_by_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ClassView> {
        let title = non_blank(request.title);
        let (Some(trainer_id), Some(title), Some(start_raw), Some(end_raw)) =
            (request.trainer_id, title, request.start_time, request.end_time)
        else {
            return Err(AppError::Validation(
                "trainerId, title, startTime and endTime are required.".to_string(),
            ));
        };

        let (start_time, end_time) = parse_window(&start_raw, &end_raw)?;
        check_window(start_time, end_time)?;
        check_capacity(request.capacity)?;
        let required_role = parse_optional_role(request.required_role.as_deref())?;

        self.require_trainer(trainer_id).await?;
        if let Some(category_id) = request.category_id {
            self.require_category(category_id).await?;
        }

        let class = self.class_repo.create(NewClass {
            title,
            description: non_blank(request.description),
            start_time,
            end_time,
            capacity: request.capacity,
            required_role,
            trainer_id,
            created_by_id,
            category_id: request.category_id,
        }).await?;

        tracing::info!("Class {} created by user {}", class.id, created_by_id);

        self.view(CountedClass { class, enrollment_count: 0 }, now).await
    }

    pub async fn update(
        &self,
        id: i64,
        request: UpdateClassRequest,
        now: DateTime<Utc>,
    ) -> Result<ClassView> {
        let CountedClass { mut class, enrollment_count } = self.find_counted(id).await?;

        if let Some(title) = request.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(AppError::Validation("title cannot be empty.".to_string()));
            }
            class.title = title;
        }
        if let Some(description) = request.description {
            class.description = non_blank(description);
        }

        if request.start_time.is_some() || request.end_time.is_some() {
            let start_raw = request.start_time.unwrap_or_else(|| class.start_time.to_rfc3339());
            let end_raw = request.end_time.unwrap_or_else(|| class.end_time.to_rfc3339());
            let (start_time, end_time) = parse_window(&start_raw, &end_raw)?;
            check_window(start_time, end_time)?;
            class.start_time = start_time;
            class.end_time = end_time;
        }

        if let Some(capacity) = request.capacity {
            check_capacity(capacity)?;
            if let Some(capacity) = capacity {
                if capacity < enrollment_count {
                    return Err(AppError::Validation(format!(
                        "capacity cannot be less than current enrollment count ({}).",
                        enrollment_count
                    )));
                }
            }
            class.capacity = capacity;
        }

        if let Some(required_role) = request.required_role {
            class.required_role = parse_optional_role(required_role.as_deref())?;
        }

        if let Some(trainer_id) = request.trainer_id {
            self.require_trainer(trainer_id).await?;
            class.trainer_id = trainer_id;
        }

        if let Some(category_id) = request.category_id {
            if let Some(category_id) = category_id {
                self.require_category(category_id).await?;
            }
            class.category_id = category_id;
        }

        let class = self.class_repo.update(class).await?;
        tracing::info!("Class {} updated", class.id);

        self.view(CountedClass { class, enrollment_count }, now).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.find_counted(id).await?;
        self.class_repo.delete(id).await?;
        tracing::info!("Class {} deleted", id);
        Ok(())
    }
}
