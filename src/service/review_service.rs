use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::{ReviewRepository, UserRepository},
};

pub struct ReviewService {
    review_repo: Arc<dyn ReviewRepository>,
    user_repo: Arc<dyn UserRepository>,
}

fn trainer_not_found() -> AppError {
    AppError::NotFound("Trainer not found.".to_string())
}

impl ReviewService {
    pub fn new(review_repo: Arc<dyn ReviewRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self { review_repo, user_repo }
    }

    async fn find_trainer(&self, trainer_id: i64) -> Result<User> {
        self.user_repo
            .find_by_id(trainer_id)
            .await?
            .filter(|user| user.role == Role::Trainer)
            .ok_or_else(trainer_not_found)
    }

    async fn profile(&self, trainer: User) -> Result<(TrainerProfile, Vec<Review>)> {
        let reviews = self.review_repo.list_for_trainer(trainer.id).await?;
        let stats = RatingStats::from_ratings(reviews.iter().map(|r| r.rating));

        Ok((
            TrainerProfile {
                user: trainer,
                total_reviews: stats.total_reviews,
                average_rating: stats.average_rating,
            },
            reviews,
        ))
    }

    async fn with_people(&self, reviews: Vec<Review>) -> Result<Vec<ReviewView>> {
        let mut users: HashMap<i64, Option<User>> = HashMap::new();
        let mut views = Vec::with_capacity(reviews.len());

        for review in reviews {
            for id in [review.reviewer_id, review.trainer_id] {
                if !users.contains_key(&id) {
                    let user = self.user_repo.find_by_id(id).await?;
                    users.insert(id, user);
                }
            }
            views.push(ReviewView {
                reviewer: users.get(&review.reviewer_id).cloned().flatten(),
                trainer: users.get(&review.trainer_id).cloned().flatten(),
                review,
            });
        }

        Ok(views)
    }

    pub async fn create(
        &self,
        reviewer_id: i64,
        request: CreateReviewRequest,
    ) -> Result<ReviewView> {
        let comment = request.comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        let (Some(trainer_id), Some(comment), Some(rating)) =
            (request.trainer_id, comment, request.rating)
        else {
            return Err(AppError::Validation(
                "trainerId, comment and rating are required.".to_string(),
            ));
        };

        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(AppError::Validation("rating must be between 1 and 5.".to_string()));
        }

        let reviewer = self
            .user_repo
            .find_by_id(reviewer_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reviewer not found.".to_string()))?;
        let trainer = self.find_trainer(trainer_id).await?;

        let review = self.review_repo.create(reviewer.id, trainer.id, rating, &comment).await?;
        tracing::info!("User {} reviewed trainer {} ({} stars)", reviewer.id, trainer.id, rating);

        Ok(ReviewView {
            review,
            reviewer: Some(reviewer),
            trainer: Some(trainer),
        })
    }

    pub async fn list(&self) -> Result<Vec<ReviewView>> {
        let reviews = self.review_repo.list().await?;
        self.with_people(reviews).await
    }

    pub async fn summary(&self) -> Result<RatingStats> {
        let reviews = self.review_repo.list().await?;
        Ok(RatingStats::from_ratings(reviews.iter().map(|r| r.rating)))
    }

    pub async fn for_trainer(&self, trainer_id: i64) -> Result<TrainerReviews> {
        let trainer = self.find_trainer(trainer_id).await?;
        let (profile, reviews) = self.profile(trainer).await?;
        let stats = RatingStats::from_ratings(reviews.iter().map(|r| r.rating));

        Ok(TrainerReviews {
            trainer: profile,
            stats,
            reviews: self.with_people(reviews).await?,
        })
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.review_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Review not found.".to_string()))?;

        self.review_repo.delete(id).await?;
        tracing::info!("Review {} deleted", id);
        Ok(())
    }

    pub async fn trainers(&self) -> Result<Vec<TrainerProfile>> {
        let mut profiles = Vec::new();
        for trainer in self.user_repo.list_by_role(Role::Trainer).await? {
            profiles.push(self.profile(trainer).await?.0);
        }
        Ok(profiles)
    }

    pub async fn trainer(&self, trainer_id: i64) -> Result<TrainerProfile> {
        let trainer = self.find_trainer(trainer_id).await?;
        Ok(self.profile(trainer).await?.0)
    }
}
