use crate::{
    auth::AuthUser,
    entities::{review, Product, Review},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Review service. Listing is scoped to the caller's own reviews unless the
/// caller is staff; mutation always requires the author.
#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone)]
pub struct CreateReviewInput {
    pub rating: i16,
    pub body: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateReviewInput {
    pub rating: Option<i16>,
    pub body: Option<String>,
}

fn validate_rating(rating: i16) -> Result<(), ServiceError> {
    if !(1..=5).contains(&rating) {
        return Err(ServiceError::ValidationError(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
}

impl ReviewService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn product_must_exist(&self, product_id: Uuid) -> Result<(), ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Reviews for a product; staff see every review, other callers only
    /// their own.
    #[instrument(skip(self, caller))]
    pub async fn list_for_product(
        &self,
        caller: &AuthUser,
        product_id: Uuid,
    ) -> Result<Vec<review::Model>, ServiceError> {
        self.product_must_exist(product_id).await?;

        let mut select = Review::find().filter(review::Column::ProductId.eq(product_id));
        if !caller.is_staff() {
            select = select.filter(review::Column::UserId.eq(caller.user_id));
        }

        let reviews = select
            .order_by_desc(review::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(reviews)
    }

    #[instrument(skip(self, caller))]
    pub async fn get(
        &self,
        caller: &AuthUser,
        product_id: Uuid,
        review_id: Uuid,
    ) -> Result<review::Model, ServiceError> {
        let mut select = Review::find_by_id(review_id)
            .filter(review::Column::ProductId.eq(product_id));
        if !caller.is_staff() {
            select = select.filter(review::Column::UserId.eq(caller.user_id));
        }

        select
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Review {} not found", review_id)))
    }

    /// Creates a review authored by the caller. One review per
    /// (user, product).
    #[instrument(skip(self, caller))]
    pub async fn create(
        &self,
        caller: &AuthUser,
        product_id: Uuid,
        input: CreateReviewInput,
    ) -> Result<review::Model, ServiceError> {
        validate_rating(input.rating)?;
        self.product_must_exist(product_id).await?;

        let existing = Review::find()
            .filter(review::Column::ProductId.eq(product_id))
            .filter(review::Column::UserId.eq(caller.user_id))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "You have already reviewed this product".to_string(),
            ));
        }

        let now = Utc::now();
        let model = review::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            user_id: Set(caller.user_id),
            rating: Set(input.rating),
            body: Set(input.body),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let review = model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ReviewCreated {
                review_id: review.id,
                product_id,
            })
            .await;

        info!("Created review {} for product {}", review.id, product_id);
        Ok(review)
    }

    /// Updates a review. Only the author may update; the author stamp never
    /// changes.
    #[instrument(skip(self, caller))]
    pub async fn update(
        &self,
        caller: &AuthUser,
        product_id: Uuid,
        review_id: Uuid,
        input: UpdateReviewInput,
    ) -> Result<review::Model, ServiceError> {
        if let Some(rating) = input.rating {
            validate_rating(rating)?;
        }

        let review = self.get(caller, product_id, review_id).await?;
        if review.user_id != caller.user_id {
            return Err(ServiceError::Forbidden(
                "Only the review author may modify it".to_string(),
            ));
        }

        let mut model: review::ActiveModel = review.into();
        if let Some(rating) = input.rating {
            model.rating = Set(rating);
        }
        if let Some(body) = input.body {
            model.body = Set(body);
        }
        model.updated_at = Set(Utc::now());
        Ok(model.update(&*self.db).await?)
    }

    /// Deletes a review. Only the author may delete.
    #[instrument(skip(self, caller))]
    pub async fn delete(
        &self,
        caller: &AuthUser,
        product_id: Uuid,
        review_id: Uuid,
    ) -> Result<(), ServiceError> {
        let review = self.get(caller, product_id, review_id).await?;
        if review.user_id != caller.user_id {
            return Err(ServiceError::Forbidden(
                "Only the review author may delete it".to_string(),
            ));
        }

        review.delete(&*self.db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }
}
