use crate::{
    auth::AuthUser,
    entities::{product, wishlist_item, Product, WishlistItem},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Wishlist entry together with the product it points at
#[derive(Debug, Clone)]
pub struct WishlistEntry {
    pub item: wishlist_item::Model,
    pub product: product::Model,
}

/// Wishlist service. Every operation is scoped to the calling user.
#[derive(Clone)]
pub struct WishlistService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl WishlistService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, caller))]
    pub async fn list(&self, caller: &AuthUser) -> Result<Vec<WishlistEntry>, ServiceError> {
        let rows = WishlistItem::find()
            .filter(wishlist_item::Column::UserId.eq(caller.user_id))
            .order_by_desc(wishlist_item::Column::CreatedAt)
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        let entries = rows
            .into_iter()
            .filter_map(|(item, product)| product.map(|product| WishlistEntry { item, product }))
            .collect();
        Ok(entries)
    }

    #[instrument(skip(self, caller))]
    pub async fn get(&self, caller: &AuthUser, id: Uuid) -> Result<WishlistEntry, ServiceError> {
        let (item, product) = WishlistItem::find_by_id(id)
            .filter(wishlist_item::Column::UserId.eq(caller.user_id))
            .find_also_related(Product)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Wishlist entry {} not found", id)))?;

        let product = product.ok_or_else(|| {
            ServiceError::InternalError("wishlist entry without product".to_string())
        })?;
        Ok(WishlistEntry { item, product })
    }

    /// Adds a product to the caller's wishlist; the (user, product) pair is
    /// unique.
    #[instrument(skip(self, caller))]
    pub async fn add(
        &self,
        caller: &AuthUser,
        product_id: Uuid,
    ) -> Result<WishlistEntry, ServiceError> {
        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let existing = WishlistItem::find()
            .filter(wishlist_item::Column::UserId.eq(caller.user_id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Product is already on your wishlist".to_string(),
            ));
        }

        let model = wishlist_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(caller.user_id),
            product_id: Set(product_id),
            created_at: Set(Utc::now()),
        };
        let item = model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::WishlistItemAdded {
                user_id: caller.user_id,
                product_id,
            })
            .await;

        Ok(WishlistEntry { item, product })
    }

    #[instrument(skip(self, caller))]
    pub async fn remove(&self, caller: &AuthUser, id: Uuid) -> Result<(), ServiceError> {
        let entry = WishlistItem::find_by_id(id)
            .filter(wishlist_item::Column::UserId.eq(caller.user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Wishlist entry {} not found", id)))?;

        entry.delete(&*self.db).await?;
        Ok(())
    }
}
