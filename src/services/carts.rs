use crate::{
    auth::AuthUser,
    entities::{cart, cart_item, product, Cart, CartItem, Product},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Cart line together with the product it references
#[derive(Debug, Clone)]
pub struct CartLine {
    pub id: Uuid,
    pub product: product::Model,
    pub quantity: i32,
}

/// A cart with its lines
#[derive(Debug, Clone)]
pub struct CartWithItems {
    pub cart: cart::Model,
    pub items: Vec<CartLine>,
}

#[derive(Debug, Clone)]
pub struct AddToCartInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Shopping cart service. Carts are owned: every lookup filters by the
/// calling user, so foreign carts are indistinguishable from missing ones.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn owned_cart(&self, caller: &AuthUser, cart_id: Uuid) -> Result<cart::Model, ServiceError> {
        Cart::find_by_id(cart_id)
            .filter(cart::Column::UserId.eq(caller.user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))
    }

    async fn load_lines(&self, cart_id: Uuid) -> Result<Vec<CartLine>, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        let lines = rows
            .into_iter()
            .filter_map(|(item, product)| {
                product.map(|product| CartLine {
                    id: item.id,
                    product,
                    quantity: item.quantity,
                })
            })
            .collect();
        Ok(lines)
    }

    /// Creates a new cart for the caller.
    #[instrument(skip(self, caller))]
    pub async fn create_cart(&self, caller: &AuthUser) -> Result<cart::Model, ServiceError> {
        let now = Utc::now();
        let model = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(caller.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let cart = model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartCreated(cart.id))
            .await;

        info!("Created cart {} for user {}", cart.id, caller.user_id);
        Ok(cart)
    }

    /// Lists the caller's carts, newest first.
    #[instrument(skip(self, caller))]
    pub async fn list_carts(&self, caller: &AuthUser) -> Result<Vec<CartWithItems>, ServiceError> {
        let carts = Cart::find()
            .filter(cart::Column::UserId.eq(caller.user_id))
            .order_by_desc(cart::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let mut out = Vec::with_capacity(carts.len());
        for cart in carts {
            let items = self.load_lines(cart.id).await?;
            out.push(CartWithItems { cart, items });
        }
        Ok(out)
    }

    #[instrument(skip(self, caller))]
    pub async fn get_cart(
        &self,
        caller: &AuthUser,
        cart_id: Uuid,
    ) -> Result<CartWithItems, ServiceError> {
        let cart = self.owned_cart(caller, cart_id).await?;
        let items = self.load_lines(cart.id).await?;
        Ok(CartWithItems { cart, items })
    }

    #[instrument(skip(self, caller))]
    pub async fn delete_cart(&self, caller: &AuthUser, cart_id: Uuid) -> Result<(), ServiceError> {
        let cart = self.owned_cart(caller, cart_id).await?;
        cart.delete(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartDeleted(cart_id))
            .await;
        Ok(())
    }

    /// Adds a product to the cart referenced by the URL path. The owning
    /// cart always comes from the path, never from the payload, and an
    /// existing line for the product absorbs the added quantity.
    #[instrument(skip(self, caller))]
    pub async fn add_item(
        &self,
        caller: &AuthUser,
        cart_id: Uuid,
        input: AddToCartInput,
    ) -> Result<CartLine, ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "quantity must be at least 1".to_string(),
            ));
        }

        self.owned_cart(caller, cart_id).await?;

        let product = Product::find_by_id(input.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("Product {} does not exist", input.product_id))
            })?;

        let txn = self.db.begin().await?;

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .filter(cart_item::Column::ProductId.eq(input.product_id))
            .one(&txn)
            .await?;

        let item = if let Some(item) = existing {
            let quantity = item.quantity + input.quantity;
            let mut model: cart_item::ActiveModel = item.into();
            model.quantity = Set(quantity);
            model.update(&txn).await?
        } else {
            let model = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart_id),
                product_id: Set(input.product_id),
                quantity: Set(input.quantity),
            };
            model.insert(&txn).await?
        };

        self.touch_cart(&txn, cart_id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id,
                product_id: input.product_id,
                quantity: input.quantity,
            })
            .await;

        Ok(CartLine {
            id: item.id,
            product,
            quantity: item.quantity,
        })
    }

    #[instrument(skip(self, caller))]
    pub async fn list_items(
        &self,
        caller: &AuthUser,
        cart_id: Uuid,
    ) -> Result<Vec<CartLine>, ServiceError> {
        self.owned_cart(caller, cart_id).await?;
        self.load_lines(cart_id).await
    }

    #[instrument(skip(self, caller))]
    pub async fn get_item(
        &self,
        caller: &AuthUser,
        cart_id: Uuid,
        item_id: Uuid,
    ) -> Result<CartLine, ServiceError> {
        self.owned_cart(caller, cart_id).await?;

        let (item, product) = CartItem::find_by_id(item_id)
            .filter(cart_item::Column::CartId.eq(cart_id))
            .find_also_related(Product)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        let product = product
            .ok_or_else(|| ServiceError::InternalError("cart item without product".to_string()))?;
        Ok(CartLine {
            id: item.id,
            product,
            quantity: item.quantity,
        })
    }

    #[instrument(skip(self, caller))]
    pub async fn update_item_quantity(
        &self,
        caller: &AuthUser,
        cart_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartLine, ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "quantity must be at least 1".to_string(),
            ));
        }

        self.owned_cart(caller, cart_id).await?;

        let item = CartItem::find_by_id(item_id)
            .filter(cart_item::Column::CartId.eq(cart_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        let mut model: cart_item::ActiveModel = item.into();
        model.quantity = Set(quantity);
        let item = model.update(&*self.db).await?;

        self.touch_cart(&*self.db, cart_id).await?;

        let product = Product::find_by_id(item.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::InternalError("cart item without product".to_string()))?;

        Ok(CartLine {
            id: item.id,
            product,
            quantity: item.quantity,
        })
    }

    #[instrument(skip(self, caller))]
    pub async fn remove_item(
        &self,
        caller: &AuthUser,
        cart_id: Uuid,
        item_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.owned_cart(caller, cart_id).await?;

        let item = CartItem::find_by_id(item_id)
            .filter(cart_item::Column::CartId.eq(cart_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        item.delete(&*self.db).await?;
        self.touch_cart(&*self.db, cart_id).await?;
        Ok(())
    }

    async fn touch_cart<C: sea_orm::ConnectionTrait>(
        &self,
        conn: &C,
        cart_id: Uuid,
    ) -> Result<(), ServiceError> {
        if let Some(cart) = Cart::find_by_id(cart_id).one(conn).await? {
            let mut model: cart::ActiveModel = cart.into();
            model.updated_at = Set(Utc::now());
            model.update(conn).await?;
        }
        Ok(())
    }
}
