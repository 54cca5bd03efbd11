use crate::{
    auth::AuthUser,
    entities::{cart, cart_item, order, order_item, Cart, CartItem, Order, OrderItem, PaymentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// An order with its lines and derived total
#[derive(Debug, Clone)]
pub struct OrderWithItems {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
    /// Sum of unit_price x quantity across the lines
    pub total_amount: Decimal,
}

fn derive_total(items: &[order_item::Model]) -> Decimal {
    items
        .iter()
        .map(|item| item.unit_price * Decimal::from(item.quantity))
        .sum()
}

/// Order service: checkout from a cart, owner-scoped reads, and the
/// payment-status transition driven by the payment flow.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Places an order from the caller's cart.
    ///
    /// Copies each cart line into an order line, snapshotting the current
    /// product price, then deletes the cart. Runs in one transaction so a
    /// cart is never half-converted. Payment status always starts pending,
    /// whatever the client sent.
    #[instrument(skip(self, caller))]
    pub async fn checkout(
        &self,
        caller: &AuthUser,
        cart_id: Uuid,
    ) -> Result<OrderWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = Cart::find_by_id(cart_id)
            .filter(cart::Column::UserId.eq(caller.user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;

        let lines = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .find_also_related(crate::entities::Product)
            .all(&txn)
            .await?;

        if lines.is_empty() {
            return Err(ServiceError::InvalidOperation(
                "Cannot place an order from an empty cart".to_string(),
            ));
        }

        let placed_at = Utc::now();
        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(caller.user_id),
            payment_status: Set(PaymentStatus::Pending),
            placed_at: Set(placed_at),
        };
        let order = order.insert(&txn).await?;

        let mut items = Vec::with_capacity(lines.len());
        for (line, product) in lines {
            let product = product.ok_or_else(|| {
                ServiceError::InvalidOperation(format!(
                    "Product {} is no longer available",
                    line.product_id
                ))
            })?;

            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(product.id),
                quantity: Set(line.quantity),
                // Price snapshot: later catalog edits must not reprice the order
                unit_price: Set(product.price),
            };
            items.push(item.insert(&txn).await?);
        }

        // The cart is consumed by checkout
        Cart::delete_by_id(cart.id).exec(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderPlaced {
                order_id: order.id,
                user_id: caller.user_id,
                placed_at,
            })
            .await;

        info!("Placed order {} from cart {}", order.id, cart_id);
        let total_amount = derive_total(&items);
        Ok(OrderWithItems {
            order,
            items,
            total_amount,
        })
    }

    /// The caller's orders, newest first, each with its derived total.
    #[instrument(skip(self, caller))]
    pub async fn list_orders(&self, caller: &AuthUser) -> Result<Vec<OrderWithItems>, ServiceError> {
        let orders = Order::find()
            .filter(order::Column::UserId.eq(caller.user_id))
            .order_by_desc(order::Column::PlacedAt)
            .all(&*self.db)
            .await?;

        if orders.is_empty() {
            return Ok(vec![]);
        }

        // One batched item fetch instead of a query per order
        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let all_items = OrderItem::find()
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .all(&*self.db)
            .await?;

        let mut by_order: HashMap<Uuid, Vec<order_item::Model>> = HashMap::new();
        for item in all_items {
            by_order.entry(item.order_id).or_default().push(item);
        }

        let result = orders
            .into_iter()
            .map(|order| {
                let items = by_order.remove(&order.id).unwrap_or_default();
                let total_amount = derive_total(&items);
                OrderWithItems {
                    order,
                    items,
                    total_amount,
                }
            })
            .collect();
        Ok(result)
    }

    #[instrument(skip(self, caller))]
    pub async fn get_order(
        &self,
        caller: &AuthUser,
        order_id: Uuid,
    ) -> Result<OrderWithItems, ServiceError> {
        let order = Order::find_by_id(order_id)
            .filter(order::Column::UserId.eq(caller.user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&*self.db)
            .await?;

        let total_amount = derive_total(&items);
        Ok(OrderWithItems {
            order,
            items,
            total_amount,
        })
    }

    /// Advances an order's payment status. Driven by the payment flow, not
    /// by order owners; only pending orders may transition.
    #[instrument(skip(self))]
    pub async fn update_payment_status(
        &self,
        order_id: Uuid,
        new_status: PaymentStatus,
    ) -> Result<order::Model, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order.payment_status;
        if old_status == new_status {
            return Ok(order);
        }
        if old_status != PaymentStatus::Pending {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} has already settled as {}",
                order_id, old_status
            )));
        }

        let mut model: order::ActiveModel = order.into();
        model.payment_status = Set(new_status);
        let order = model.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderPaymentStatusChanged {
                order_id,
                old_status,
                new_status,
            })
            .await;

        Ok(order)
    }
}
