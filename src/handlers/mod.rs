pub mod activation;
pub mod admin_stats;
pub mod carts;
pub mod categories;
pub mod common;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod wishlist;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<crate::services::CatalogService>,
    pub reviews: Arc<crate::services::ReviewService>,
    pub wishlist: Arc<crate::services::WishlistService>,
    pub carts: Arc<crate::services::CartService>,
    pub orders: Arc<crate::services::OrderService>,
    pub reporting: Arc<crate::services::ReportingService>,
}

impl AppServices {
    /// Build the service container shared by all handlers.
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            catalog: Arc::new(crate::services::CatalogService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            reviews: Arc::new(crate::services::ReviewService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            wishlist: Arc::new(crate::services::WishlistService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            carts: Arc::new(crate::services::CartService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            orders: Arc::new(crate::services::OrderService::new(
                db_pool.clone(),
                event_sender,
            )),
            reporting: Arc::new(crate::services::ReportingService::new(db_pool)),
        }
    }
}
