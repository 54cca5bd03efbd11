// Domain services used by the HTTP handlers
pub mod carts;
pub mod catalog;
pub mod orders;
pub mod reporting;
pub mod reviews;
pub mod wishlist;

pub use carts::CartService;
pub use catalog::CatalogService;
pub use orders::OrderService;
pub use reporting::ReportingService;
pub use reviews::ReviewService;
pub use wishlist::WishlistService;
