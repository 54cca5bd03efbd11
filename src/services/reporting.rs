use crate::errors::ServiceError;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, FromQueryResult, Statement};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// One month of sales, keyed by the calendar month of order placement
#[derive(Debug, Clone, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct MonthlySales {
    /// Calendar month rendered as "YYYY-MM"
    pub month: String,
    /// Sum over line items of unit_price x quantity
    pub total_sales: f64,
    pub order_count: i64,
}

/// Product ranked by how many order lines reference it
#[derive(Debug, Clone, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct PopularProduct {
    pub id: Uuid,
    pub name: String,
    pub total_ordered: i64,
    pub avg_rating: Option<f64>,
}

/// User ranked by total spend across order lines
#[derive(Debug, Clone, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct TopBuyer {
    pub id: Uuid,
    pub email: String,
    pub total_spent: f64,
    pub order_count: i64,
}

/// Recently placed order with its derived total
#[derive(Debug, Clone, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct RecentOrder {
    pub id: Uuid,
    pub user_email: String,
    pub total_amount: f64,
    pub placed_at: DateTime<Utc>,
}

/// Dashboard payload returned by the admin statistics endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminStatistics {
    pub monthly_sales: Vec<MonthlySales>,
    pub popular_products: Vec<PopularProduct>,
    pub top_buyers: Vec<TopBuyer>,
    pub recent_orders: Vec<RecentOrder>,
    pub generated_at: DateTime<Utc>,
}

const MONTHLY_SALES_WINDOW_DAYS: i64 = 365;
const POPULAR_PRODUCTS_LIMIT: u32 = 10;
const TOP_BUYERS_LIMIT: u32 = 10;
const RECENT_ORDERS_LIMIT: u32 = 5;

/// Read-only reporting over the order, product and user stores.
///
/// Each section is one grouped query; line totals are computed per row
/// (unit_price x quantity) and then summed, never as a product of
/// pre-summed columns.
#[derive(Clone)]
pub struct ReportingService {
    db: Arc<DatabaseConnection>,
}

impl ReportingService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Builds the dashboard snapshot. Performs no writes.
    #[instrument(skip(self))]
    pub async fn admin_statistics(&self) -> Result<AdminStatistics, ServiceError> {
        info!("Generating admin statistics");

        let end = Utc::now();
        let start = end - Duration::days(MONTHLY_SALES_WINDOW_DAYS);

        let (monthly_sales, popular_products, top_buyers, recent_orders) = tokio::try_join!(
            self.monthly_sales(start, end),
            self.popular_products(),
            self.top_buyers(),
            self.recent_orders(),
        )?;

        Ok(AdminStatistics {
            monthly_sales,
            popular_products,
            top_buyers,
            recent_orders,
            generated_at: end,
        })
    }

    fn backend(&self) -> Result<DatabaseBackend, ServiceError> {
        match self.db.get_database_backend() {
            backend @ (DatabaseBackend::Postgres | DatabaseBackend::Sqlite) => Ok(backend),
            other => Err(ServiceError::InternalError(format!(
                "unsupported database backend for reporting: {:?}",
                other
            ))),
        }
    }

    /// Orders grouped by calendar month over the trailing window.
    async fn monthly_sales(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MonthlySales>, ServiceError> {
        let backend = self.backend()?;
        let sql = match backend {
            DatabaseBackend::Postgres => {
                r#"
                SELECT to_char(o.placed_at, 'YYYY-MM') AS month,
                       CAST(COALESCE(SUM(oi.unit_price * oi.quantity), 0) AS DOUBLE PRECISION) AS total_sales,
                       COUNT(DISTINCT o.id) AS order_count
                FROM orders o
                LEFT JOIN order_items oi ON oi.order_id = o.id
                WHERE o.placed_at >= $1 AND o.placed_at <= $2
                GROUP BY month
                ORDER BY month ASC
                "#
            }
            _ => {
                r#"
                SELECT strftime('%Y-%m', o.placed_at) AS month,
                       CAST(COALESCE(SUM(oi.unit_price * oi.quantity), 0) AS REAL) AS total_sales,
                       COUNT(DISTINCT o.id) AS order_count
                FROM orders o
                LEFT JOIN order_items oi ON oi.order_id = o.id
                WHERE o.placed_at >= ? AND o.placed_at <= ?
                GROUP BY month
                ORDER BY month ASC
                "#
            }
        };

        let rows = MonthlySales::find_by_statement(Statement::from_sql_and_values(
            backend,
            sql,
            [start.into(), end.into()],
        ))
        .all(&*self.db)
        .await?;
        Ok(rows)
    }

    /// Products ranked by order-line references, with mean review rating.
    /// The rating average runs in a subquery so the line join cannot skew it.
    async fn popular_products(&self) -> Result<Vec<PopularProduct>, ServiceError> {
        let backend = self.backend()?;
        let cast = match backend {
            DatabaseBackend::Postgres => "DOUBLE PRECISION",
            _ => "REAL",
        };
        let sql = format!(
            r#"
            SELECT p.id, p.name,
                   COUNT(oi.id) AS total_ordered,
                   (SELECT CAST(AVG(r.rating) AS {cast})
                    FROM reviews r WHERE r.product_id = p.id) AS avg_rating
            FROM products p
            LEFT JOIN order_items oi ON oi.product_id = p.id
            GROUP BY p.id, p.name
            ORDER BY total_ordered DESC
            LIMIT {limit}
            "#,
            cast = cast,
            limit = POPULAR_PRODUCTS_LIMIT,
        );

        let rows = PopularProduct::find_by_statement(Statement::from_string(backend, sql))
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    /// Users ranked by spend; users without orders drop out of the join.
    async fn top_buyers(&self) -> Result<Vec<TopBuyer>, ServiceError> {
        let backend = self.backend()?;
        let cast = match backend {
            DatabaseBackend::Postgres => "DOUBLE PRECISION",
            _ => "REAL",
        };
        let sql = format!(
            r#"
            SELECT u.id, u.email,
                   CAST(SUM(oi.unit_price * oi.quantity) AS {cast}) AS total_spent,
                   COUNT(DISTINCT o.id) AS order_count
            FROM users u
            JOIN orders o ON o.user_id = u.id
            JOIN order_items oi ON oi.order_id = o.id
            GROUP BY u.id, u.email
            ORDER BY total_spent DESC
            LIMIT {limit}
            "#,
            cast = cast,
            limit = TOP_BUYERS_LIMIT,
        );

        let rows = TopBuyer::find_by_statement(Statement::from_string(backend, sql))
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    /// The most recently placed orders, annotated with owner email and total.
    async fn recent_orders(&self) -> Result<Vec<RecentOrder>, ServiceError> {
        let backend = self.backend()?;
        let cast = match backend {
            DatabaseBackend::Postgres => "DOUBLE PRECISION",
            _ => "REAL",
        };
        let sql = format!(
            r#"
            SELECT o.id, u.email AS user_email,
                   CAST(COALESCE(SUM(oi.unit_price * oi.quantity), 0) AS {cast}) AS total_amount,
                   o.placed_at
            FROM orders o
            JOIN users u ON u.id = o.user_id
            LEFT JOIN order_items oi ON oi.order_id = o.id
            GROUP BY o.id, u.email, o.placed_at
            ORDER BY o.placed_at DESC
            LIMIT {limit}
            "#,
            cast = cast,
            limit = RECENT_ORDERS_LIMIT,
        );

        let rows = RecentOrder::find_by_statement(Statement::from_string(backend, sql))
            .all(&*self.db)
            .await?;
        Ok(rows)
    }
}
