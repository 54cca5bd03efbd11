use crate::{
    entities::{category, product, product_image, Category, Product, ProductImage},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    FromQueryResult, JoinType, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Number of products returned by the latest-products view
pub const LATEST_PRODUCTS_LIMIT: u64 = 8;

/// Catalog service managing products, categories and product images.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// Sort orders accepted by the product listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductOrdering {
    PriceAsc,
    PriceDesc,
    UpdatedAtAsc,
    #[default]
    UpdatedAtDesc,
}

impl ProductOrdering {
    /// Parses the signed ordering parameter (`price`, `-price`,
    /// `updated_at`, `-updated_at`).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "price" => Some(Self::PriceAsc),
            "-price" => Some(Self::PriceDesc),
            "updated_at" => Some(Self::UpdatedAtAsc),
            "-updated_at" => Some(Self::UpdatedAtDesc),
            _ => None,
        }
    }
}

/// Search/filter parameters for the product listing
#[derive(Debug, Clone, Default)]
pub struct ProductSearchQuery {
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub ordering: ProductOrdering,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Clone)]
pub struct CreateProductInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category_id: Option<Option<Uuid>>,
}

/// Category annotated with how many products reference it
#[derive(Debug, Clone, Serialize, Deserialize, FromQueryResult)]
pub struct CategoryWithCount {
    pub id: Uuid,
    pub name: String,
    pub product_count: i64,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Lists products matching the query, returning the page and the total
    /// match count.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        query: ProductSearchQuery,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let mut select = Product::find();

        if let Some(term) = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            let pattern = format!("%{}%", term);
            select = select.filter(
                Condition::any()
                    .add(product::Column::Name.like(pattern.clone()))
                    .add(product::Column::Description.like(pattern)),
            );
        }
        if let Some(category_id) = query.category_id {
            select = select.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(min_price) = query.min_price {
            select = select.filter(product::Column::Price.gte(min_price));
        }
        if let Some(max_price) = query.max_price {
            select = select.filter(product::Column::Price.lte(max_price));
        }

        select = match query.ordering {
            ProductOrdering::PriceAsc => select.order_by_asc(product::Column::Price),
            ProductOrdering::PriceDesc => select.order_by_desc(product::Column::Price),
            ProductOrdering::UpdatedAtAsc => select.order_by_asc(product::Column::UpdatedAt),
            ProductOrdering::UpdatedAtDesc => select.order_by_desc(product::Column::UpdatedAt),
        };

        let per_page = query.per_page.clamp(1, 100);
        let paginator = select.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let page = query.page.max(1);
        let products = paginator.fetch_page(page - 1).await?;

        Ok((products, total))
    }

    /// The most recently created products, newest first, capped at
    /// [`LATEST_PRODUCTS_LIMIT`].
    #[instrument(skip(self))]
    pub async fn latest_products(&self) -> Result<Vec<product::Model>, ServiceError> {
        let products = Product::find()
            .order_by_desc(product::Column::CreatedAt)
            .limit(LATEST_PRODUCTS_LIMIT)
            .all(&*self.db)
            .await?;
        Ok(products)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        if input.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "price cannot be negative".to_string(),
            ));
        }
        if let Some(category_id) = input.category_id {
            self.get_category(category_id).await?;
        }

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            category_id: Set(input.category_id),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let product = model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product.id))
            .await;

        info!("Created product {}", product.id);
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        let product = self.get_product(id).await?;

        if let Some(price) = input.price {
            if price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "price cannot be negative".to_string(),
                ));
            }
        }
        if let Some(Some(category_id)) = input.category_id {
            self.get_category(category_id).await?;
        }

        let mut model: product::ActiveModel = product.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(description) = input.description {
            model.description = Set(description);
        }
        if let Some(price) = input.price {
            model.price = Set(price);
        }
        if let Some(category_id) = input.category_id {
            model.category_id = Set(category_id);
        }
        model.updated_at = Set(Utc::now());

        let product = model.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::ProductUpdated(product.id))
            .await;
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let product = self.get_product(id).await?;
        product.delete(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductDeleted(id))
            .await;
        info!("Deleted product {}", id);
        Ok(())
    }

    /// Lists all categories with their product counts.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<CategoryWithCount>, ServiceError> {
        let categories = Category::find()
            .select_only()
            .column(category::Column::Id)
            .column(category::Column::Name)
            .column_as(Expr::col((product::Entity, product::Column::Id)).count(), "product_count")
            .join(JoinType::LeftJoin, category::Relation::Products.def())
            .group_by(category::Column::Id)
            .group_by(category::Column::Name)
            .order_by_asc(category::Column::Name)
            .into_model::<CategoryWithCount>()
            .all(&*self.db)
            .await?;
        Ok(categories)
    }

    #[instrument(skip(self))]
    pub async fn get_category(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        Category::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn create_category(&self, name: String) -> Result<category::Model, ServiceError> {
        let existing = Category::find()
            .filter(category::Column::Name.eq(name.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Category '{}' already exists",
                name
            )));
        }

        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
        };
        let created = model.insert(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::CategoryCreated(created.id))
            .await;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        id: Uuid,
        name: String,
    ) -> Result<category::Model, ServiceError> {
        let category = self.get_category(id).await?;

        let taken = Category::find()
            .filter(category::Column::Name.eq(name.clone()))
            .filter(category::Column::Id.ne(id))
            .one(&*self.db)
            .await?;
        if taken.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Category '{}' already exists",
                name
            )));
        }

        let mut model: category::ActiveModel = category.into();
        model.name = Set(name);
        Ok(model.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        let category = self.get_category(id).await?;
        category.delete(&*self.db).await?;
        Ok(())
    }

    /// Lists images attached to a product.
    #[instrument(skip(self))]
    pub async fn list_product_images(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<product_image::Model>, ServiceError> {
        self.get_product(product_id).await?;
        let images = ProductImage::find()
            .filter(product_image::Column::ProductId.eq(product_id))
            .all(&*self.db)
            .await?;
        Ok(images)
    }

    #[instrument(skip(self))]
    pub async fn get_product_image(
        &self,
        product_id: Uuid,
        image_id: Uuid,
    ) -> Result<product_image::Model, ServiceError> {
        ProductImage::find_by_id(image_id)
            .filter(product_image::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Image {} not found", image_id)))
    }

    /// Attaches an image to the product referenced by the URL path.
    #[instrument(skip(self))]
    pub async fn add_product_image(
        &self,
        product_id: Uuid,
        url: String,
        alt_text: Option<String>,
    ) -> Result<product_image::Model, ServiceError> {
        self.get_product(product_id).await?;

        let model = product_image::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            url: Set(url),
            alt_text: Set(alt_text),
        };
        Ok(model.insert(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_product_image(
        &self,
        product_id: Uuid,
        image_id: Uuid,
    ) -> Result<(), ServiceError> {
        let image = self.get_product_image(product_id, image_id).await?;
        image.delete(&*self.db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_parses_signed_params() {
        assert_eq!(
            ProductOrdering::parse("price"),
            Some(ProductOrdering::PriceAsc)
        );
        assert_eq!(
            ProductOrdering::parse("-price"),
            Some(ProductOrdering::PriceDesc)
        );
        assert_eq!(
            ProductOrdering::parse("-updated_at"),
            Some(ProductOrdering::UpdatedAtDesc)
        );
        assert_eq!(ProductOrdering::parse("name"), None);
    }
}
