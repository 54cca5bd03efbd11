use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Database entity for user accounts
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(column_type = "Text")]
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::activation_token::Entity")]
    ActivationTokens,
    #[sea_orm(has_many = "crate::entities::cart::Entity")]
    Carts,
    #[sea_orm(has_many = "crate::entities::order::Entity")]
    Orders,
    #[sea_orm(has_many = "crate::entities::review::Entity")]
    Reviews,
    #[sea_orm(has_many = "crate::entities::wishlist_item::Entity")]
    WishlistItems,
}

impl Related<super::activation_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ActivationTokens.def()
    }
}

impl Related<crate::entities::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
