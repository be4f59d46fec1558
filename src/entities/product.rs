use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Product entity
///
/// While a row exists, `file_path` and `image_path` always reference blobs
/// present in their respective stores; the lifecycle service maintains that
/// invariant across create, update, and delete.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Primary key, immutable once created
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Product name
    pub name: String,

    /// Product description
    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Price in the smallest currency unit
    pub price_cents: i64,

    /// Key of the purchasable asset in the private blob store
    pub file_path: String,

    /// Public-relative key of the preview image (`/products/...`)
    pub image_path: String,

    /// Whether the product can currently be purchased
    pub is_available_for_purchase: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
