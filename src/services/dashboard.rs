use crate::{
    entities::{order, product, Order, Product, User},
    errors::ServiceError,
};
use sea_orm::{
    sea_query::Alias, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

/// Read-only aggregates for the admin dashboard.
#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DatabaseConnection>,
}

/// Sales card: lifetime order volume.
#[derive(Debug, Serialize, ToSchema)]
pub struct SalesSummary {
    pub total_cents: i64,
    pub order_count: u64,
}

/// Customers card: headcount and per-user revenue.
#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerSummary {
    pub user_count: u64,
    /// Lifetime order total divided by user count; 0 when there are no users.
    pub average_order_cents: i64,
}

/// Products card: counts by purchase availability.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductSummary {
    pub available_count: u64,
    pub unavailable_count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub sales: SalesSummary,
    pub customers: CustomerSummary,
    pub products: ProductSummary,
}

impl DashboardService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<DashboardSummary, ServiceError> {
        let order_count = Order::find().count(&*self.db).await?;
        let total_cents = self.order_total_cents().await?;
        let user_count = User::find().count(&*self.db).await?;

        let average_order_cents = if user_count == 0 {
            0
        } else {
            total_cents / user_count as i64
        };

        let available_count = Product::find()
            .filter(product::Column::IsAvailableForPurchase.eq(true))
            .count(&*self.db)
            .await?;
        let unavailable_count = Product::find()
            .filter(product::Column::IsAvailableForPurchase.eq(false))
            .count(&*self.db)
            .await?;

        Ok(DashboardSummary {
            sales: SalesSummary {
                total_cents,
                order_count,
            },
            customers: CustomerSummary {
                user_count,
                average_order_cents,
            },
            products: ProductSummary {
                available_count,
                unavailable_count,
            },
        })
    }

    async fn order_total_cents(&self) -> Result<i64, ServiceError> {
        // SUM over an empty table is NULL; the cast keeps the decode type
        // stable across sqlite and postgres.
        let total: Option<Option<i64>> = Order::find()
            .select_only()
            .column_as(
                order::Column::PriceCents.sum().cast_as(Alias::new("bigint")),
                "total",
            )
            .into_tuple()
            .one(&*self.db)
            .await?;

        Ok(total.flatten().unwrap_or(0))
    }
}
