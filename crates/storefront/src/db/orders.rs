//! Order repository for database operations.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use clothaura_core::{OrderId, OrderItemId, OrderStatus, ProductId, UserId};

use super::{OrderStore, RepositoryError};
use crate::models::{NewOrder, Order, OrderItem, OrderWithItems};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    total_amount: Decimal,
    payment_id: Option<String>,
    gateway_order_id: Option<String>,
    status: OrderStatus,
    address: String,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            total_amount: row.total_amount,
            payment_id: row.payment_id,
            gateway_order_id: row.gateway_order_id,
            status: row.status,
            address: row.address,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    order_id: i32,
    product_id: Option<i32>,
    product_name: String,
    qty: i32,
    unit_price: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let qty = u32::try_from(row.qty).map_err(|_| {
            RepositoryError::DataCorruption(format!("order item {}: qty {}", row.id, row.qty))
        })?;

        Ok(Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: row.product_id.map(ProductId::new),
            product_name: row.product_name,
            qty,
            unit_price: row.unit_price,
        })
    }
}

const ORDER_COLUMNS: &str =
    "id, user_id, total_amount, payment_id, gateway_order_id, status, address, created_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, qty, unit_price";

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    #[tracing::instrument(skip(self, order), fields(gateway_order_id = %order.gateway_order_id, items = order.items.len()))]
    async fn create_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO storefront.orders
                (user_id, total_amount, payment_id, gateway_order_id, status, address)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.user_id)
        .bind(order.total_amount)
        .bind(&order.payment_id)
        .bind(&order.gateway_order_id)
        .bind(order.status)
        .bind(&order.address)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "order already recorded for gateway order"))?;

        for item in &order.items {
            let qty = i32::try_from(item.qty).map_err(|_| {
                RepositoryError::DataCorruption(format!("qty {} out of range", item.qty))
            })?;

            sqlx::query(
                r"
                INSERT INTO storefront.order_items
                    (order_id, product_id, product_name, qty, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(row.id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(qty)
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_write(e, "duplicate order line"))?;
        }

        // Dropping `tx` on any early return above rolls everything back.
        tx.commit().await?;

        Ok(row.into())
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.orders WHERE gateway_order_id = $1"
        ))
        .bind(gateway_order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM storefront.order_items WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let orders = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM storefront.orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM storefront.order_items WHERE order_id = ANY($1) ORDER BY id"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let item: OrderItem = row.try_into()?;
            by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|row| {
                let order: Order = row.into();
                let items = by_order.remove(&order.id).unwrap_or_default();
                OrderWithItems { order, items }
            })
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.orders ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM storefront.orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn settled_revenue(&self) -> Result<Decimal, RepositoryError> {
        let total: Option<Decimal> = sqlx::query_scalar(
            r"
            SELECT SUM(total_amount) FROM storefront.orders
            WHERE status IN ('paid', 'shipped', 'delivered')
            ",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(total.unwrap_or_default())
    }
}
