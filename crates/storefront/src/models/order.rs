//! Order and order line types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use clothaura_core::{OrderId, OrderItemId, OrderStatus, ProductId, UserId};

/// Address recorded when the payment callback carries none.
pub const DEFAULT_ADDRESS: &str = "Not Provided";

/// A persisted order (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_amount: Decimal,
    pub payment_id: Option<String>,
    /// Gateway-side order reference; unique, so a replayed callback finds
    /// the existing order instead of creating another.
    pub gateway_order_id: Option<String>,
    pub status: OrderStatus,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

/// One product line of an order.
///
/// Name and unit price are snapshots taken at checkout; `product_id` becomes
/// `None` if the product is later removed from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub qty: u32,
    pub unit_price: Decimal,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.qty)
    }
}

/// An order together with its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Everything needed to insert an order and its lines in one transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub total_amount: Decimal,
    pub payment_id: String,
    pub gateway_order_id: String,
    pub status: OrderStatus,
    pub address: String,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub qty: u32,
    pub unit_price: Decimal,
}

/// Figures shown on the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardStats {
    /// Sum of totals over settled orders.
    pub total_revenue: Decimal,
    pub user_count: i64,
    pub product_count: i64,
    pub order_count: i64,
}
