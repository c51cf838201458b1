//! Profile, order history and dashboard figures.

use thiserror::Error;

use clothaura_core::UserId;

use crate::db::{CatalogStore, OrderStore, RepositoryError, UserStore};
use crate::models::{DashboardStats, Order, OrderWithItems, User};
use crate::services::{ErrorKind, ServiceError};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ServiceError for AccountError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_) => ErrorKind::NotFound,
            Self::Repository(e) => e.kind(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "not_found",
            Self::Repository(e) => e.code(),
        }
    }
}

/// Read-only views over a shopper's account and the shop as a whole.
pub struct AccountService<'a> {
    users: &'a dyn UserStore,
    catalog: &'a dyn CatalogStore,
    orders: &'a dyn OrderStore,
}

impl<'a> AccountService<'a> {
    #[must_use]
    pub const fn new(
        users: &'a dyn UserStore,
        catalog: &'a dyn CatalogStore,
        orders: &'a dyn OrderStore,
    ) -> Self {
        Self {
            users,
            catalog,
            orders,
        }
    }

    /// # Errors
    ///
    /// Returns `AccountError::UserNotFound` if the user has been deleted.
    pub async fn profile(&self, user_id: UserId) -> Result<User, AccountError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AccountError::UserNotFound(user_id))
    }

    /// A user's orders with their lines, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Repository` if the query fails.
    pub async fn orders(&self, user_id: UserId) -> Result<Vec<OrderWithItems>, AccountError> {
        Ok(self.orders.list_for_user(user_id).await?)
    }

    /// Every order, newest first, with shop-wide counts.
    ///
    /// Revenue counts paid, shipped and delivered orders only.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Repository` if any query fails.
    pub async fn dashboard(&self) -> Result<(Vec<Order>, DashboardStats), AccountError> {
        let (orders, total_revenue, user_count, product_count) = tokio::try_join!(
            self.orders.list_all(),
            self.orders.settled_revenue(),
            self.users.count(),
            self.catalog.count(),
        )?;

        let stats = DashboardStats {
            total_revenue,
            user_count,
            product_count,
            order_count: i64::try_from(orders.len()).unwrap_or(i64::MAX),
        };
        Ok((orders, stats))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use clothaura_core::{Email, OrderStatus};

    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::models::{NewOrder, NewOrderItem, NewProduct, NewUser};

    async fn user(store: &MemoryStore, email: &str) -> User {
        UserStore::create(
            store,
            NewUser {
                name: "Ravi".into(),
                email: Email::parse(email).unwrap(),
                password_hash: clothaura_core::PasswordHash::new("$argon2id$stub".into()),
                mobile: None,
            },
        )
        .await
        .unwrap()
    }

    async fn order(store: &MemoryStore, user: &User, gateway_id: &str, status: OrderStatus) {
        let product: NewProduct = serde_yaml::from_str("name: Scarf\nprice: \"300\"\n").unwrap();
        let product = CatalogStore::create(store, product).await.unwrap();
        store
            .create_order(NewOrder {
                user_id: user.id,
                total_amount: Decimal::from(300),
                payment_id: format!("pay_{gateway_id}"),
                gateway_order_id: gateway_id.into(),
                status,
                address: "Not Provided".into(),
                items: vec![NewOrderItem {
                    product_id: product.id,
                    product_name: product.name,
                    qty: 1,
                    unit_price: Decimal::from(300),
                }],
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_orders_are_scoped_to_user() {
        let store = MemoryStore::new();
        let ravi = user(&store, "ravi@example.com").await;
        let meera = user(&store, "meera@example.com").await;
        order(&store, &ravi, "order_a", OrderStatus::Paid).await;
        order(&store, &meera, "order_b", OrderStatus::Paid).await;
        order(&store, &ravi, "order_c", OrderStatus::Paid).await;

        let service = AccountService::new(&store, &store, &store);
        let history = service.orders(ravi.id).await.unwrap();

        let ids: Vec<_> = history
            .iter()
            .map(|o| o.order.gateway_order_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["order_c", "order_a"]);
        assert!(history.iter().all(|o| o.items.len() == 1));
    }

    #[tokio::test]
    async fn test_dashboard_revenue_counts_settled_orders() {
        let store = MemoryStore::new();
        let ravi = user(&store, "ravi@example.com").await;
        order(&store, &ravi, "order_a", OrderStatus::Paid).await;
        order(&store, &ravi, "order_b", OrderStatus::Cancelled).await;
        order(&store, &ravi, "order_c", OrderStatus::Delivered).await;

        let (orders, stats) = AccountService::new(&store, &store, &store)
            .dashboard()
            .await
            .unwrap();

        assert_eq!(orders.len(), 3);
        assert_eq!(stats.total_revenue, Decimal::from(600));
        assert_eq!(stats.user_count, 1);
        assert_eq!(stats.product_count, 3);
        assert_eq!(stats.order_count, 3);
    }

    #[tokio::test]
    async fn test_profile_missing_user() {
        let store = MemoryStore::new();
        let err = AccountService::new(&store, &store, &store)
            .profile(UserId::new(9))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
