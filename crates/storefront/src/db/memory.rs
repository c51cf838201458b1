//! In-process implementation of the store traits.
//!
//! Used by unit and integration tests in place of `PostgreSQL`. Writes follow
//! the same constraints as the schema: unique emails, unique gateway order
//! ids, order lines must reference existing products, and `create_order` is
//! all-or-nothing.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use clothaura_core::{Email, OrderId, OrderItemId, PasswordHash, ProductId, UserId};

use super::{CatalogStore, OrderStore, RepositoryError, UserStore};
use crate::models::{
    NewOrder, NewProduct, NewUser, Order, OrderItem, OrderWithItems, Product, User,
};

#[derive(Default)]
struct State {
    users: BTreeMap<UserId, (User, PasswordHash)>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    items: Vec<OrderItem>,
    next_id: i32,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared in-memory user, catalog and order store.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove a product, detaching it from existing order lines.
    pub fn delete_product(&self, id: ProductId) -> bool {
        let mut state = self.lock();
        for item in &mut state.items {
            if item.product_id == Some(id) {
                item.product_id = None;
            }
        }
        state.products.remove(&id).is_some()
    }

    /// Change a product's list price in place.
    pub fn set_price(&self, id: ProductId, price: Decimal) -> bool {
        self.lock()
            .products
            .get_mut(&id)
            .map(|p| p.price = price)
            .is_some()
    }

    /// Number of order lines across all orders.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.lock().items.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock().users.get(&id).map(|(u, _)| u.clone()))
    }

    async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        Ok(self.lock().users.values().any(|(u, _)| &u.email == email))
    }

    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, PasswordHash)>, RepositoryError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|(u, _)| &u.email == email)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut state = self.lock();
        if state.users.values().any(|(u, _)| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let created = User {
            id: UserId::new(state.next_id()),
            name: user.name,
            email: user.email,
            mobile: user.mobile,
            profile_image: None,
            created_at: Utc::now(),
        };
        state
            .users
            .insert(created.id, (created.clone(), user.password_hash));
        Ok(created)
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(i64::try_from(self.lock().users.len()).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.lock().products.values().rev().cloned().collect())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.lock().products.get(&id).cloned())
    }

    async fn related(
        &self,
        product: &Product,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .lock()
            .products
            .values()
            .rev()
            .filter(|p| p.id != product.id && p.category == product.category)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let mut state = self.lock();
        let created = Product {
            id: ProductId::new(state.next_id()),
            name: product.name,
            brand: product.brand,
            category: product.category,
            color: product.color,
            material: product.material,
            gender: product.gender,
            short_description: product.short_description,
            long_description: product.long_description,
            features: product.features,
            size: product.size,
            price: product.price,
            discount: product.discount,
            in_stock: product.in_stock,
            stock: product.stock,
            main_image: product.main_image,
            gallery_images: product.gallery_images,
            created_at: Utc::now(),
        };
        state.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(i64::try_from(self.lock().products.len()).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut state = self.lock();

        if state
            .orders
            .values()
            .any(|o| o.gateway_order_id.as_deref() == Some(order.gateway_order_id.as_str()))
        {
            return Err(RepositoryError::Conflict(
                "order already recorded for gateway order".to_owned(),
            ));
        }
        if let Some(missing) = order
            .items
            .iter()
            .find(|item| !state.products.contains_key(&item.product_id))
        {
            return Err(RepositoryError::MissingReference(format!(
                "product {}",
                missing.product_id
            )));
        }

        let created = Order {
            id: OrderId::new(state.next_id()),
            user_id: order.user_id,
            total_amount: order.total_amount,
            payment_id: Some(order.payment_id),
            gateway_order_id: Some(order.gateway_order_id),
            status: order.status,
            address: order.address,
            created_at: Utc::now(),
        };
        for item in order.items {
            let id = OrderItemId::new(state.next_id());
            state.items.push(OrderItem {
                id,
                order_id: created.id,
                product_id: Some(item.product_id),
                product_name: item.product_name,
                qty: item.qty,
                unit_price: item.unit_price,
            });
        }
        state.orders.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .lock()
            .orders
            .values()
            .find(|o| o.gateway_order_id.as_deref() == Some(gateway_order_id))
            .cloned())
    }

    async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        Ok(self
            .lock()
            .items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let state = self.lock();
        Ok(state
            .orders
            .values()
            .rev()
            .filter(|o| o.user_id == user_id)
            .map(|order| OrderWithItems {
                order: order.clone(),
                items: state
                    .items
                    .iter()
                    .filter(|i| i.order_id == order.id)
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        Ok(self.lock().orders.values().rev().cloned().collect())
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(i64::try_from(self.lock().orders.len()).unwrap_or(i64::MAX))
    }

    async fn settled_revenue(&self) -> Result<Decimal, RepositoryError> {
        Ok(self
            .lock()
            .orders
            .values()
            .filter(|o| o.status.is_settled())
            .map(|o| o.total_amount)
            .sum())
    }
}
