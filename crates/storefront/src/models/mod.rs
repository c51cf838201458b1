//! Domain models for storefront.

pub mod cart;
pub mod order;
pub mod product;
pub mod registration;
pub mod session;
pub mod user;

pub use cart::{Cart, CartEntry, CartLine, CartView, Quantity};
pub use order::{DashboardStats, NewOrder, NewOrderItem, Order, OrderItem, OrderWithItems};
pub use product::{NewProduct, Product};
pub use registration::PendingRegistration;
pub use session::CurrentUser;
pub use user::{NewUser, User};
