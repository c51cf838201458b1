//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::error::AppError;
use crate::filters;
use crate::middleware::auth::RequireAuth;
use crate::models::{DashboardStats, Order, OrderWithItems, User};
use crate::routes::Nav;
use crate::services::account::AccountService;
use crate::session::SessionContext;
use crate::state::AppState;

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub nav: Nav,
    pub user: User,
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub nav: Nav,
    pub orders: Vec<OrderWithItems>,
}

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/admin_dashboard.html")]
pub struct AdminDashboardTemplate {
    pub nav: Nav,
    pub orders: Vec<Order>,
    pub stats: DashboardStats,
}

fn account_service(state: &AppState) -> AccountService<'_> {
    AccountService::new(state.users(), state.catalog(), state.orders())
}

/// Display the signed-in user's profile.
///
/// # Errors
///
/// Returns 404 if the account no longer exists.
#[instrument(skip(state, session, current_user), fields(user_id = %current_user.id))]
pub async fn profile(
    State(state): State<AppState>,
    session: SessionContext,
    RequireAuth(current_user): RequireAuth,
) -> Result<impl IntoResponse, AppError> {
    let user = account_service(&state)
        .profile(current_user.id)
        .await
        .map_err(|e| AppError::from_service(&e))?;

    Ok(ProfileTemplate {
        nav: Nav::load(&session).await,
        user,
    })
}

/// Display the signed-in user's orders, newest first.
///
/// # Errors
///
/// Returns 500 if the order query fails.
#[instrument(skip(state, session, current_user), fields(user_id = %current_user.id))]
pub async fn orders(
    State(state): State<AppState>,
    session: SessionContext,
    RequireAuth(current_user): RequireAuth,
) -> Result<impl IntoResponse, AppError> {
    let orders = account_service(&state)
        .orders(current_user.id)
        .await
        .map_err(|e| AppError::from_service(&e))?;

    Ok(OrdersTemplate {
        nav: Nav::load(&session).await,
        orders,
    })
}

/// Display every order with shop totals.
///
/// Any signed-in user can open this page; there is no staff role.
///
/// # Errors
///
/// Returns 500 if any query fails.
#[instrument(skip(state, session, _current_user))]
pub async fn admin_dashboard(
    State(state): State<AppState>,
    session: SessionContext,
    RequireAuth(_current_user): RequireAuth,
) -> Result<impl IntoResponse, AppError> {
    let (orders, stats) = account_service(&state)
        .dashboard()
        .await
        .map_err(|e| AppError::from_service(&e))?;

    Ok(AdminDashboardTemplate {
        nav: Nav::load(&session).await,
        orders,
        stats,
    })
}
