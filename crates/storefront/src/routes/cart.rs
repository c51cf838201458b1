//! Cart route handlers.
//!
//! Every mutation redirects back to the cart page. Ids in the path that do not
//! parse are ignored the same way unknown products are.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use clothaura_core::ProductId;

use crate::error::{AppError, add_breadcrumb, redirect_with_error};
use crate::filters;
use crate::models::{CartView, Quantity};
use crate::routes::{MessageQuery, Nav};
use crate::services::cart::CartService;
use crate::session::SessionContext;
use crate::state::AppState;

/// Where every cart action lands.
const CART_PATH: &str = "/cart";

/// Add to cart parameters, from the query string (GET) or form body (POST).
#[derive(Debug, Default, Deserialize)]
pub struct AddToCartForm {
    /// Raw quantity; anything that is not a positive integer counts as 1.
    pub qty: Option<String>,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub nav: Nav,
    pub error: Option<&'static str>,
    pub cart: CartView,
}

/// Display the cart page.
///
/// # Errors
///
/// Returns 500 if the session cannot be read.
#[instrument(skip(session, query))]
pub async fn show(
    session: SessionContext,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let cart = CartService::view(&session)
        .await
        .map_err(|e| AppError::from_service(&e))?;

    Ok(CartShowTemplate {
        nav: Nav::load(&session).await,
        error: query.error_message(),
        cart,
    })
}

/// Add a product to the cart.
///
/// Unknown products render 404.
#[instrument(skip(state, session, form))]
pub async fn add(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<String>,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        return AppError::NotFound(format!("product {id}")).into_response();
    };
    let qty = Quantity::coerce(form.qty.as_deref());

    match CartService::new(state.catalog())
        .add(&session, product_id, qty)
        .await
    {
        Ok(_) => {
            add_breadcrumb("cart", "Added to cart", Some(&[("product_id", id.as_str())]));
            Redirect::to(CART_PATH).into_response()
        }
        Err(e) => redirect_with_error(CART_PATH, &e),
    }
}

/// Raise a line's quantity by one.
#[instrument(skip(state, session))]
pub async fn increase(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<String>,
) -> Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        return Redirect::to(CART_PATH).into_response();
    };
    match CartService::new(state.catalog())
        .increase(&session, product_id)
        .await
    {
        Ok(_) => Redirect::to(CART_PATH).into_response(),
        Err(e) => redirect_with_error(CART_PATH, &e),
    }
}

/// Lower a line's quantity by one, stopping at one.
#[instrument(skip(state, session))]
pub async fn decrease(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<String>,
) -> Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        return Redirect::to(CART_PATH).into_response();
    };
    match CartService::new(state.catalog())
        .decrease(&session, product_id)
        .await
    {
        Ok(_) => Redirect::to(CART_PATH).into_response(),
        Err(e) => redirect_with_error(CART_PATH, &e),
    }
}

/// Drop a line from the cart.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<String>,
) -> Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        return Redirect::to(CART_PATH).into_response();
    };
    match CartService::new(state.catalog())
        .remove(&session, product_id)
        .await
    {
        Ok(_) => Redirect::to(CART_PATH).into_response(),
        Err(e) => redirect_with_error(CART_PATH, &e),
    }
}
