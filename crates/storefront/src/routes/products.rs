//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use clothaura_core::ProductId;

use crate::error::{AppError, redirect_with_error};
use crate::filters;
use crate::models::Product;
use crate::routes::{MessageQuery, Nav};
use crate::services::catalog::CatalogService;
use crate::session::SessionContext;
use crate::state::AppState;

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub nav: Nav,
    pub products: Vec<Product>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub nav: Nav,
    pub error: Option<&'static str>,
    pub product: Product,
    pub related_products: Vec<Product>,
}

/// Display product listing page, newest first.
///
/// # Errors
///
/// Returns 500 if the catalog query fails.
#[instrument(skip(state, session))]
pub async fn index(
    State(state): State<AppState>,
    session: SessionContext,
) -> Result<impl IntoResponse, AppError> {
    let products = CatalogService::new(state.catalog())
        .list()
        .await
        .map_err(|e| AppError::from_service(&e))?;

    Ok(ProductsIndexTemplate {
        nav: Nav::load(&session).await,
        products,
    })
}

/// Display product detail page with up to four products from the same
/// category.
///
/// Ids that do not parse are treated like unknown products.
#[instrument(skip(state, session, query))]
pub async fn show(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<String>,
    Query(query): Query<MessageQuery>,
) -> Response {
    let Ok(id) = id.parse::<ProductId>() else {
        return AppError::NotFound(format!("product {id}")).into_response();
    };

    match CatalogService::new(state.catalog()).detail(id).await {
        Ok((product, related_products)) => ProductShowTemplate {
            nav: Nav::load(&session).await,
            error: query.error_message(),
            product,
            related_products,
        }
        .into_response(),
        Err(e) => redirect_with_error("/products", &e),
    }
}
