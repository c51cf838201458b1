//! Home and static content page route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use tracing::instrument;

use crate::filters;
use crate::models::Product;
use crate::routes::{MessageQuery, Nav};
use crate::services::catalog::CatalogService;
use crate::session::SessionContext;
use crate::state::AppState;

/// Number of products featured on the home page.
const FEATURED_LIMIT: usize = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub nav: Nav,
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
    pub featured: Vec<Product>,
}

/// About page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/about.html")]
pub struct AboutTemplate {
    pub nav: Nav,
}

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/contact.html")]
pub struct ContactTemplate {
    pub nav: Nav,
}

/// Display the home page with the newest products.
///
/// A catalog failure renders the page without the featured grid.
#[instrument(skip(state, session))]
pub async fn home(
    State(state): State<AppState>,
    session: SessionContext,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    let featured = match CatalogService::new(state.catalog()).list().await {
        Ok(mut products) => {
            products.truncate(FEATURED_LIMIT);
            products
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load featured products");
            Vec::new()
        }
    };

    HomeTemplate {
        nav: Nav::load(&session).await,
        error: query.error_message(),
        success: query.success_message(),
        featured,
    }
}

/// Display the about page.
pub async fn about(session: SessionContext) -> impl IntoResponse {
    AboutTemplate {
        nav: Nav::load(&session).await,
    }
}

/// Display the contact page.
pub async fn contact(session: SessionContext) -> impl IntoResponse {
    ContactTemplate {
        nav: Nav::load(&session).await,
    }
}

/// Create the pages routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/about", get(about))
        .route("/contact", get(contact))
}
