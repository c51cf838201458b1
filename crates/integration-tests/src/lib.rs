//! Integration tests for ClothAura.
//!
//! Everything runs in-process: persistence is the storefront's
//! `MemoryStore`, sessions live in `tower_sessions::MemoryStore`, and the
//! payment gateway and mail server are replaced by `FakeGateway` and
//! `RecordingNotifier`. No database or network is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p clothaura-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_flow` - Cart operations over a session
//! - `checkout_flow` - Gateway order, verification and order persistence
//! - `registration_flow` - Emailed-code registration
//! - `http_smoke` - Full router driven through `tower::ServiceExt`
//! - `session_concurrency` - Overlapping requests sharing one session cookie

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use rust_decimal::Decimal;
use tower::ServiceExt;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store;
use tower_sessions::{MemoryStore as SessionMemoryStore, Session, SessionStore};

use clothaura_core::{Email, ProductId};
use clothaura_storefront::app;
use clothaura_storefront::config::StorefrontConfig;
use clothaura_storefront::db::CatalogStore;
use clothaura_storefront::db::memory::MemoryStore;
use clothaura_storefront::middleware::create_session_layer;
use clothaura_storefront::middleware::session::SESSION_COOKIE_NAME;
use clothaura_storefront::models::NewProduct;
use clothaura_storefront::session::SessionContext;
use clothaura_storefront::state::{AppState, Parts};
use clothaura_storefront::testing::{FakeGateway, RecordingNotifier, test_config};

/// Address sent as `x-real-ip` so the auth rate limiter has a key.
pub const CLIENT_IP: &str = "203.0.113.7";

/// In-memory session store that can pause before every load.
///
/// The pause widens the gap between a request reading its session and the
/// session layer writing it back, so overlapping requests really do overlap.
#[derive(Debug, Clone, Default)]
pub struct TestSessionStore {
    inner: SessionMemoryStore,
    load_delay: Duration,
}

#[async_trait]
impl SessionStore for TestSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        self.inner.create(record).await
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.inner.save(record).await
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        self.inner.load(id).await
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        self.inner.delete(id).await
    }
}

/// One storefront wired to in-memory collaborators.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<FakeGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub state: AppState,
    sessions: TestSessionStore,
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    #[must_use]
    pub fn with_config(config: StorefrontConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(FakeGateway::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let state = AppState::from_parts(
            config,
            Parts {
                users: store.clone(),
                catalog: store.clone(),
                orders: store.clone(),
                gateway: gateway.clone(),
                notifier: notifier.clone(),
            },
        );

        Self {
            store,
            gateway,
            notifier,
            state,
            sessions: TestSessionStore::default(),
        }
    }

    /// Make every session load wait briefly. Set before building routers.
    #[must_use]
    pub fn with_slow_session_loads(mut self) -> Self {
        self.sessions.load_delay = Duration::from_millis(25);
        self
    }

    /// A fresh visitor session.
    #[must_use]
    pub fn session(&self) -> SessionContext {
        let session = Session::new(None, Arc::new(self.sessions.clone()), None);
        SessionContext::new(session)
    }

    /// Add a product priced at `price` (no discount) to the catalog.
    pub async fn product(&self, name: &str, price: &str) -> ProductId {
        self.product_from_yaml(&format!("name: {name}\nprice: \"{price}\"\n"))
            .await
    }

    /// Add a product described as YAML, in the shape the seeding tool reads.
    pub async fn product_from_yaml(&self, yaml: &str) -> ProductId {
        let new: NewProduct = serde_yaml::from_str(yaml).unwrap();
        CatalogStore::create(self.store.as_ref(), new)
            .await
            .unwrap()
            .id
    }

    /// Full router over this app's state, sessions in memory.
    #[must_use]
    pub fn router(&self) -> Router {
        let layer = create_session_layer(self.sessions.clone(), self.state.config());
        app(self.state.clone(), layer)
    }

    /// Browser-like client that keeps the session cookie between requests.
    #[must_use]
    pub fn browser(&self) -> Browser {
        Browser {
            router: self.router(),
            cookie: None,
        }
    }

    /// Most recent code emailed to `email`, as typed by the shopper.
    #[must_use]
    pub fn code_sent_to(&self, email: &str) -> Option<String> {
        self.notifier
            .last_code_for(email)
            .map(|code| code.to_string())
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives the router, carrying the session cookie. A clone is another tab
/// of the same browser: same router, same cookie.
#[derive(Clone)]
pub struct Browser {
    router: Router,
    cookie: Option<String>,
}

impl Browser {
    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    /// POST an urlencoded form body.
    pub async fn post_form(&mut self, uri: &str, body: &str) -> Response<Body> {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("x-real-ip", CLIENT_IP)
            .body(Body::from(body.to_owned()))
            .unwrap();
        self.send(request).await
    }

    pub async fn send(&mut self, mut request: Request<Body>) -> Response<Body> {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }

        let response = self.router.clone().oneshot(request).await.unwrap();
        self.remember_cookie(&response);
        response
    }

    /// Whether the browser currently holds a session cookie.
    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.cookie.is_some()
    }

    fn remember_cookie(&mut self, response: &Response<Body>) {
        for value in response.headers().get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            let pair = value.split(';').next().unwrap_or_default();
            let Some((name, id)) = pair.split_once('=') else {
                continue;
            };
            if name.trim() != SESSION_COOKIE_NAME {
                continue;
            }
            self.cookie = if id.is_empty() || value.contains("Max-Age=0") {
                None
            } else {
                Some(format!("{SESSION_COOKIE_NAME}={id}"))
            };
        }
    }
}

/// Collect a response body as UTF-8 text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// `Location` header of a redirect.
#[must_use]
pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

#[must_use]
pub fn email(address: &str) -> Email {
    Email::parse(address).unwrap()
}

#[must_use]
pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}
