//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, frame and isolation policy)
//! 5. Session lock (one request per session at a time, around the session layer)
//! 6. Session layer (tower-sessions with `PostgreSQL` store)
//! 7. Rate limiting on login, registration and code entry (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;
pub mod session_lock;

pub use auth::{OptionalAuth, RequireAuth};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
pub use session_lock::{SessionLocks, session_lock_middleware};
