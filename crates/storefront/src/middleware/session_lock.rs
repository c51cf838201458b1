//! Per-session request serialisation.
//!
//! `SessionManagerLayer` loads a session's record during the request and
//! writes it back after the handler has produced the response. Two
//! overlapping requests with the same session cookie would each write their
//! own copy, and the later write drops the earlier one's changes (a cart line
//! added twice counts once, a wrong code stops counting against the attempt
//! budget).
//!
//! This middleware sits outside the session layer and holds the session's
//! mutex from before the record is loaded until after it has been written
//! back. Requests without a session cookie have no shared record and pass
//! straight through.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use moka::future::Cache;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tower_sessions::cookie::Cookie;
use tower_sessions::session::Id;

use super::session::SESSION_COOKIE_NAME;

/// Registry of per-session async mutexes.
///
/// Entries idle for ten minutes are evicted; a session that comes back later
/// simply gets a fresh mutex.
#[derive(Clone)]
pub struct SessionLocks {
    locks: Cache<Id, Arc<Mutex<()>>>,
}

impl SessionLocks {
    #[must_use]
    pub fn new() -> Self {
        let locks = Cache::builder()
            .max_capacity(100_000)
            .time_to_idle(Duration::from_secs(600))
            .build();
        Self { locks }
    }

    /// Wait for and take the mutex of session `id`.
    pub async fn acquire(&self, id: Id) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .get_with(id, async { Arc::new(Mutex::new(())) })
            .await;
        mutex.lock_owned().await
    }
}

impl Default for SessionLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the rest of the stack, session layer included, under the mutex of the
/// session named by the request's cookie.
pub async fn session_lock_middleware(
    State(locks): State<SessionLocks>,
    request: Request,
    next: Next,
) -> Response {
    let Some(id) = session_id(request.headers()) else {
        return next.run(request).await;
    };

    let _guard = locks.acquire(id).await;
    next.run(request).await
}

/// Session id carried by the request's cookie, if it parses as one.
fn session_id(headers: &HeaderMap) -> Option<Id> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .and_then(|cookie| cookie.value().parse().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{Router, body::Body, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    /// Highest number of handler invocations seen running at once.
    #[derive(Default)]
    struct Overlap {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    fn app(locks: SessionLocks, overlap: Arc<Overlap>) -> Router {
        Router::new()
            .route(
                "/",
                get(move || {
                    let overlap = Arc::clone(&overlap);
                    async move {
                        let now = overlap.running.fetch_add(1, Ordering::SeqCst) + 1;
                        overlap.peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        overlap.running.fetch_sub(1, Ordering::SeqCst);
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(locks, session_lock_middleware))
    }

    fn request(cookie: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn cookie_for(id: Id) -> String {
        format!("theme=dark; {SESSION_COOKIE_NAME}={id}")
    }

    #[tokio::test]
    async fn test_same_session_requests_do_not_overlap() {
        let overlap = Arc::new(Overlap::default());
        let router = app(SessionLocks::new(), Arc::clone(&overlap));
        let cookie = cookie_for(Id::default());

        let (a, b) = tokio::join!(
            router.clone().oneshot(request(Some(&cookie))),
            router.clone().oneshot(request(Some(&cookie))),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(overlap.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_sessions_run_concurrently() {
        let overlap = Arc::new(Overlap::default());
        let router = app(SessionLocks::new(), Arc::clone(&overlap));
        let first = cookie_for(Id::default());
        let second = cookie_for(Id::default());

        let (a, b) = tokio::join!(
            router.clone().oneshot(request(Some(&first))),
            router.clone().oneshot(request(Some(&second))),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(overlap.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_requests_without_session_are_not_serialised() {
        let overlap = Arc::new(Overlap::default());
        let router = app(SessionLocks::new(), Arc::clone(&overlap));

        let (a, b) = tokio::join!(
            router.clone().oneshot(request(None)),
            router.clone().oneshot(request(Some("aura_session=not-an-id"))),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(overlap.peak.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_session_id_from_cookie_header() {
        let id = Id::default();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, cookie_for(id).parse().unwrap());
        assert_eq!(session_id(&headers), Some(id));

        headers.insert(header::COOKIE, "theme=dark".parse().unwrap());
        assert_eq!(session_id(&headers), None);
    }
}
