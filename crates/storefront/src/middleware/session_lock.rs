//! Per-session write serialization.
//!
//! tower-sessions loads a record when a handler first touches it and writes
//! the whole record back after the handler returns. Two overlapping writes
//! from one browser (a double click, HTMX firing twice) would both start from
//! the same snapshot and the later save would drop the earlier change.
//!
//! [`serialize_session_writes`] sits outside the session layer and lets one
//! state-changing request per session cookie through at a time, so the load,
//! the handler and the final save of one request finish before the next
//! request's load begins.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{Method, header::COOKIE},
    middleware::Next,
    response::Response,
};
use moka::future::Cache;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tower_sessions::cookie::Cookie;

use crate::middleware::session::SESSION_COOKIE_NAME;
use crate::state::AppState;

/// Sessions with a live lock entry.
const MAX_TRACKED_SESSIONS: u64 = 100_000;

/// Lock entries are dropped after this long without a request.
const LOCK_IDLE: Duration = Duration::from_secs(10 * 60);

/// One async mutex per session id.
#[derive(Clone)]
pub struct SessionLocks {
    locks: Cache<String, Arc<Mutex<()>>>,
}

impl SessionLocks {
    /// Create an empty lock registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: Cache::builder()
                .max_capacity(MAX_TRACKED_SESSIONS)
                .time_to_idle(LOCK_IDLE)
                .build(),
        }
    }

    /// Wait for exclusive access to `session_id`.
    ///
    /// The returned guard releases the session when dropped.
    pub async fn lock(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .get_with(session_id.to_string(), async { Arc::new(Mutex::new(())) })
            .await;
        lock.lock_owned().await
    }
}

impl Default for SessionLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// Session id from the request's cookies, if the browser sent one.
fn session_cookie(request: &Request) -> Option<String> {
    request
        .headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
}

const fn is_read_only(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Run state-changing requests for one session one at a time.
///
/// Reads and requests without a session cookie pass straight through; a
/// request without a cookie always gets a fresh session of its own.
pub async fn serialize_session_writes(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_read_only(request.method()) {
        return next.run(request).await;
    }
    let Some(session_id) = session_cookie(&request) else {
        return next.run(request).await;
    };

    let _guard = state.session_locks().lock(&session_id).await;
    tracing::trace!("Session write lock acquired");
    next.run(request).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn request_with_cookie(cookie: &str) -> Request {
        Request::builder()
            .method(Method::POST)
            .uri("/cart/add")
            .header(COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_session_cookie_is_found_among_others() {
        let request = request_with_cookie("theme=dark; wholesale_session=abc123; lang=es");
        assert_eq!(session_cookie(&request).as_deref(), Some("abc123"));

        let request = request_with_cookie("theme=dark");
        assert_eq!(session_cookie(&request), None);
    }

    #[test]
    fn test_only_writes_are_serialized() {
        assert!(is_read_only(&Method::GET));
        assert!(is_read_only(&Method::HEAD));
        assert!(!is_read_only(&Method::POST));
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_per_session() {
        let locks = SessionLocks::new();
        let held = locks.lock("a").await;

        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.lock("a")).await;
        assert!(blocked.is_err());

        // Other sessions are not affected
        let other = tokio::time::timeout(Duration::from_millis(50), locks.lock("b")).await;
        assert!(other.is_ok());

        drop(held);
        let again = tokio::time::timeout(Duration::from_millis(50), locks.lock("a")).await;
        assert!(again.is_ok());
    }
}
