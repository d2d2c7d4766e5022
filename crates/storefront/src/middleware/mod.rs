//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session write lock (one state-changing request per session at a time)
//! 4. Session layer (tower-sessions with `SQLite` store)
//!
//! Authentication is not a layer: handlers opt in through the extractors in
//! [`auth`].

pub mod auth;
pub mod session;
pub mod session_lock;

pub use auth::{
    AuthContext, OptionalAuth, RequireAdmin, RequireAuth, end_login_session, start_login_session,
};
pub use session::{create_session_layer, create_session_store};
pub use session_lock::{SessionLocks, serialize_session_writes};
