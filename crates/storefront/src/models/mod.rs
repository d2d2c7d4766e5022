//! Domain models for storefront.
//!
//! Business data lives in the wholesale API; the storefront only models what
//! it keeps in the session.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
