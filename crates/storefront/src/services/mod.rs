//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Reading user claims out of API access tokens
//! - `cart` - Session-backed cart operations

pub mod auth;
pub mod cart;
