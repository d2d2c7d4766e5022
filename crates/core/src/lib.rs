//! Wholesale Core - Shared types library.
//!
//! This crate provides the client-side domain logic used across all
//! components of the wholesale ordering client:
//! - `storefront` - Server-rendered catalog, cart and back-office
//! - `cli` - Command-line tools (offline cart, category tree)
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure algorithms - no
//! network, no database, no file access. Storage is reached through the
//! [`cart::CartStorage`] trait so each host chooses where carts live.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices and statuses
//! - [`category`] - Category tree model, forest assembly and row rendering
//! - [`cart`] - Cart aggregator (merge-by-id) and its persistence contract

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod category;
pub mod types;

pub use types::*;
