//! Bazaar Core - Shared domain types.
//!
//! This crate provides the types used by every Bazaar component:
//! - `storefront` - Public-facing shop (pages, review feed, JSON API)
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Database encoding is available behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, prices, ratings, and pagination

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
