//! Bazaar storefront library.
//!
//! The storefront server as a library, so the CLI can reuse its repositories
//! and password hashing and tests can drive the router directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod shell;
pub mod state;
pub mod toast;
