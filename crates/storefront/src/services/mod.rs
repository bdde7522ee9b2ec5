//! Business logic services.
//!
//! Services sit between route handlers and repositories: they validate input,
//! apply rules, and translate repository errors into domain errors.

pub mod auth;
pub mod reviews;
