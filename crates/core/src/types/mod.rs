//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod pagination;
pub mod price;
pub mod rating;

pub use email::{Email, EmailError};
pub use id::*;
pub use pagination::{Paginated, page_offset, total_pages};
pub use price::{CurrencyCode, Price};
pub use rating::{Rating, RatingCount, RatingDistribution, RatingError};
