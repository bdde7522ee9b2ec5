//! Domain models for the storefront.
//!
//! These are the validated shapes handlers and templates work with; database
//! row types live next to the queries in [`crate::db`].

pub mod cart;
pub mod product;
pub mod review;
pub mod session;
pub mod user;

pub use cart::{Cart, CartItem};
pub use product::{Product, ProductCard};
pub use review::{Review, ReviewDetails, ReviewInput, UpsertOutcome};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
