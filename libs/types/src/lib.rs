//! Types library for the real-time listings service
//!
//! Shared definitions used by the HTTP layer, the store and the broadcast
//! path, so every component agrees on the wire shape of a listing.
//!
//! # Modules
//! - `ids`: Listing identifiers
//! - `listing`: Listing records and submission validation
//! - `errors`: Validation error taxonomy

pub mod errors;
pub mod ids;
pub mod listing;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::listing::*;
}
