//! Live catalog connections.
//!
//! The reflection engine is transport-agnostic; this module supplies the
//! connection it runs over. URL handling is always available so it can be
//! validated without a database, while the connection itself needs the
//! `live-catalog` feature.

mod target;

#[cfg(feature = "live-catalog")]
mod sqlx_catalog;

pub use target::{parse_url, ConnectionTarget};

#[cfg(feature = "live-catalog")]
pub use sqlx_catalog::SqlxCatalog;
