//! Schema reflection for Amazon Redshift.
//!
//! `redlens-core` discovers tables, views, columns, types, constraints and
//! physical layout options of a live warehouse by querying its system
//! catalogs. Native tables, late-binding views, external (Spectrum) tables and
//! datashare tables are all reported through one API.
//!
//! The crate performs no I/O of its own. Callers implement
//! [`CatalogConnection`] over their driver of choice and start a session with
//! [`ReflectionEngine::inspector`]:
//!
//! ```no_run
//! # fn demo(conn: impl redlens_core::CatalogConnection) -> redlens_core::Result<()> {
//! use redlens_core::{DriverCapabilities, ReflectionEngine};
//!
//! let engine = ReflectionEngine::new(DriverCapabilities::libpq(None));
//! let mut inspector = engine.inspector(conn);
//! for table in inspector.get_table_names(Some("public"))? {
//!     let columns = inspector.get_columns(&table, Some("public"))?;
//!     println!("{table}: {} columns", columns.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod catalog;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod grammar;
pub mod identifier;
pub mod inspector;
pub mod type_resolver;
pub mod types;

// Re-export main types and functions
pub use cache::InfoCache;
pub use catalog::{CatalogConnection, CatalogQuery, CatalogRow, CatalogValue, ParameterStyle, QueryKind};
pub use dialect::{
    ClientEncoding, ConnectArgs, ConnectArgsBuilder, ConnectValue, DialectOptions, DriverCapabilities,
    DriverKind,
};
pub use engine::ReflectionEngine;
pub use error::{CatalogError, ParseError, ParseErrorKind, ReflectionError, Result};
pub use identifier::{quote_identifier, unquote, DatashareRef, RelationKey};
pub use inspector::Inspector;
pub use type_resolver::TypeResolver;

// Re-export types explicitly
pub use types::{
    CheckConstraint, ColumnInfo, ColumnType, ComputedSpec, DistStyle, ForeignKeyConstraint,
    IdentitySpec, PrimaryKeyConstraint, ReflectedColumn, ReflectedIndex, RelKind, TableOptions,
    TableReflection, UniqueConstraint,
};
