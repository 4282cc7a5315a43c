//! Error types for catalog reflection.
//!
//! # Error Handling Strategy
//!
//! Reflection failures surface as [`ReflectionError`], which wraps the more
//! specific error kinds produced by the individual layers:
//!
//! - [`ParseError`]: catalog-emitted constraint or default text did not match
//!   its grammar. Fatal for primary and foreign keys, whose structure callers
//!   depend on. CHECK constraint text is advisory, so the reflection layer
//!   downgrades those failures to a logged warning and an empty `sqltext`.
//!
//! - [`CatalogError`]: the connection failed to run a catalog query. Passed
//!   through unchanged, except in [`crate::Inspector::get_table_oid`], where a
//!   failed `regclass` cast is the signal to look for external relations.
//!
//! Unresolvable column types are not errors: the column degrades to
//! [`crate::ColumnType::Null`] with a warning. A domain chain that loops or
//! nests deeper than the configured bound is a [`ReflectionError::TypeResolution`].

use crate::catalog::QueryKind;
use std::fmt;

/// Convenience alias used throughout the reflection API.
pub type Result<T, E = ReflectionError> = std::result::Result<T, E>;

/// Errors returned by the public reflection API.
#[derive(Debug, thiserror::Error)]
pub enum ReflectionError {
    /// A relation identifier could not be given an explicit schema.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Structured catalog text did not match its grammar.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A column type referenced a cyclic or over-deep domain chain.
    #[error("cannot resolve type '{type_name}' of column '{column}': {reason}")]
    TypeResolution {
        column: String,
        type_name: String,
        reason: String,
    },

    /// The relation exists in none of the catalog sources.
    #[error("no such relation: {0}")]
    NoSuchRelation(String),

    /// The underlying catalog query failed.
    #[error(transparent)]
    CatalogQuery(#[from] CatalogError),
}

/// Failure reported by a [`crate::CatalogConnection`].
#[derive(Debug, Clone)]
pub struct CatalogError {
    /// Driver-supplied description of the failure.
    pub message: String,
    /// Which catalog query failed, when known.
    pub query: Option<QueryKind>,
}

impl CatalogError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            query: None,
        }
    }

    /// Tags the error with the query that produced it.
    pub fn with_query(mut self, kind: QueryKind) -> Self {
        self.query = Some(kind);
        self
    }

    /// Error for a row that lacks a column or holds an unexpected value.
    pub fn decode(column: &str, expected: &str) -> Self {
        Self::new(format!("column '{column}' is missing or not {expected}"))
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "catalog query")?;
        if let Some(query) = self.query {
            write!(f, " ({query})")?;
        }
        write!(f, " failed: {}", self.message)
    }
}

impl std::error::Error for CatalogError {}

/// Error raised when catalog text does not match its expected grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Human-readable error message.
    pub message: String,
    /// The text that failed to parse.
    pub input: String,
    /// Which grammar rejected the input.
    pub kind: ParseErrorKind,
}

/// The grammar a [`ParseError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// `"identity"(...)` column default.
    Identity,
    /// `PRIMARY KEY (...)` definition.
    PrimaryKey,
    /// `FOREIGN KEY (...) REFERENCES ...` definition.
    ForeignKey,
    /// `CHECK (...)` definition.
    Check,
}

impl ParseErrorKind {
    fn label(self) -> &'static str {
        match self {
            Self::Identity => "identity default",
            Self::PrimaryKey => "primary key",
            Self::ForeignKey => "foreign key",
            Self::Check => "check constraint",
        }
    }
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, input: impl Into<String>) -> Self {
        Self {
            message: "text does not match the expected grammar".to_string(),
            input: input.into(),
            kind,
        }
    }

    /// Replaces the default message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parse error ({}): {}: {:?}",
            self.kind.label(),
            self.message,
            self.input
        )
    }
}

impl std::error::Error for ParseError {}
