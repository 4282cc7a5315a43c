//! Catalog query layer.
//!
//! The reflection engine never talks to a driver directly. It builds
//! [`CatalogQuery`] values, hands them to a [`CatalogConnection`] and decodes
//! the returned [`CatalogRow`]s into the raw row types.

mod decode;
mod query;
mod sql;

use indexmap::IndexMap;

use crate::error::CatalogError;

pub use decode::{
    check_constraint_rows, default_schema, domain_map, found_any, group_columns,
    group_constraints, group_relations, table_oid,
};
pub use query::{CatalogQuery, ParameterStyle, QueryBuilder, QueryKind};
pub use sql::{
    check_constraints_query, columns_query, constraints_query, datashare_table_exists_query,
    default_schema_query, domains_query, external_table_exists_query, relations_query,
    table_oid_query, CatalogFilter,
};

/// Synchronous access to a live catalog.
///
/// Timeouts, retries and cancellation belong to the implementation; a failed
/// query is reported once and surfaces to the caller unchanged.
pub trait CatalogConnection {
    /// Runs `query` and returns every row.
    fn execute(&self, query: &CatalogQuery) -> Result<Vec<CatalogRow>, CatalogError>;

    /// The session's current schema, if it has one.
    fn default_schema_name(&self) -> Result<Option<String>, CatalogError>;
}

impl<T: CatalogConnection + ?Sized> CatalogConnection for &T {
    fn execute(&self, query: &CatalogQuery) -> Result<Vec<CatalogRow>, CatalogError> {
        (**self).execute(query)
    }

    fn default_schema_name(&self) -> Result<Option<String>, CatalogError> {
        (**self).default_schema_name()
    }
}

/// A single value of a catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    IntArray(Vec<i64>),
}

impl From<bool> for CatalogValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for CatalogValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for CatalogValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<&str> for CatalogValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CatalogValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<i64>> for CatalogValue {
    fn from(value: Vec<i64>) -> Self {
        Self::IntArray(value)
    }
}

impl<T: Into<CatalogValue>> From<Option<T>> for CatalogValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One result row, addressed by column name.
///
/// Accessors are lenient about representation: drivers differ in whether
/// they return `char` codes, integers or arrays as native values or text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogRow {
    values: IndexMap<String, CatalogValue>,
}

impl CatalogRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CatalogValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CatalogValue>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&CatalogValue> {
        self.values.get(column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Non-null text.
    pub fn text(&self, column: &str) -> Result<String, CatalogError> {
        self.optional_text(column)?
            .ok_or_else(|| CatalogError::decode(column, "text"))
    }

    pub fn optional_text(&self, column: &str) -> Result<Option<String>, CatalogError> {
        match self.get(column) {
            None | Some(CatalogValue::Null) => Ok(None),
            Some(CatalogValue::Text(text)) => Ok(Some(text.clone())),
            Some(CatalogValue::Int(value)) => Ok(Some(value.to_string())),
            Some(CatalogValue::Bool(value)) => Ok(Some(value.to_string())),
            Some(CatalogValue::IntArray(_)) => Err(CatalogError::decode(column, "text")),
        }
    }

    /// Non-null integer.
    pub fn int(&self, column: &str) -> Result<i64, CatalogError> {
        self.optional_int(column)?
            .ok_or_else(|| CatalogError::decode(column, "an integer"))
    }

    pub fn optional_int(&self, column: &str) -> Result<Option<i64>, CatalogError> {
        match self.get(column) {
            None | Some(CatalogValue::Null) => Ok(None),
            Some(CatalogValue::Int(value)) => Ok(Some(*value)),
            Some(CatalogValue::Bool(value)) => Ok(Some(i64::from(*value))),
            Some(CatalogValue::Text(text)) => text
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| CatalogError::decode(column, "an integer")),
            Some(CatalogValue::IntArray(_)) => Err(CatalogError::decode(column, "an integer")),
        }
    }

    /// Boolean flag; NULL and absent columns read as `false`.
    pub fn flag(&self, column: &str) -> Result<bool, CatalogError> {
        match self.get(column) {
            None | Some(CatalogValue::Null) => Ok(false),
            Some(CatalogValue::Bool(value)) => Ok(*value),
            Some(CatalogValue::Int(value)) => Ok(*value != 0),
            Some(CatalogValue::Text(text)) => match text.as_str() {
                "t" | "true" | "TRUE" | "1" => Ok(true),
                "f" | "false" | "FALSE" | "0" => Ok(false),
                _ => Err(CatalogError::decode(column, "a boolean")),
            },
            Some(CatalogValue::IntArray(_)) => Err(CatalogError::decode(column, "a boolean")),
        }
    }

    /// Integer array, also accepted in `{1,2,3}` text form.
    pub fn int_array(&self, column: &str) -> Result<Vec<i64>, CatalogError> {
        match self.get(column) {
            None | Some(CatalogValue::Null) => Ok(Vec::new()),
            Some(CatalogValue::IntArray(values)) => Ok(values.clone()),
            Some(CatalogValue::Int(value)) => Ok(vec![*value]),
            Some(CatalogValue::Text(text)) => {
                let inner = text.trim().trim_start_matches('{').trim_end_matches('}');
                inner
                    .split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| {
                        part.parse()
                            .map_err(|_| CatalogError::decode(column, "an integer array"))
                    })
                    .collect()
            }
            Some(CatalogValue::Bool(_)) => Err(CatalogError::decode(column, "an integer array")),
        }
    }
}
