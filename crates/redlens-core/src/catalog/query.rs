//! Parameterized catalog queries.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How bound parameters are written into SQL text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ParameterStyle {
    /// `$1`, `$2`, ... as used by the PostgreSQL wire protocol.
    #[default]
    Numeric,
    /// `%s` placeholders; literal `%` must be doubled.
    Format,
}

/// Identifies which catalog query a [`CatalogQuery`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Relations,
    Columns,
    Constraints,
    Domains,
    TableOid,
    ExternalTableExists,
    DatashareTableExists,
    CheckConstraints,
    DefaultSchema,
}

impl QueryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Relations => "relations",
            Self::Columns => "columns",
            Self::Constraints => "constraints",
            Self::Domains => "domains",
            Self::TableOid => "table_oid",
            Self::ExternalTableExists => "external_table_exists",
            Self::DatashareTableExists => "datashare_table_exists",
            Self::CheckConstraints => "check_constraints",
            Self::DefaultSchema => "default_schema",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQL text plus its positional text parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub kind: QueryKind,
    pub sql: String,
    pub params: Vec<String>,
}

/// Incrementally assembles SQL with bound parameters.
///
/// Filter values never enter the SQL text; [`QueryBuilder::push_bind`] only
/// writes a placeholder in the configured style.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    style: ParameterStyle,
    sql: String,
    params: Vec<String>,
}

impl QueryBuilder {
    pub fn new(style: ParameterStyle) -> Self {
        Self {
            style,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Appends raw SQL.
    pub fn push(&mut self, sql: &str) -> &mut Self {
        match self.style {
            ParameterStyle::Numeric => self.sql.push_str(sql),
            ParameterStyle::Format => self.sql.push_str(&sql.replace('%', "%%")),
        }
        self
    }

    /// Appends a placeholder bound to `value`.
    pub fn push_bind(&mut self, value: impl Into<String>) -> &mut Self {
        self.params.push(value.into());
        match self.style {
            ParameterStyle::Numeric => {
                let position = self.params.len();
                self.sql.push('$');
                self.sql.push_str(&position.to_string());
            }
            ParameterStyle::Format => self.sql.push_str("%s"),
        }
        self
    }

    /// Appends `AND <column> = <placeholder>`.
    pub fn push_filter(&mut self, column: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.push(" AND ").push(column).push(" = ").push_bind(value);
        }
        self
    }

    pub fn build(self, kind: QueryKind) -> CatalogQuery {
        CatalogQuery {
            kind,
            sql: self.sql,
            params: self.params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_placeholders_count_up() {
        let mut builder = QueryBuilder::new(ParameterStyle::Numeric);
        builder
            .push("SELECT 1 WHERE a = ")
            .push_bind("x")
            .push_filter("b", Some("y"))
            .push_filter("c", None);
        let query = builder.build(QueryKind::Relations);
        assert_eq!(query.sql, "SELECT 1 WHERE a = $1 AND b = $2");
        assert_eq!(query.params, vec!["x", "y"]);
    }

    #[test]
    fn test_format_style_escapes_percent() {
        let mut builder = QueryBuilder::new(ParameterStyle::Format);
        builder
            .push("WHERE t ilike 'varchar%' AND s = ")
            .push_bind("100%");
        let query = builder.build(QueryKind::Columns);
        assert_eq!(query.sql, "WHERE t ilike 'varchar%%' AND s = %s");
        assert_eq!(query.params, vec!["100%"]);
    }

    #[test]
    fn test_bound_values_never_reach_sql() {
        let mut builder = QueryBuilder::new(ParameterStyle::Numeric);
        builder.push("WHERE relname = ").push_bind("x'; DROP TABLE t; --");
        let query = builder.build(QueryKind::Relations);
        assert!(!query.sql.contains("DROP"));
    }

    #[test]
    fn test_query_kind_display() {
        assert_eq!(QueryKind::ExternalTableExists.to_string(), "external_table_exists");
    }
}
