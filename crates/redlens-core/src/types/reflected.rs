//! Structured reflection results.
//!
//! Every value here is freshly built per call from cached raw rows, so callers
//! may mutate them freely.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::catalog::DistStyle;
use super::column_type::ColumnType;

/// Seed and step of an identity column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IdentitySpec {
    pub seed: i64,
    pub step: i64,
}

/// A generated column expression. The warehouse has none, but the shape is
/// kept so results line up with other dialects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComputedSpec {
    pub sqltext: String,
    pub persisted: bool,
}

/// Dialect-specific column attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Compression encoding, omitted when the column is not encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encode: Option<String>,
}

impl ColumnInfo {
    pub fn is_empty(&self) -> bool {
        self.encode.is_none()
    }
}

/// A column with its resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReflectedColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub autoincrement: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentitySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed: Option<ComputedSpec>,
    #[serde(default, skip_serializing_if = "ColumnInfo::is_empty")]
    pub info: ColumnInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryKeyConstraint {
    /// `None` when the table has no primary key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub constrained_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyConstraint {
    pub name: String,
    pub constrained_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referred_schema: Option<String>,
    pub referred_table: String,
    pub referred_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UniqueConstraint {
    pub name: String,
    /// Columns in constraint order.
    pub column_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckConstraint {
    pub name: String,
    /// Empty when the definition could not be parsed.
    pub sqltext: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub not_valid: bool,
}

/// Physical layout options of a table.
///
/// At most one of `sortkey` and `interleaved_sortkey` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diststyle: Option<DistStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distkey: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sortkey: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interleaved_sortkey: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datashare: Option<String>,
}

/// An index. The warehouse has no user-visible indexes, so none are ever
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReflectedIndex {
    pub name: String,
    pub column_names: Vec<String>,
    pub unique: bool,
}

/// Everything known about one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableReflection {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ReflectedColumn>,
    pub primary_key: PrimaryKeyConstraint,
    pub foreign_keys: Vec<ForeignKeyConstraint>,
    pub unique_constraints: Vec<UniqueConstraint>,
    pub check_constraints: Vec<CheckConstraint>,
    pub options: TableOptions,
}
