//! Raw rows as produced by the catalog query layer.
//!
//! These are owned by the per-schema cache entries that fetched them and are
//! never mutated afterwards; reflection results are derived copies.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::identifier::RelationKey;

/// Kind of relation as encoded in `pg_class.relkind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RelKind {
    Table,
    View,
    MaterializedView,
    Sequence,
    ForeignTable,
}

impl RelKind {
    /// Maps the single-letter catalog code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "r" => Some(Self::Table),
            "v" => Some(Self::View),
            "m" => Some(Self::MaterializedView),
            "S" => Some(Self::Sequence),
            "f" => Some(Self::ForeignTable),
            _ => None,
        }
    }
}

/// Table distribution style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum DistStyle {
    Even,
    Key,
    All,
}

impl DistStyle {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "EVEN" => Some(Self::Even),
            "KEY" => Some(Self::Key),
            "ALL" => Some(Self::All),
            _ => None,
        }
    }
}

/// Constraint type as encoded in `pg_constraint.contype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    Primary,
    Foreign,
    Unique,
    Check,
}

impl ConstraintKind {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "p" => Some(Self::Primary),
            "f" => Some(Self::Foreign),
            "u" => Some(Self::Unique),
            "c" => Some(Self::Check),
            _ => None,
        }
    }
}

/// One table, view, external table or datashare table.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRelationRow {
    pub relkind: RelKind,
    pub schema: String,
    pub schema_oid: Option<i64>,
    pub table_oid: Option<i64>,
    pub name: String,
    pub dist_style: Option<DistStyle>,
    pub owner_id: Option<i64>,
    pub owner_name: Option<String>,
    pub view_definition: Option<String>,
    pub privileges: Option<String>,
}

/// One column of a relation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumnRow {
    pub schema: String,
    pub table_name: String,
    pub name: String,
    pub encode: Option<String>,
    /// `format_type()` text; absent only when the catalog returned NULL.
    pub format_type: Option<String>,
    pub dist_key: bool,
    /// 0 when not part of the sort key; negative for interleaved keys.
    pub sort_key: i64,
    pub not_null: bool,
    pub comment: Option<String>,
    pub default_src: Option<String>,
    pub attnum: i64,
}

/// One constrained column of one constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct RawConstraintRow {
    pub schema: String,
    pub table_name: String,
    pub contype: ConstraintKind,
    pub conname: String,
    /// Column numbers in constraint order.
    pub conkey: Vec<i64>,
    pub attnum: i64,
    pub attname: String,
    pub condef: String,
}

/// A user-level alias over a base type.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainDef {
    /// Base type name with any `(...)` modifier removed.
    pub base_type: String,
    pub nullable: bool,
    pub default: Option<String>,
}

/// Labels of an enumerated type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub schema: Option<String>,
    pub labels: Vec<String>,
}

/// Domains keyed by `[name]` when visible on the search path, otherwise
/// `[schema, name]`.
pub type DomainMap = IndexMap<Vec<String>, DomainDef>;
/// Enums keyed like [`DomainMap`].
pub type EnumMap = IndexMap<Vec<String>, EnumDef>;

pub type RelationMap = IndexMap<RelationKey, RawRelationRow>;
pub type ColumnMap = IndexMap<RelationKey, Vec<RawColumnRow>>;
pub type ConstraintMap = IndexMap<RelationKey, Vec<RawConstraintRow>>;
