//! Types for the schema reflection API.
//!
//! Raw catalog rows are produced by the catalog query layer and cached per
//! schema; the reflected types are what the public API hands back.

mod catalog;
mod column_type;
mod reflected;

// Re-export all public types
pub use catalog::{
    ColumnMap, ConstraintKind, ConstraintMap, DistStyle, DomainDef, DomainMap, EnumDef, EnumMap,
    RawColumnRow, RawConstraintRow, RawRelationRow, RelKind, RelationMap,
};
pub use column_type::ColumnType;
pub use reflected::{
    CheckConstraint, ColumnInfo, ComputedSpec, ForeignKeyConstraint, IdentitySpec,
    PrimaryKeyConstraint, ReflectedColumn, ReflectedIndex, TableOptions, TableReflection,
    UniqueConstraint,
};
