//! Concrete column types produced by type resolution.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A resolved column type.
///
/// `Null` is the untyped placeholder used when the catalog type could not be
/// recognized, and for length-less `VARCHAR` columns, which the warehouse
/// reports for external tables whose type is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnType {
    SmallInt,
    Integer,
    BigInt,
    Real,
    Float {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        precision: Option<u32>,
    },
    DoublePrecision {
        precision: u32,
    },
    Numeric {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        precision: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scale: Option<u32>,
    },
    Boolean,
    Char {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        length: Option<u32>,
    },
    Varchar {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        length: Option<u32>,
    },
    Text,
    Name,
    Date,
    Time {
        timezone: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        precision: Option<u32>,
    },
    Timestamp {
        timezone: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        precision: Option<u32>,
    },
    Interval {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fields: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        precision: Option<u32>,
    },
    Bit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        length: Option<u32>,
        varying: bool,
    },
    Bytea,
    Uuid,
    Json,
    Jsonb,
    Oid,
    Geometry,
    Super,
    HllSketch,
    Enum {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema: Option<String>,
        labels: Vec<String>,
    },
    Array {
        item: Box<ColumnType>,
    },
    Null,
}

impl ColumnType {
    /// True for the integer family, the only types a sequence default makes
    /// autoincrementing.
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::SmallInt | Self::Integer | Self::BigInt)
    }
}

fn write_len(f: &mut fmt::Formatter<'_>, name: &str, len: Option<u32>) -> fmt::Result {
    match len {
        Some(len) => write!(f, "{name}({len})"),
        None => write!(f, "{name}"),
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SmallInt => write!(f, "SMALLINT"),
            Self::Integer => write!(f, "INTEGER"),
            Self::BigInt => write!(f, "BIGINT"),
            Self::Real => write!(f, "REAL"),
            Self::Float { precision } => write_len(f, "FLOAT", *precision),
            Self::DoublePrecision { .. } => write!(f, "DOUBLE PRECISION"),
            Self::Numeric {
                precision: Some(p),
                scale: Some(s),
            } => write!(f, "NUMERIC({p}, {s})"),
            Self::Numeric { precision, .. } => write_len(f, "NUMERIC", *precision),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Char { length } => write_len(f, "CHAR", *length),
            Self::Varchar { length } => write_len(f, "VARCHAR", *length),
            Self::Text => write!(f, "TEXT"),
            Self::Name => write!(f, "NAME"),
            Self::Date => write!(f, "DATE"),
            Self::Time {
                timezone,
                precision,
            } => write_len(f, if *timezone { "TIMETZ" } else { "TIME" }, *precision),
            Self::Timestamp {
                timezone,
                precision,
            } => write_len(
                f,
                if *timezone { "TIMESTAMPTZ" } else { "TIMESTAMP" },
                *precision,
            ),
            Self::Interval { fields, precision } => {
                write!(f, "INTERVAL")?;
                if let Some(fields) = fields {
                    write!(f, " {}", fields.to_uppercase())?;
                }
                if let Some(p) = precision {
                    write!(f, "({p})")?;
                }
                Ok(())
            }
            Self::Bit { length, varying } => {
                write_len(f, if *varying { "BIT VARYING" } else { "BIT" }, *length)
            }
            Self::Bytea => write!(f, "BYTEA"),
            Self::Uuid => write!(f, "UUID"),
            Self::Json => write!(f, "JSON"),
            Self::Jsonb => write!(f, "JSONB"),
            Self::Oid => write!(f, "OID"),
            Self::Geometry => write!(f, "GEOMETRY"),
            Self::Super => write!(f, "SUPER"),
            Self::HllSketch => write!(f, "HLLSKETCH"),
            Self::Enum { name, .. } => write!(f, "{name}"),
            Self::Array { item } => write!(f, "{item}[]"),
            Self::Null => write!(f, "NULL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ColumnType::Numeric {
                precision: Some(10),
                scale: Some(2)
            }
            .to_string(),
            "NUMERIC(10, 2)"
        );
        assert_eq!(
            ColumnType::Timestamp {
                timezone: true,
                precision: None
            }
            .to_string(),
            "TIMESTAMPTZ"
        );
        assert_eq!(
            ColumnType::Array {
                item: Box::new(ColumnType::Varchar { length: Some(30) })
            }
            .to_string(),
            "VARCHAR(30)[]"
        );
        assert_eq!(
            ColumnType::Interval {
                fields: Some("day to second".to_string()),
                precision: Some(3)
            }
            .to_string(),
            "INTERVAL DAY TO SECOND(3)"
        );
    }

    #[test]
    fn test_serialization_is_tagged() {
        let json = serde_json::to_value(ColumnType::Varchar { length: Some(5) }).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "varchar", "length": 5}));
        let json = serde_json::to_value(ColumnType::Integer).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "integer"}));
    }

    #[test]
    fn test_integer_family() {
        assert!(ColumnType::BigInt.is_integer());
        assert!(!ColumnType::Real.is_integer());
    }
}
