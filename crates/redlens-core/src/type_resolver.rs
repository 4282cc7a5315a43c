//! Resolution of catalog type text into [`ColumnType`].
//!
//! The catalog describes a column type only as `format_type()` text, such as
//! `character varying(30)[]` or `timestamp(3) with time zone`. The resolver
//! splits off array and modifier suffixes, maps the base name onto a built-in
//! type and follows domain aliases until it reaches one.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::warn;

use crate::error::{ReflectionError, Result};
use crate::grammar;
use crate::identifier::split_quoted_tokens;
use crate::types::{
    ColumnInfo, ColumnType, DomainMap, EnumMap, RawColumnRow, ReflectedColumn,
};

/// Default bound on nested domain aliases.
pub const DEFAULT_MAX_DOMAIN_DEPTH: usize = 32;

fn modifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(.*\)").expect("Invalid regex pattern"))
}

fn numeric_modifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([\d,]+)\)").expect("Invalid regex pattern"))
}

fn interval_fields_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^interval (.+)$").expect("Invalid regex pattern"))
}

/// Arguments recovered from the modifier suffix of a type.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct TypeArgs {
    length: Option<u32>,
    precision: Option<u32>,
    scale: Option<u32>,
    timezone: Option<bool>,
    fields: Option<String>,
}

/// Splits `text[]` into `("text", true)`.
fn strip_array(attype: &str) -> (String, bool) {
    match attype.strip_suffix("[]") {
        Some(base) => (base.to_string(), true),
        None => (attype.to_string(), false),
    }
}

/// Removes the `(...)` modifier and array suffix from `format_type` text.
fn base_type_name(format_type: &str) -> (String, bool) {
    let without_modifier = modifier_regex().replace_all(format_type, "");
    strip_array(&without_modifier)
}

/// Reads the modifier arguments for `attype`, renaming qualified interval
/// types to plain `interval`.
fn extract_args(attype: &mut String, format_type: &str) -> TypeArgs {
    let charlen = numeric_modifier_regex()
        .captures(format_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());
    let single = || charlen.and_then(|c| c.parse::<u32>().ok());
    let mut args = TypeArgs::default();

    match attype.as_str() {
        "numeric" => {
            if let Some(charlen) = charlen {
                let mut parts = charlen.split(',').map(|p| p.parse::<u32>().ok());
                args.precision = parts.next().flatten();
                args.scale = parts.next().flatten();
            }
        }
        "double precision" => args.precision = Some(53),
        "integer" => {}
        "timestamp with time zone" | "time with time zone" => {
            args.timezone = Some(true);
            args.precision = single();
        }
        "timestamp without time zone" | "time without time zone" | "time" => {
            args.timezone = Some(false);
            args.precision = single();
        }
        "bit varying" => args.length = single(),
        name if name.starts_with("interval") => {
            args.precision = single();
            args.fields = interval_fields_regex()
                .captures(name)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string());
        }
        _ => args.length = single(),
    }
    if attype.starts_with("interval") {
        *attype = "interval".to_string();
    }
    args
}

/// Instantiates a built-in type by its catalog name.
fn builtin_type(attype: &str, args: &TypeArgs) -> Option<ColumnType> {
    let timezone = |default: bool| args.timezone.unwrap_or(default);
    let ty = match attype {
        "smallint" | "int2" => ColumnType::SmallInt,
        "integer" | "int" | "int4" => ColumnType::Integer,
        "bigint" | "int8" => ColumnType::BigInt,
        "real" | "float4" => ColumnType::Real,
        "float" => ColumnType::Float {
            precision: args.length,
        },
        "double precision" | "float8" => ColumnType::DoublePrecision {
            precision: args.precision.unwrap_or(53),
        },
        "numeric" | "decimal" => ColumnType::Numeric {
            precision: args.precision,
            scale: args.scale,
        },
        "boolean" | "bool" => ColumnType::Boolean,
        "character" | "char" | "bpchar" | "\"char\"" => ColumnType::Char {
            length: args.length,
        },
        "character varying" | "varchar" => ColumnType::Varchar {
            length: args.length,
        },
        "text" => ColumnType::Text,
        "name" => ColumnType::Name,
        "date" => ColumnType::Date,
        "time" | "time without time zone" => ColumnType::Time {
            timezone: timezone(false),
            precision: args.precision,
        },
        "time with time zone" | "timetz" => ColumnType::Time {
            timezone: true,
            precision: args.precision,
        },
        "timestamp" | "timestamp without time zone" => ColumnType::Timestamp {
            timezone: timezone(false),
            precision: args.precision,
        },
        "timestamp with time zone" | "timestamptz" => ColumnType::Timestamp {
            timezone: true,
            precision: args.precision,
        },
        "interval" => ColumnType::Interval {
            fields: args.fields.clone(),
            precision: args.precision,
        },
        "bit" => ColumnType::Bit {
            length: args.length,
            varying: false,
        },
        "bit varying" | "varbit" => ColumnType::Bit {
            length: args.length,
            varying: true,
        },
        "bytea" => ColumnType::Bytea,
        "uuid" => ColumnType::Uuid,
        "json" => ColumnType::Json,
        "jsonb" => ColumnType::Jsonb,
        "oid" => ColumnType::Oid,
        "geometry" => ColumnType::Geometry,
        "super" => ColumnType::Super,
        "hllsketch" => ColumnType::HllSketch,
        _ => return None,
    };
    Some(ty)
}

/// Resolves raw column rows against a fixed set of domains and enums.
#[derive(Debug, Clone, Copy)]
pub struct TypeResolver<'a> {
    domains: &'a DomainMap,
    enums: &'a EnumMap,
    max_domain_depth: usize,
}

/// Outcome of resolving a type name through the domain chain.
struct Resolved {
    column_type: Option<ColumnType>,
    is_array: bool,
    nullable: bool,
    default: Option<String>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(domains: &'a DomainMap, enums: &'a EnumMap) -> Self {
        Self {
            domains,
            enums,
            max_domain_depth: DEFAULT_MAX_DOMAIN_DEPTH,
        }
    }

    pub fn with_max_domain_depth(mut self, depth: usize) -> Self {
        self.max_domain_depth = depth;
        self
    }

    /// Builds the reflected form of one column row.
    pub fn resolve_column(&self, row: &RawColumnRow) -> Result<ReflectedColumn> {
        let (column_type, nullable, default) = match row.format_type.as_deref() {
            None => {
                warn!(column = %row.name, "format_type() returned NULL for column");
                (ColumnType::Null, !row.not_null, row.default_src.clone())
            }
            Some(format_type) => {
                let resolved = self.resolve_type(
                    &row.name,
                    format_type,
                    !row.not_null,
                    row.default_src.clone(),
                )?;
                let column_type = match resolved.column_type {
                    Some(ty) if resolved.is_array => ColumnType::Array { item: Box::new(ty) },
                    Some(ty) => ty,
                    None => {
                        warn!(
                            column = %row.name,
                            type_name = %format_type,
                            "did not recognize column type"
                        );
                        ColumnType::Null
                    }
                };
                (column_type, resolved.nullable, resolved.default)
            }
        };
        Ok(self.finish(row, column_type, nullable, default))
    }

    fn resolve_type(
        &self,
        column: &str,
        format_type: &str,
        mut nullable: bool,
        mut default: Option<String>,
    ) -> Result<Resolved> {
        let (mut attype, mut is_array) = base_type_name(format_type);
        let args = extract_args(&mut attype, format_type);
        let mut key = split_quoted_tokens(&attype);
        let mut visited: HashSet<Vec<String>> = HashSet::new();

        let column_type = loop {
            if let Some(ty) = builtin_type(&attype, &args) {
                break Some(ty);
            }
            if let Some(def) = self.enums.get(&key) {
                break Some(ColumnType::Enum {
                    name: def.name.clone(),
                    schema: def.schema.clone(),
                    labels: def.labels.clone(),
                });
            }
            let Some(domain) = self.domains.get(&key) else {
                break None;
            };

            if !visited.insert(key.clone()) {
                return Err(ReflectionError::TypeResolution {
                    column: column.to_string(),
                    type_name: format_type.to_string(),
                    reason: format!("domain '{}' refers back to itself", key.join(".")),
                });
            }
            if visited.len() > self.max_domain_depth {
                return Err(ReflectionError::TypeResolution {
                    column: column.to_string(),
                    type_name: format_type.to_string(),
                    reason: format!(
                        "domain chain is deeper than {} levels",
                        self.max_domain_depth
                    ),
                });
            }

            let (base, base_is_array) = strip_array(&domain.base_type);
            attype = base;
            is_array |= base_is_array;
            key = split_quoted_tokens(&attype);
            // A column may relax a domain's nullability but never its NOT NULL.
            nullable = nullable && domain.nullable;
            if default.as_deref().map_or(true, str::is_empty) {
                if let Some(domain_default) = domain.default.as_deref().filter(|d| !d.is_empty()) {
                    default = Some(domain_default.to_string());
                }
            }
        };

        Ok(Resolved {
            column_type,
            is_array,
            nullable,
            default,
        })
    }

    fn finish(
        &self,
        row: &RawColumnRow,
        column_type: ColumnType,
        nullable: bool,
        mut default: Option<String>,
    ) -> ReflectedColumn {
        let column_type = match column_type {
            ColumnType::Varchar { length: None } => ColumnType::Null,
            other => other,
        };

        let identity = default
            .as_deref()
            .and_then(|d| grammar::parse_identity(d).ok());
        if identity.is_some() {
            default = None;
        }

        let mut autoincrement = false;
        if let Some(text) = default.as_deref() {
            if let Some(seq) = grammar::sequence_default(text) {
                autoincrement = column_type.is_integer();
                if !seq.is_qualified() {
                    default = Some(seq.qualified_with(&row.schema));
                }
            }
        }

        let encode = row
            .encode
            .as_deref()
            .filter(|e| !e.is_empty() && *e != "none")
            .map(str::to_string);

        ReflectedColumn {
            name: row.name.clone(),
            column_type,
            nullable,
            default,
            autoincrement: autoincrement || identity.is_some(),
            comment: row.comment.clone(),
            identity,
            computed: None,
            info: ColumnInfo { encode },
        }
    }
}
