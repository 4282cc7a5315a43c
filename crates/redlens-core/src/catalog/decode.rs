//! Row decoding and grouping of catalog results.

use tracing::debug;

use super::CatalogRow;
use crate::error::CatalogError;
use crate::identifier::RelationKey;
use crate::types::{
    ColumnMap, ConstraintKind, ConstraintMap, DistStyle, DomainDef, DomainMap, RawColumnRow,
    RawConstraintRow, RawRelationRow, RelKind, RelationMap,
};

fn relation_row(row: &CatalogRow) -> Result<RawRelationRow, CatalogError> {
    let code = row.text("relkind")?;
    let relkind =
        RelKind::from_code(&code).ok_or_else(|| CatalogError::decode("relkind", "a relation kind"))?;
    Ok(RawRelationRow {
        relkind,
        schema: row.text("schema")?,
        schema_oid: row.optional_int("schema_oid")?,
        table_oid: row.optional_int("rel_oid")?,
        name: row.text("relname")?,
        dist_style: row
            .optional_text("diststyle")?
            .as_deref()
            .and_then(DistStyle::from_name),
        owner_id: row.optional_int("owner_id")?,
        owner_name: row.optional_text("owner_name")?,
        view_definition: row.optional_text("view_definition")?,
        privileges: row.optional_text("privileges")?,
    })
}

fn column_row(row: &CatalogRow) -> Result<RawColumnRow, CatalogError> {
    Ok(RawColumnRow {
        schema: row.text("schema")?,
        table_name: row.text("table_name")?,
        name: row.text("name")?,
        encode: row.optional_text("encode")?,
        format_type: row.optional_text("format_type")?,
        dist_key: row.flag("distkey")?,
        sort_key: row.optional_int("sortkey")?.unwrap_or(0),
        not_null: row.flag("notnull")?,
        comment: row.optional_text("comment")?,
        default_src: row.optional_text("default")?,
        attnum: row.optional_int("attnum")?.unwrap_or(0),
    })
}

fn constraint_row(row: &CatalogRow) -> Result<Option<RawConstraintRow>, CatalogError> {
    let code = row.text("contype")?;
    let Some(contype) = ConstraintKind::from_code(&code) else {
        debug!(contype = %code, "skipping unsupported constraint type");
        return Ok(None);
    };
    Ok(Some(RawConstraintRow {
        schema: row.text("schema")?,
        table_name: row.text("table_name")?,
        contype,
        conname: row.text("conname")?,
        conkey: row.int_array("conkey")?,
        attnum: row.int("attnum")?,
        attname: row.text("attname")?,
        condef: row.text("condef")?,
    }))
}

/// Keys relation rows by name and schema.
pub fn group_relations(rows: &[CatalogRow]) -> Result<RelationMap, CatalogError> {
    let mut relations = RelationMap::new();
    for row in rows {
        let relation = relation_row(row)?;
        let key = RelationKey::new(relation.name.clone(), relation.schema.clone());
        relations.insert(key, relation);
    }
    Ok(relations)
}

/// Groups column rows per relation, keeping arrival order within each.
pub fn group_columns(rows: &[CatalogRow]) -> Result<ColumnMap, CatalogError> {
    let mut columns = ColumnMap::new();
    for row in rows {
        let column = column_row(row)?;
        let key = RelationKey::new(column.table_name.clone(), column.schema.clone());
        columns.entry(key).or_default().push(column);
    }
    Ok(columns)
}

/// Groups constraint rows per relation.
pub fn group_constraints(rows: &[CatalogRow]) -> Result<ConstraintMap, CatalogError> {
    let mut constraints = ConstraintMap::new();
    for row in rows {
        if let Some(constraint) = constraint_row(row)? {
            let key = RelationKey::new(constraint.table_name.clone(), constraint.schema.clone());
            constraints.entry(key).or_default().push(constraint);
        }
    }
    Ok(constraints)
}

/// Builds the domain lookup table.
///
/// Domains on the search path are keyed by bare name; others by schema and
/// name, matching how `format_type()` spells them.
pub fn domain_map(rows: &[CatalogRow]) -> Result<DomainMap, CatalogError> {
    let mut domains = DomainMap::new();
    for row in rows {
        let name = row.text("name")?;
        let attype = row.text("attype")?;
        let base_type = attype.split('(').next().unwrap_or(&attype).to_string();
        let key = if row.flag("visible")? {
            vec![name]
        } else {
            vec![row.text("schema")?, name]
        };
        domains.insert(
            key,
            DomainDef {
                base_type,
                nullable: row.flag("nullable")?,
                default: row.optional_text("default")?,
            },
        );
    }
    Ok(domains)
}

/// Reads the object identifier from a table oid result.
pub fn table_oid(rows: &[CatalogRow]) -> Result<Option<i64>, CatalogError> {
    match rows.first() {
        Some(row) => row.optional_int("oid"),
        None => Ok(None),
    }
}

/// Reads the schema name from a default schema result.
pub fn default_schema(rows: &[CatalogRow]) -> Result<Option<String>, CatalogError> {
    match rows.first() {
        Some(row) => row.optional_text("schema"),
        None => Ok(None),
    }
}

/// Whether an existence probe returned a row.
pub fn found_any(rows: &[CatalogRow]) -> bool {
    !rows.is_empty()
}

/// Name and definition text of each CHECK constraint row.
pub fn check_constraint_rows(rows: &[CatalogRow]) -> Result<Vec<(String, String)>, CatalogError> {
    rows.iter()
        .map(|row| Ok((row.text("name")?, row.text("src")?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogValue;

    fn relation(kind: &str, schema: &str, name: &str) -> CatalogRow {
        CatalogRow::new()
            .with("relkind", kind)
            .with("schema", schema)
            .with("schema_oid", 2200)
            .with("rel_oid", Option::<i64>::None)
            .with("relname", name)
            .with("diststyle", "KEY")
    }

    #[test]
    fn test_group_relations() {
        let rows = vec![relation("r", "public", "orders"), relation("v", "public", "v_orders")];
        let relations = group_relations(&rows).unwrap();
        let orders = &relations[&RelationKey::new("orders", "public")];
        assert_eq!(orders.relkind, RelKind::Table);
        assert_eq!(orders.dist_style, Some(DistStyle::Key));
        assert_eq!(orders.table_oid, None);
        assert_eq!(
            relations[&RelationKey::new("v_orders", "public")].relkind,
            RelKind::View
        );
    }

    #[test]
    fn test_unknown_relkind_is_an_error() {
        let rows = vec![relation("z", "public", "t")];
        assert!(group_relations(&rows).is_err());
    }

    #[test]
    fn test_constraint_rows_skip_unknown_types() {
        let row = |contype: &str| {
            CatalogRow::new()
                .with("schema", "public")
                .with("table_name", "t")
                .with("contype", contype)
                .with("conname", "c")
                .with("conkey", CatalogValue::IntArray(vec![1]))
                .with("attnum", 1)
                .with("attname", "a")
                .with("condef", "PRIMARY KEY (a)")
        };
        let constraints = group_constraints(&[row("p"), row("t")]).unwrap();
        assert_eq!(constraints[&RelationKey::new("t", "public")].len(), 1);
    }

    #[test]
    fn test_domain_keys_follow_visibility() {
        let rows = vec![
            CatalogRow::new()
                .with("name", "us_postal")
                .with("attype", "character varying(10)")
                .with("nullable", true)
                .with("default", Option::<String>::None)
                .with("visible", true)
                .with("schema", "public"),
            CatalogRow::new()
                .with("name", "hidden")
                .with("attype", "integer")
                .with("nullable", false)
                .with("default", "0")
                .with("visible", false)
                .with("schema", "other"),
        ];
        let domains = domain_map(&rows).unwrap();
        assert_eq!(
            domains[&vec!["us_postal".to_string()]].base_type,
            "character varying"
        );
        let hidden = &domains[&vec!["other".to_string(), "hidden".to_string()]];
        assert!(!hidden.nullable);
        assert_eq!(hidden.default.as_deref(), Some("0"));
    }

    #[test]
    fn test_table_oid_result() {
        assert_eq!(table_oid(&[]).unwrap(), None);
        let rows = vec![CatalogRow::new().with("oid", 16384)];
        assert_eq!(table_oid(&rows).unwrap(), Some(16384));
    }

    #[test]
    fn test_default_schema_result() {
        let rows = vec![CatalogRow::new().with("schema", CatalogValue::Null)];
        assert_eq!(default_schema(&rows).unwrap(), None);
        let rows = vec![CatalogRow::new().with("schema", "analytics")];
        assert_eq!(default_schema(&rows).unwrap().as_deref(), Some("analytics"));
    }
}
