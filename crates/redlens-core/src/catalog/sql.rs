//! Catalog SQL.
//!
//! The relation, column and constraint queries are unions over up to four
//! sources that all project the same column tuple:
//!
//! - native catalog relations (`pg_class` and friends)
//! - late-binding views (`pg_get_late_binding_view_cols()`)
//! - external tables (`svv_external_*`)
//! - datashare tables (`svv_redshift_*`), whose schema is reported as
//!   `database.schema`
//!
//! A datashare schema filter selects only the datashare source; a plain schema
//! filter excludes it, since no native schema name can equal a
//! `database.schema` pair.

use super::query::{CatalogQuery, ParameterStyle, QueryBuilder, QueryKind};
use crate::identifier::{unquote, DatashareRef};

/// Schema and table restrictions pushed into every union branch.
///
/// All names are stored unquoted, matching how the catalog stores them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CatalogFilter {
    pub schema: Option<String>,
    pub datashare: Option<String>,
    pub table: Option<String>,
}

impl CatalogFilter {
    /// Filter for a caller-supplied schema, splitting datashare references.
    pub fn for_schema(schema: Option<&str>) -> Self {
        match schema {
            None => Self::default(),
            Some(schema) => match DatashareRef::parse(schema) {
                Some(share) => Self {
                    schema: Some(share.schema),
                    datashare: Some(share.datashare),
                    table: None,
                },
                None => Self {
                    schema: Some(unquote(schema).to_string()),
                    datashare: None,
                    table: None,
                },
            },
        }
    }

    pub fn with_table(mut self, table: Option<&str>) -> Self {
        self.table = table.map(|t| unquote(t).to_string());
        self
    }

    fn includes_local(&self) -> bool {
        self.datashare.is_none()
    }

    fn includes_datashare(&self) -> bool {
        self.datashare.is_some() || self.schema.is_none()
    }
}

/// Joins union branches, inserting `UNION` between them.
struct Union {
    builder: QueryBuilder,
    branches: usize,
}

impl Union {
    fn new(style: ParameterStyle) -> Self {
        Self {
            builder: QueryBuilder::new(style),
            branches: 0,
        }
    }

    fn branch(&mut self, sql: &str) -> &mut QueryBuilder {
        if self.branches > 0 {
            self.builder.push("\nUNION\n");
        }
        self.branches += 1;
        self.builder.push(sql)
    }

    fn finish(mut self, order_by: &str, kind: QueryKind) -> CatalogQuery {
        self.builder.push(order_by);
        self.builder.build(kind)
    }
}

const NATIVE_RELATIONS: &str = r#"
SELECT
  c.relkind,
  n.oid AS "schema_oid",
  n.nspname AS "schema",
  c.oid AS "rel_oid",
  c.relname,
  CASE c.reldiststyle
    WHEN 0 THEN 'EVEN' WHEN 1 THEN 'KEY' WHEN 8 THEN 'ALL' END
    AS "diststyle",
  c.relowner AS "owner_id",
  u.usename AS "owner_name",
  TRIM(TRAILING ';' FROM pg_catalog.pg_get_viewdef(c.oid, true))
    AS "view_definition",
  pg_catalog.array_to_string(c.relacl, chr(10)) AS "privileges"
FROM pg_catalog.pg_class c
     LEFT JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
     JOIN pg_catalog.pg_user u ON u.usesysid = c.relowner
WHERE c.relkind IN ('r', 'v', 'm', 'S', 'f')
  AND n.nspname !~ '^pg_'"#;

const EXTERNAL_RELATIONS: &str = r#"
SELECT
  'r' AS "relkind",
  s.esoid AS "schema_oid",
  s.schemaname AS "schema",
  null AS "rel_oid",
  t.tablename AS "relname",
  null AS "diststyle",
  s.esowner AS "owner_id",
  u.usename AS "owner_name",
  null AS "view_definition",
  null AS "privileges"
FROM svv_external_tables t
     JOIN svv_external_schemas s ON s.schemaname = t.schemaname
     JOIN pg_catalog.pg_user u ON u.usesysid = s.esowner
WHERE 1 = 1"#;

const DATASHARE_RELATIONS: &str = r#"
SELECT
  'r' AS "relkind",
  null AS "schema_oid",
  s.database_name || '.' || s.schema_name AS "schema",
  null AS "rel_oid",
  t.table_name AS "relname",
  null AS "diststyle",
  null AS "owner_id",
  null AS "owner_name",
  null AS "view_definition",
  null AS "privileges"
FROM svv_redshift_tables t
     LEFT JOIN svv_redshift_schemas s
       ON s.schema_name = t.schema_name AND s.database_name = t.database_name
WHERE 1 = 1"#;

/// Relations matching `filter`, ordered by kind and schema.
pub fn relations_query(style: ParameterStyle, filter: &CatalogFilter) -> CatalogQuery {
    let schema = filter.schema.as_deref();
    let table = filter.table.as_deref();
    let mut union = Union::new(style);

    if filter.includes_local() {
        union
            .branch(NATIVE_RELATIONS)
            .push_filter("n.nspname", schema)
            .push_filter("c.relname", table);
        union
            .branch(EXTERNAL_RELATIONS)
            .push_filter("s.schemaname", schema)
            .push_filter("t.tablename", table);
    }
    if filter.includes_datashare() {
        union
            .branch(DATASHARE_RELATIONS)
            .push_filter("s.database_name", filter.datashare.as_deref())
            .push_filter("t.schema_name", schema)
            .push_filter("t.table_name", table);
    }

    union.finish(
        "\nORDER BY \"relkind\", \"schema_oid\", \"schema\"",
        QueryKind::Relations,
    )
}

const NATIVE_COLUMNS: &str = r#"
SELECT
    n.nspname AS "schema",
    c.relname AS "table_name",
    att.attname AS "name",
    format_encoding(att.attencodingtype::integer) AS "encode",
    format_type(att.atttypid, att.atttypmod) AS "format_type",
    att.attisdistkey AS "distkey",
    att.attsortkeyord AS "sortkey",
    att.attnotnull AS "notnull",
    pg_catalog.col_description(att.attrelid, att.attnum) AS "comment",
    pg_catalog.pg_get_expr(ad.adbin, ad.adrelid) AS "default",
    att.attnum AS "attnum",
    n.oid AS "schema_oid",
    c.oid AS "table_oid"
FROM pg_catalog.pg_class c
LEFT JOIN pg_catalog.pg_namespace n
    ON n.oid = c.relnamespace
JOIN pg_catalog.pg_attribute att
    ON att.attrelid = c.oid
LEFT JOIN pg_catalog.pg_attrdef ad
    ON (att.attrelid, att.attnum) = (ad.adrelid, ad.adnum)
WHERE n.nspname !~ '^pg_'
    AND att.attnum > 0
    AND NOT att.attisdropped"#;

const LATE_BINDING_COLUMNS: &str = r#"
SELECT
    view_schema AS "schema",
    view_name AS "table_name",
    col_name AS "name",
    null AS "encode",
    col_type AS "format_type",
    null AS "distkey",
    0 AS "sortkey",
    null AS "notnull",
    null AS "comment",
    null AS "default",
    col_num AS "attnum",
    null AS "schema_oid",
    null AS "table_oid"
FROM pg_get_late_binding_view_cols() cols(
    view_schema name,
    view_name name,
    col_name name,
    col_type varchar,
    col_num int)
WHERE 1 = 1"#;

// External tables report Hive-style type names; they are mapped onto the
// native spelling so the type resolver recognizes them.
const EXTERNAL_COLUMNS: &str = r#"
SELECT
    c.schemaname AS "schema",
    c.tablename AS "table_name",
    c.columnname AS "name",
    null AS "encode",
    CASE
        WHEN c.external_type = 'int' THEN 'integer'
        WHEN c.external_type = 'float' THEN 'real'
        WHEN c.external_type = 'double' THEN 'double precision'
        WHEN c.external_type = 'timestamp'
        THEN 'timestamp without time zone'
        WHEN c.external_type ilike 'varchar%'
        THEN replace(c.external_type, 'varchar', 'character varying')
        WHEN c.external_type ilike 'decimal%'
        THEN replace(c.external_type, 'decimal', 'numeric')
        ELSE
        replace(
        replace(
            replace(c.external_type, 'decimal', 'numeric'),
            'char', 'character'),
        'varchar', 'character varying')
        END
        AS "format_type",
    false AS "distkey",
    0 AS "sortkey",
    null AS "notnull",
    null AS "comment",
    null AS "default",
    c.columnnum AS "attnum",
    s.esoid AS "schema_oid",
    null AS "table_oid"
FROM svv_external_columns c
JOIN svv_external_schemas s ON s.schemaname = c.schemaname
WHERE 1 = 1"#;

const DATASHARE_COLUMNS: &str = r#"
SELECT
    c.database_name || '.' || c.schema_name AS "schema",
    c.table_name AS "table_name",
    c.column_name AS "name",
    null AS "encode",
    c.data_type AS "format_type",
    false AS "distkey",
    0 AS "sortkey",
    null AS "notnull",
    null AS "comment",
    null AS "default",
    c.ordinal_position AS "attnum",
    null AS "schema_oid",
    null AS "table_oid"
FROM svv_redshift_columns c
JOIN svv_redshift_tables t
    ON t.table_name = c.table_name
    AND t.schema_name = c.schema_name
    AND t.database_name = c.database_name
WHERE 1 = 1"#;

/// Columns matching `filter`, ordered by schema, table and position.
pub fn columns_query(style: ParameterStyle, filter: &CatalogFilter) -> CatalogQuery {
    let schema = filter.schema.as_deref();
    let table = filter.table.as_deref();
    let mut union = Union::new(style);

    if filter.includes_local() {
        union
            .branch(NATIVE_COLUMNS)
            .push_filter("n.nspname", schema)
            .push_filter("c.relname", table);
        union
            .branch(LATE_BINDING_COLUMNS)
            .push_filter("view_schema", schema)
            .push_filter("view_name", table);
        union
            .branch(EXTERNAL_COLUMNS)
            .push_filter("c.schemaname", schema)
            .push_filter("c.tablename", table);
    }
    if filter.includes_datashare() {
        union
            .branch(DATASHARE_COLUMNS)
            .push_filter("c.database_name", filter.datashare.as_deref())
            .push_filter("c.schema_name", schema)
            .push_filter("c.table_name", table);
    }

    union.finish(
        "\nORDER BY \"schema\", \"table_name\", \"attnum\"",
        QueryKind::Columns,
    )
}

const NATIVE_CONSTRAINTS: &str = r#"
SELECT
  n.nspname AS "schema",
  c.relname AS "table_name",
  t.contype,
  t.conname,
  t.conkey,
  a.attnum,
  a.attname,
  pg_catalog.pg_get_constraintdef(t.oid, true)::varchar(512) AS "condef",
  n.oid AS "schema_oid",
  c.oid AS "rel_oid"
FROM pg_catalog.pg_class c
LEFT JOIN pg_catalog.pg_namespace n
  ON n.oid = c.relnamespace
JOIN pg_catalog.pg_constraint t
  ON t.conrelid = c.oid
JOIN pg_catalog.pg_attribute a
  ON t.conrelid = a.attrelid AND a.attnum = ANY(t.conkey)
WHERE n.nspname !~ '^pg_'"#;

// External and datashare tables have no constraints. A single-column primary
// key on the first column is fabricated for each of them.
const EXTERNAL_CONSTRAINTS: &str = r#"
SELECT
  s.schemaname AS "schema",
  c.tablename AS "table_name",
  'p' AS "contype",
  c.tablename || '_pkey' AS "conname",
  array[1::SMALLINT] AS "conkey",
  1 AS "attnum",
  c.columnname AS "attname",
  'PRIMARY KEY (' || quote_ident(c.columnname) || ')'::VARCHAR(512) AS "condef",
  s.esoid AS "schema_oid",
  null AS "rel_oid"
FROM svv_external_columns c
JOIN svv_external_schemas s ON s.schemaname = c.schemaname
WHERE c.columnnum = 1"#;

const DATASHARE_CONSTRAINTS: &str = r#"
SELECT
  c.database_name || '.' || c.schema_name AS "schema",
  c.table_name AS "table_name",
  'p' AS "contype",
  c.table_name || '_pkey' AS "conname",
  array[1::SMALLINT] AS "conkey",
  1 AS "attnum",
  c.column_name AS "attname",
  'PRIMARY KEY (' || quote_ident(c.column_name) || ')'::VARCHAR(512) AS "condef",
  null AS "schema_oid",
  null AS "rel_oid"
FROM svv_redshift_columns c
JOIN svv_redshift_tables t
  ON t.schema_name = c.schema_name
  AND t.table_name = c.table_name
  AND t.database_name = c.database_name
WHERE c.ordinal_position = 1"#;

/// Constraint columns matching `filter`, one row per constrained column.
pub fn constraints_query(style: ParameterStyle, filter: &CatalogFilter) -> CatalogQuery {
    let schema = filter.schema.as_deref();
    let table = filter.table.as_deref();
    let mut union = Union::new(style);

    if filter.includes_local() {
        union
            .branch(NATIVE_CONSTRAINTS)
            .push_filter("n.nspname", schema)
            .push_filter("c.relname", table);
        union
            .branch(EXTERNAL_CONSTRAINTS)
            .push_filter("s.schemaname", schema)
            .push_filter("c.tablename", table);
    }
    if filter.includes_datashare() {
        union
            .branch(DATASHARE_CONSTRAINTS)
            .push_filter("c.database_name", filter.datashare.as_deref())
            .push_filter("c.schema_name", schema)
            .push_filter("c.table_name", table);
    }

    union.finish(
        "\nORDER BY \"schema\", \"table_name\"",
        QueryKind::Constraints,
    )
}

const DOMAINS: &str = r#"
SELECT t.typname AS "name",
   pg_catalog.format_type(t.typbasetype, t.typtypmod) AS "attype",
   NOT t.typnotnull AS "nullable",
   t.typdefault AS "default",
   pg_catalog.pg_type_is_visible(t.oid) AS "visible",
   n.nspname AS "schema"
FROM pg_catalog.pg_type t
   LEFT JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
WHERE t.typtype = 'd'"#;

pub fn domains_query(style: ParameterStyle) -> CatalogQuery {
    let mut builder = QueryBuilder::new(style);
    builder.push(DOMAINS);
    builder.build(QueryKind::Domains)
}

/// Casts `qualified_name` to its object identifier.
///
/// Fails on the server when the name does not denote a local relation.
pub fn table_oid_query(style: ParameterStyle, qualified_name: &str) -> CatalogQuery {
    let mut builder = QueryBuilder::new(style);
    builder
        .push("SELECT ")
        .push_bind(qualified_name)
        .push("::regclass::oid::bigint AS \"oid\"");
    builder.build(QueryKind::TableOid)
}

pub fn external_table_exists_query(style: ParameterStyle, filter: &CatalogFilter) -> CatalogQuery {
    let mut builder = QueryBuilder::new(style);
    builder
        .push("SELECT 1 AS \"found\"\nFROM svv_external_tables\nWHERE 1 = 1")
        .push_filter("tablename", filter.table.as_deref())
        .push_filter("schemaname", filter.schema.as_deref())
        .push("\nLIMIT 1");
    builder.build(QueryKind::ExternalTableExists)
}

pub fn datashare_table_exists_query(style: ParameterStyle, filter: &CatalogFilter) -> CatalogQuery {
    let mut builder = QueryBuilder::new(style);
    builder
        .push("SELECT 1 AS \"found\"\nFROM svv_redshift_tables\nWHERE 1 = 1")
        .push_filter("table_name", filter.table.as_deref())
        .push_filter("schema_name", filter.schema.as_deref())
        .push_filter("database_name", filter.datashare.as_deref())
        .push("\nLIMIT 1");
    builder.build(QueryKind::DatashareTableExists)
}

/// The session's current schema, as resolved from its search path.
pub fn default_schema_query(style: ParameterStyle) -> CatalogQuery {
    let mut builder = QueryBuilder::new(style);
    builder.push("SELECT pg_catalog.current_schema() AS \"schema\"");
    builder.build(QueryKind::DefaultSchema)
}

/// CHECK constraints of the relation with object identifier `table_oid`.
pub fn check_constraints_query(style: ParameterStyle, table_oid: i64) -> CatalogQuery {
    let mut builder = QueryBuilder::new(style);
    builder
        .push(
            "SELECT\n    cons.conname AS \"name\",\n    \
             pg_catalog.pg_get_constraintdef(cons.oid) AS \"src\"\n\
             FROM pg_catalog.pg_constraint cons\n\
             WHERE cons.contype = 'c'\n    AND cons.conrelid = ",
        )
        .push_bind(table_oid.to_string())
        .push("::oid");
    builder.build(QueryKind::CheckConstraints)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branches(sql: &str) -> usize {
        sql.matches("\nUNION\n").count() + 1
    }

    #[test]
    fn test_filter_splits_datashare() {
        let filter = CatalogFilter::for_schema(Some("share_db.sales")).with_table(Some("\"Orders\""));
        assert_eq!(filter.datashare.as_deref(), Some("share_db"));
        assert_eq!(filter.schema.as_deref(), Some("sales"));
        assert_eq!(filter.table.as_deref(), Some("Orders"));
    }

    #[test]
    fn test_unfiltered_relations_use_every_source() {
        let query = relations_query(ParameterStyle::Numeric, &CatalogFilter::default());
        assert_eq!(branches(&query.sql), 3);
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_schema_filter_binds_each_branch() {
        let filter = CatalogFilter::for_schema(Some("sales")).with_table(Some("orders"));
        let query = columns_query(ParameterStyle::Numeric, &filter);
        assert_eq!(branches(&query.sql), 3);
        assert!(!query.sql.contains("svv_redshift_columns"));
        assert_eq!(query.params, vec!["sales", "orders", "sales", "orders", "sales", "orders"]);
        assert!(query.sql.contains("n.nspname = $1"));
        assert!(query.sql.contains("c.tablename = $6"));
        assert!(!query.sql.contains("'sales'"));
    }

    #[test]
    fn test_datashare_filter_uses_only_datashare_source() {
        let filter = CatalogFilter::for_schema(Some("share_db.sales"));
        let query = constraints_query(ParameterStyle::Numeric, &filter);
        assert_eq!(branches(&query.sql), 1);
        assert!(query.sql.contains("svv_redshift_columns"));
        assert_eq!(query.params, vec!["share_db", "sales"]);
    }

    #[test]
    fn test_fabricated_primary_keys_cover_only_the_first_column() {
        let query = constraints_query(ParameterStyle::Numeric, &CatalogFilter::default());
        assert!(query.sql.contains("FROM svv_external_columns c"));
        assert!(query.sql.contains("WHERE c.columnnum = 1"));
        assert!(query.sql.contains("FROM svv_redshift_columns c"));
        assert!(query.sql.contains("WHERE c.ordinal_position = 1"));
        assert!(query.sql.contains("quote_ident(c.columnname)"));
        assert!(query.sql.contains("quote_ident(c.column_name)"));
    }

    #[test]
    fn test_format_style_escapes_like_patterns() {
        let query = columns_query(ParameterStyle::Format, &CatalogFilter::for_schema(Some("s")));
        assert!(query.sql.contains("ilike 'varchar%%'"));
        assert!(query.sql.contains("n.nspname = %s"));
    }

    #[test]
    fn test_table_oid_binds_qualified_name() {
        let query = table_oid_query(ParameterStyle::Numeric, "public.\"Group\"");
        assert_eq!(query.sql, "SELECT $1::regclass::oid::bigint AS \"oid\"");
        assert_eq!(query.params, vec!["public.\"Group\""]);
    }

    #[test]
    fn test_check_constraints_binds_oid() {
        let query = check_constraints_query(ParameterStyle::Numeric, 1234);
        assert!(query.sql.ends_with("cons.conrelid = $1::oid"));
        assert_eq!(query.params, vec!["1234"]);
    }

    #[test]
    fn test_existence_queries() {
        let filter = CatalogFilter::for_schema(Some("share_db.sales")).with_table(Some("t"));
        let query = datashare_table_exists_query(ParameterStyle::Numeric, &filter);
        assert_eq!(query.params, vec!["t", "sales", "share_db"]);
        let filter = CatalogFilter::for_schema(Some("spectrum")).with_table(Some("t"));
        let query = external_table_exists_query(ParameterStyle::Numeric, &filter);
        assert_eq!(query.params, vec!["t", "spectrum"]);
        assert_eq!(query.kind, QueryKind::ExternalTableExists);
    }

    #[test]
    fn test_default_schema_query_has_no_params() {
        let query = default_schema_query(ParameterStyle::Format);
        assert!(query.params.is_empty());
        assert_eq!(query.kind, QueryKind::DefaultSchema);
    }
}
