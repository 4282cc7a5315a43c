#![allow(dead_code)]

use redlens_core::{CatalogConnection, CatalogError, CatalogQuery, CatalogRow, CatalogValue, QueryKind};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Scripted catalog that answers by query kind and records every query.
///
/// Kinds without a scripted answer return no rows.
pub struct MockCatalog {
    responses: HashMap<QueryKind, Result<Vec<CatalogRow>, String>>,
    executed: RefCell<Vec<CatalogQuery>>,
    default_schema: Option<String>,
    default_schema_calls: Cell<usize>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            executed: RefCell::new(Vec::new()),
            default_schema: Some("public".to_string()),
            default_schema_calls: Cell::new(0),
        }
    }

    pub fn with_rows(mut self, kind: QueryKind, rows: Vec<CatalogRow>) -> Self {
        self.responses.insert(kind, Ok(rows));
        self
    }

    pub fn with_error(mut self, kind: QueryKind, message: &str) -> Self {
        self.responses.insert(kind, Err(message.to_string()));
        self
    }

    pub fn with_default_schema(mut self, schema: Option<&str>) -> Self {
        self.default_schema = schema.map(str::to_string);
        self
    }

    /// Number of executions of `kind`.
    pub fn calls(&self, kind: QueryKind) -> usize {
        self.executed
            .borrow()
            .iter()
            .filter(|query| query.kind == kind)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.executed.borrow().len()
    }

    pub fn default_schema_calls(&self) -> usize {
        self.default_schema_calls.get()
    }

    pub fn last_query(&self, kind: QueryKind) -> Option<CatalogQuery> {
        self.executed
            .borrow()
            .iter()
            .rev()
            .find(|query| query.kind == kind)
            .cloned()
    }
}

impl CatalogConnection for MockCatalog {
    fn execute(&self, query: &CatalogQuery) -> Result<Vec<CatalogRow>, CatalogError> {
        self.executed.borrow_mut().push(query.clone());
        match self.responses.get(&query.kind) {
            Some(Ok(rows)) => Ok(rows.clone()),
            Some(Err(message)) => Err(CatalogError::new(message.clone())),
            None => Ok(Vec::new()),
        }
    }

    fn default_schema_name(&self) -> Result<Option<String>, CatalogError> {
        self.default_schema_calls.set(self.default_schema_calls.get() + 1);
        Ok(self.default_schema.clone())
    }
}

pub fn relation(relkind: &str, schema: &str, name: &str) -> CatalogRow {
    CatalogRow::new()
        .with("relkind", relkind)
        .with("schema_oid", 2200)
        .with("schema", schema)
        .with("rel_oid", 16384)
        .with("relname", name)
        .with("diststyle", CatalogValue::Null)
        .with("owner_id", 100)
        .with("owner_name", "admin")
        .with("view_definition", CatalogValue::Null)
        .with("privileges", CatalogValue::Null)
}

pub fn column(schema: &str, table: &str, name: &str, format_type: &str, attnum: i64) -> CatalogRow {
    CatalogRow::new()
        .with("schema", schema)
        .with("table_name", table)
        .with("name", name)
        .with("encode", "none")
        .with("format_type", format_type)
        .with("distkey", false)
        .with("sortkey", 0)
        .with("notnull", false)
        .with("comment", CatalogValue::Null)
        .with("default", CatalogValue::Null)
        .with("attnum", attnum)
        .with("schema_oid", 2200)
        .with("table_oid", 16384)
}

#[allow(clippy::too_many_arguments)]
pub fn constraint(
    schema: &str,
    table: &str,
    contype: &str,
    conname: &str,
    conkey: &[i64],
    attnum: i64,
    attname: &str,
    condef: &str,
) -> CatalogRow {
    CatalogRow::new()
        .with("schema", schema)
        .with("table_name", table)
        .with("contype", contype)
        .with("conname", conname)
        .with("conkey", conkey.to_vec())
        .with("attnum", attnum)
        .with("attname", attname)
        .with("condef", condef)
}

pub fn check(name: &str, src: &str) -> CatalogRow {
    CatalogRow::new().with("name", name).with("src", src)
}

pub fn oid(value: i64) -> CatalogRow {
    CatalogRow::new().with("oid", value)
}
