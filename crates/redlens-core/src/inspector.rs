//! The public reflection API.
//!
//! An [`Inspector`] is one reflection session: a connection plus the
//! [`InfoCache`] that memoizes bulk catalog results across calls. Columns and
//! constraints are always fetched for a whole schema and sliced per table, so
//! reflecting many tables of one schema costs one query per kind.
//!
//! Lookups by table name first try the name exactly as given, then with one
//! level of quoting removed. The catalog reports `"Group"` as `Group`, and
//! callers commonly pass the quoted spelling for reserved words.

use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::cache::{BulkKey, InfoCache};
use crate::catalog::{self, CatalogConnection, CatalogFilter};
use crate::engine::{execute, ReflectionEngine};
use crate::error::{ReflectionError, Result};
use crate::grammar;
use crate::identifier::{quote_identifier, unquote, unquote_opt, DatashareRef, RelationKey};
use crate::type_resolver::TypeResolver;
use crate::types::{
    CheckConstraint, ColumnMap, ConstraintKind, ConstraintMap, ForeignKeyConstraint,
    PrimaryKeyConstraint, RawColumnRow, RawConstraintRow, RawRelationRow, ReflectedColumn,
    ReflectedIndex, RelKind, RelationMap, TableOptions, TableReflection, UniqueConstraint,
};

/// Finds `key` in `map`, retrying with the unquoted key.
fn lookup<'m, V>(map: &'m IndexMap<RelationKey, V>, key: &RelationKey) -> Option<&'m V> {
    map.get(key).or_else(|| map.get(&key.unquoted()))
}

/// Spells `key` the way a `regclass` cast expects, so mixed-case and reserved
/// names are not folded to lowercase by the server.
fn regclass_name(key: &RelationKey) -> String {
    let name = quote_identifier(unquote(&key.name));
    match &key.schema {
        Some(schema) => format!("{}.{name}", quote_identifier(unquote(schema))),
        None => name,
    }
}

/// Reflection session over one connection.
pub struct Inspector<'e, C> {
    engine: &'e ReflectionEngine,
    conn: C,
    cache: InfoCache,
}

impl<'e, C: CatalogConnection> Inspector<'e, C> {
    pub fn new(engine: &'e ReflectionEngine, conn: C) -> Self {
        Self {
            engine,
            conn,
            cache: InfoCache::new(),
        }
    }

    /// Continues a session with results memoized by an earlier one.
    pub fn with_cache(mut self, cache: InfoCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &InfoCache {
        &self.cache
    }

    /// Ends the session, handing back its cache for reuse.
    pub fn into_cache(self) -> InfoCache {
        self.cache
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// The session's default schema, memoized.
    pub fn default_schema_name(&mut self) -> Result<Option<String>> {
        if let Some(schema) = self.cache.default_schema() {
            return Ok(schema.clone());
        }
        let schema = self.conn.default_schema_name()?;
        self.cache.set_default_schema(schema.clone());
        Ok(schema)
    }

    fn schema_or_default(&mut self, schema: Option<&str>) -> Result<Option<String>> {
        match schema {
            Some(schema) if !schema.is_empty() => Ok(Some(schema.to_string())),
            _ => self.default_schema_name(),
        }
    }

    fn relation_key(&mut self, table: &str, schema: Option<&str>) -> Result<RelationKey> {
        let default = match schema {
            Some(schema) if !schema.is_empty() => None,
            _ => self.default_schema_name()?,
        };
        RelationKey::resolve(table, schema, || Ok(default))
    }

    fn all_relations(&mut self, schema: Option<&str>, table: Option<&str>) -> Result<Arc<RelationMap>> {
        let key = match table {
            Some(table) => BulkKey::table(schema, table),
            None => BulkKey::schema(schema),
        };
        if let Some(relations) = self.cache.relations(&key) {
            debug!(?schema, ?table, "reusing cached relations");
            return Ok(relations);
        }
        let filter = CatalogFilter::for_schema(schema).with_table(table);
        let query = catalog::relations_query(self.engine.parameter_style(), &filter);
        let rows = execute(&self.conn, &query)?;
        let relations = Arc::new(catalog::group_relations(&rows)?);
        self.cache.insert_relations(key, Arc::clone(&relations));
        Ok(relations)
    }

    fn schema_columns(&mut self, schema: Option<&str>) -> Result<Arc<ColumnMap>> {
        let key = BulkKey::schema(schema);
        if let Some(columns) = self.cache.columns(&key) {
            debug!(?schema, "reusing cached columns");
            return Ok(columns);
        }
        let filter = CatalogFilter::for_schema(schema);
        let query = catalog::columns_query(self.engine.parameter_style(), &filter);
        let rows = execute(&self.conn, &query)?;
        let columns = Arc::new(catalog::group_columns(&rows)?);
        self.cache.insert_columns(key, Arc::clone(&columns));
        Ok(columns)
    }

    fn schema_constraints(&mut self, schema: Option<&str>) -> Result<Arc<ConstraintMap>> {
        let key = BulkKey::schema(schema);
        if let Some(constraints) = self.cache.constraints(&key) {
            debug!(?schema, "reusing cached constraints");
            return Ok(constraints);
        }
        let filter = CatalogFilter::for_schema(schema);
        let query = catalog::constraints_query(self.engine.parameter_style(), &filter);
        let rows = execute(&self.conn, &query)?;
        let constraints = Arc::new(catalog::group_constraints(&rows)?);
        self.cache.insert_constraints(key, Arc::clone(&constraints));
        Ok(constraints)
    }

    fn relation(&mut self, key: &RelationKey) -> Result<RawRelationRow> {
        let relations = self.all_relations(key.schema.as_deref(), Some(&key.name))?;
        lookup(&relations, key)
            .cloned()
            .ok_or_else(|| ReflectionError::NoSuchRelation(key.to_string()))
    }

    fn column_rows(&mut self, key: &RelationKey) -> Result<Vec<RawColumnRow>> {
        let columns = self.schema_columns(key.schema.as_deref())?;
        lookup(&columns, key)
            .cloned()
            .ok_or_else(|| ReflectionError::NoSuchRelation(key.to_string()))
    }

    fn constraint_rows(&mut self, key: &RelationKey, kind: ConstraintKind) -> Result<Vec<RawConstraintRow>> {
        let constraints = self.schema_constraints(key.schema.as_deref())?;
        Ok(lookup(&constraints, key)
            .map(|rows| rows.iter().filter(|row| row.contype == kind).cloned().collect())
            .unwrap_or_default())
    }

    /// Columns of `table` in catalog position order, with resolved types.
    #[instrument(skip(self), err)]
    pub fn get_columns(&mut self, table: &str, schema: Option<&str>) -> Result<Vec<ReflectedColumn>> {
        let key = self.relation_key(table, schema)?;
        let rows = self.column_rows(&key)?;
        let domains = self.engine.domains(&self.conn)?;
        let resolver = TypeResolver::new(&domains, self.engine.enums())
            .with_max_domain_depth(self.engine.options().max_domain_depth);
        rows.iter().map(|row| resolver.resolve_column(row)).collect()
    }

    /// The primary key of `table`; empty when it has none.
    #[instrument(skip(self), err)]
    pub fn get_pk_constraint(&mut self, table: &str, schema: Option<&str>) -> Result<PrimaryKeyConstraint> {
        let key = self.relation_key(table, schema)?;
        let rows = self.constraint_rows(&key, ConstraintKind::Primary)?;
        let Some(first) = rows.first() else {
            return Ok(PrimaryKeyConstraint::default());
        };
        let columns = grammar::parse_primary_key(&first.condef)?;
        Ok(PrimaryKeyConstraint {
            name: Some(first.conname.clone()),
            constrained_columns: columns.iter().map(|c| unquote(c).to_string()).collect(),
        })
    }

    /// Foreign keys of `table`, one per constraint name.
    #[instrument(skip(self), err)]
    pub fn get_foreign_keys(&mut self, table: &str, schema: Option<&str>) -> Result<Vec<ForeignKeyConstraint>> {
        let key = self.relation_key(table, schema)?;
        let rows = self.constraint_rows(&key, ConstraintKind::Foreign)?;

        // A multi-column constraint yields one row per column, all sharing
        // the same definition.
        let mut definitions: IndexMap<&str, &str> = IndexMap::new();
        for row in &rows {
            definitions.insert(row.conname.as_str(), row.condef.as_str());
        }

        definitions
            .into_iter()
            .map(|(name, condef)| {
                let fk = grammar::parse_foreign_key(condef)?;
                Ok(ForeignKeyConstraint {
                    name: name.to_string(),
                    constrained_columns: fk.columns.iter().map(|c| unquote(c).to_string()).collect(),
                    referred_schema: unquote_opt(fk.referred_schema.as_deref()),
                    referred_table: unquote(&fk.referred_table).to_string(),
                    referred_columns: fk
                        .referred_columns
                        .iter()
                        .map(|c| unquote(c).to_string())
                        .collect(),
                })
            })
            .collect()
    }

    /// Unique constraints of `table`, columns in constraint key order.
    #[instrument(skip(self), err)]
    pub fn get_unique_constraints(&mut self, table: &str, schema: Option<&str>) -> Result<Vec<UniqueConstraint>> {
        let key = self.relation_key(table, schema)?;
        let rows = self.constraint_rows(&key, ConstraintKind::Unique)?;

        struct Group<'r> {
            conkey: &'r [i64],
            names: IndexMap<i64, &'r str>,
        }
        let mut groups: IndexMap<&str, Group<'_>> = IndexMap::new();
        for row in &rows {
            let group = groups.entry(row.conname.as_str()).or_insert_with(|| Group {
                conkey: row.conkey.as_slice(),
                names: IndexMap::new(),
            });
            group.conkey = row.conkey.as_slice();
            group.names.insert(row.attnum, row.attname.as_str());
        }

        Ok(groups
            .into_iter()
            .map(|(name, group)| UniqueConstraint {
                name: name.to_string(),
                column_names: group
                    .conkey
                    .iter()
                    .filter_map(|attnum| group.names.get(attnum))
                    .map(|name| name.to_string())
                    .collect(),
            })
            .collect())
    }

    /// CHECK constraints of `table`.
    ///
    /// Definitions that do not parse are reported with an empty `sqltext`.
    #[instrument(skip(self), err)]
    pub fn get_check_constraints(&mut self, table: &str, schema: Option<&str>) -> Result<Vec<CheckConstraint>> {
        let key = self.relation_key(table, schema)?;
        if let Some(checks) = self.cache.check_constraints(&key) {
            debug!(table = %key, "reusing cached check constraints");
            return Ok(checks);
        }
        let checks = match self.get_table_oid(table, schema)? {
            Some(oid) => self.fetch_check_constraints(oid)?,
            None => Vec::new(),
        };
        self.cache.insert_check_constraints(key, checks.clone());
        Ok(checks)
    }

    fn fetch_check_constraints(&self, oid: i64) -> Result<Vec<CheckConstraint>> {
        let query = catalog::check_constraints_query(self.engine.parameter_style(), oid);
        let rows = execute(&self.conn, &query)?;

        Ok(catalog::check_constraint_rows(&rows)?
            .into_iter()
            .map(|(name, src)| match grammar::parse_check(&src) {
                Ok(check) => CheckConstraint {
                    name,
                    sqltext: check.sqltext,
                    not_valid: check.not_valid,
                },
                Err(err) => {
                    warn!(constraint = %name, error = %err, "could not parse CHECK constraint text");
                    CheckConstraint {
                        name,
                        sqltext: String::new(),
                        not_valid: false,
                    }
                }
            })
            .collect())
    }

    /// Distribution and sort key options of `table`.
    #[instrument(skip(self), err)]
    pub fn get_table_options(&mut self, table: &str, schema: Option<&str>) -> Result<TableOptions> {
        let key = self.relation_key(table, schema)?;
        let relation = self.relation(&key)?;
        let columns = self.column_rows(&key)?;

        let mut sort_columns: Vec<&RawColumnRow> =
            columns.iter().filter(|col| col.sort_key != 0).collect();
        sort_columns.sort_by_key(|col| col.sort_key.abs());
        let interleaved = sort_columns.iter().any(|col| col.sort_key < 0);
        let sort_names: Vec<String> = sort_columns.iter().map(|col| col.name.clone()).collect();
        let (sortkey, interleaved_sortkey) = match (sort_names.is_empty(), interleaved) {
            (true, _) => (None, None),
            (false, true) => (None, Some(sort_names)),
            (false, false) => (Some(sort_names), None),
        };

        let dist_keys: Vec<&str> = columns
            .iter()
            .filter(|col| col.dist_key)
            .map(|col| col.name.as_str())
            .collect();
        if dist_keys.len() > 1 {
            warn!(
                table = %key,
                columns = ?dist_keys,
                "multiple distribution key columns reported; using the first"
            );
        }

        Ok(TableOptions {
            diststyle: relation.dist_style,
            distkey: dist_keys.first().map(|name| name.to_string()),
            sortkey,
            interleaved_sortkey,
            datashare: key
                .schema
                .as_deref()
                .and_then(DatashareRef::parse)
                .map(|share| share.datashare),
        })
    }

    fn relation_names(&mut self, schema: Option<&str>, kind: RelKind) -> Result<Vec<String>> {
        let schema = self.schema_or_default(schema)?;
        let relations = self.all_relations(schema.as_deref(), None)?;
        let wanted = schema.as_deref().map(unquote);
        Ok(relations
            .iter()
            .filter(|(key, relation)| {
                relation.relkind == kind
                    && (wanted.is_none() || key.schema.as_deref().map(unquote) == wanted)
            })
            .map(|(key, _)| unquote(&key.name).to_string())
            .collect())
    }

    /// Ordinary, external and datashare tables of `schema`.
    #[instrument(skip(self), err)]
    pub fn get_table_names(&mut self, schema: Option<&str>) -> Result<Vec<String>> {
        self.relation_names(schema, RelKind::Table)
    }

    #[instrument(skip(self), err)]
    pub fn get_view_names(&mut self, schema: Option<&str>) -> Result<Vec<String>> {
        self.relation_names(schema, RelKind::View)
    }

    #[instrument(skip(self), err)]
    pub fn get_materialized_view_names(&mut self, schema: Option<&str>) -> Result<Vec<String>> {
        self.relation_names(schema, RelKind::MaterializedView)
    }

    /// Temporary tables are never reported by the warehouse catalog.
    pub fn get_temp_table_names(&mut self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// SQL body of a view, without the trailing semicolon.
    #[instrument(skip(self), err)]
    pub fn get_view_definition(&mut self, view: &str, schema: Option<&str>) -> Result<Option<String>> {
        let key = self.relation_key(view, schema)?;
        Ok(self.relation(&key)?.view_definition)
    }

    /// Whether any catalog source knows the relation.
    #[instrument(skip(self), err)]
    pub fn has_table(&mut self, table: &str, schema: Option<&str>) -> Result<bool> {
        let key = self.relation_key(table, schema)?;
        let relations = self.all_relations(key.schema.as_deref(), Some(&key.name))?;
        Ok(lookup(&relations, &key).is_some())
    }

    /// Object identifier of a local relation.
    ///
    /// External and datashare tables have no oid and yield `None`. If a local
    /// relation is not found anywhere, the original cast failure is returned;
    /// an unknown datashare relation is [`ReflectionError::NoSuchRelation`].
    #[instrument(skip(self), err)]
    pub fn get_table_oid(&mut self, table: &str, schema: Option<&str>) -> Result<Option<i64>> {
        let key = self.relation_key(table, schema)?;
        if let Some(oid) = self.cache.table_oid(&key) {
            return Ok(oid);
        }

        let style = self.engine.parameter_style();
        let filter = CatalogFilter::for_schema(key.schema.as_deref()).with_table(Some(&key.name));
        let oid = if filter.datashare.is_some() {
            // Cross-database relations cannot be cast to regclass.
            let rows = execute(&self.conn, &catalog::datashare_table_exists_query(style, &filter))?;
            if !catalog::found_any(&rows) {
                return Err(ReflectionError::NoSuchRelation(key.to_string()));
            }
            None
        } else {
            match execute(&self.conn, &catalog::table_oid_query(style, &regclass_name(&key))) {
                Ok(rows) => catalog::table_oid(&rows)?,
                Err(cast_error) => {
                    let rows = execute(&self.conn, &catalog::external_table_exists_query(style, &filter))?;
                    if !catalog::found_any(&rows) {
                        return Err(cast_error);
                    }
                    debug!(table = %key, "relation has no oid; found as external relation");
                    None
                }
            }
        };

        self.cache.insert_table_oid(key, oid);
        Ok(oid)
    }

    /// Always empty; the warehouse has no user-visible indexes.
    pub fn get_indexes(&mut self, _table: &str, _schema: Option<&str>) -> Result<Vec<ReflectedIndex>> {
        Ok(Vec::new())
    }

    /// Columns, keys, constraints and options of one table.
    #[instrument(skip(self), err)]
    pub fn reflect_table(&mut self, table: &str, schema: Option<&str>) -> Result<TableReflection> {
        let key = self.relation_key(table, schema)?;
        let schema = key.schema.as_deref();
        Ok(TableReflection {
            schema: schema.map(unquote).unwrap_or_default().to_string(),
            name: unquote(&key.name).to_string(),
            columns: self.get_columns(&key.name, schema)?,
            primary_key: self.get_pk_constraint(&key.name, schema)?,
            foreign_keys: self.get_foreign_keys(&key.name, schema)?,
            unique_constraints: self.get_unique_constraints(&key.name, schema)?,
            check_constraints: self.get_check_constraints(&key.name, schema)?,
            options: self.get_table_options(&key.name, schema)?,
        })
    }

    /// Applies `reflect` to every table of `schema`.
    fn multi<T, F>(&mut self, schema: Option<&str>, mut reflect: F) -> Result<IndexMap<RelationKey, T>>
    where
        F: FnMut(&mut Self, &str, Option<&str>) -> Result<T>,
    {
        let schema = self.schema_or_default(schema)?;
        let mut results = IndexMap::new();
        for name in self.relation_names(schema.as_deref(), RelKind::Table)? {
            let value = reflect(self, &name, schema.as_deref())?;
            let key = RelationKey {
                name,
                schema: schema.clone(),
            };
            results.insert(key, value);
        }
        Ok(results)
    }

    pub fn get_multi_columns(&mut self, schema: Option<&str>) -> Result<IndexMap<RelationKey, Vec<ReflectedColumn>>> {
        self.multi(schema, Self::get_columns)
    }

    pub fn get_multi_pk_constraint(
        &mut self,
        schema: Option<&str>,
    ) -> Result<IndexMap<RelationKey, PrimaryKeyConstraint>> {
        self.multi(schema, Self::get_pk_constraint)
    }

    pub fn get_multi_foreign_keys(
        &mut self,
        schema: Option<&str>,
    ) -> Result<IndexMap<RelationKey, Vec<ForeignKeyConstraint>>> {
        self.multi(schema, Self::get_foreign_keys)
    }

    pub fn get_multi_unique_constraints(
        &mut self,
        schema: Option<&str>,
    ) -> Result<IndexMap<RelationKey, Vec<UniqueConstraint>>> {
        self.multi(schema, Self::get_unique_constraints)
    }

    pub fn get_multi_indexes(&mut self, schema: Option<&str>) -> Result<IndexMap<RelationKey, Vec<ReflectedIndex>>> {
        self.multi(schema, Self::get_indexes)
    }
}
