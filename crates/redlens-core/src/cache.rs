//! Per-session memoization of catalog results.
//!
//! An [`InfoCache`] holds the bulk results fetched during a batch of
//! reflection calls. Entries never expire; discard the cache when the
//! underlying schema may have changed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::identifier::RelationKey;
use crate::types::{CheckConstraint, ColumnMap, ConstraintMap, RelationMap};

/// Scope of one bulk fetch: a schema, optionally narrowed to one table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct BulkKey {
    pub schema: Option<String>,
    pub table: Option<String>,
}

impl BulkKey {
    pub fn schema(schema: Option<&str>) -> Self {
        Self {
            schema: schema.map(str::to_string),
            table: None,
        }
    }

    pub fn table(schema: Option<&str>, table: &str) -> Self {
        Self {
            schema: schema.map(str::to_string),
            table: Some(table.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InfoCache {
    default_schema: Option<Option<String>>,
    relations: HashMap<BulkKey, Arc<RelationMap>>,
    columns: HashMap<BulkKey, Arc<ColumnMap>>,
    constraints: HashMap<BulkKey, Arc<ConstraintMap>>,
    table_oids: HashMap<RelationKey, Option<i64>>,
    check_constraints: HashMap<RelationKey, Vec<CheckConstraint>>,
}

impl InfoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every memoized result.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Number of memoized bulk results, oids and per-table check lists.
    pub fn len(&self) -> usize {
        self.relations.len()
            + self.columns.len()
            + self.constraints.len()
            + self.table_oids.len()
            + self.check_constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.default_schema.is_none()
    }

    pub(crate) fn default_schema(&self) -> Option<&Option<String>> {
        self.default_schema.as_ref()
    }

    pub(crate) fn set_default_schema(&mut self, schema: Option<String>) {
        self.default_schema = Some(schema);
    }

    /// Relations for `key`, falling back to a schema-wide entry that covers it.
    pub(crate) fn relations(&self, key: &BulkKey) -> Option<Arc<RelationMap>> {
        self.relations.get(key).cloned().or_else(|| {
            key.table.as_ref()?;
            self.relations
                .get(&BulkKey {
                    schema: key.schema.clone(),
                    table: None,
                })
                .cloned()
        })
    }

    pub(crate) fn insert_relations(&mut self, key: BulkKey, value: Arc<RelationMap>) {
        self.relations.insert(key, value);
    }

    pub(crate) fn columns(&self, key: &BulkKey) -> Option<Arc<ColumnMap>> {
        self.columns.get(key).cloned()
    }

    pub(crate) fn insert_columns(&mut self, key: BulkKey, value: Arc<ColumnMap>) {
        self.columns.insert(key, value);
    }

    pub(crate) fn constraints(&self, key: &BulkKey) -> Option<Arc<ConstraintMap>> {
        self.constraints.get(key).cloned()
    }

    pub(crate) fn insert_constraints(&mut self, key: BulkKey, value: Arc<ConstraintMap>) {
        self.constraints.insert(key, value);
    }

    pub(crate) fn table_oid(&self, key: &RelationKey) -> Option<Option<i64>> {
        self.table_oids.get(key).copied()
    }

    pub(crate) fn insert_table_oid(&mut self, key: RelationKey, oid: Option<i64>) {
        self.table_oids.insert(key, oid);
    }

    pub(crate) fn check_constraints(&self, key: &RelationKey) -> Option<Vec<CheckConstraint>> {
        self.check_constraints.get(key).cloned()
    }

    pub(crate) fn insert_check_constraints(&mut self, key: RelationKey, checks: Vec<CheckConstraint>) {
        self.check_constraints.insert(key, checks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lookup_reuses_schema_wide_relations() {
        let mut cache = InfoCache::new();
        cache.insert_relations(BulkKey::schema(Some("public")), Arc::new(RelationMap::new()));
        assert!(cache.relations(&BulkKey::table(Some("public"), "t")).is_some());
        assert!(cache.relations(&BulkKey::table(Some("other"), "t")).is_none());
    }

    #[test]
    fn test_schema_lookup_does_not_use_table_entries() {
        let mut cache = InfoCache::new();
        cache.insert_relations(BulkKey::table(Some("public"), "t"), Arc::new(RelationMap::new()));
        assert!(cache.relations(&BulkKey::schema(Some("public"))).is_none());
    }

    #[test]
    fn test_clear() {
        let mut cache = InfoCache::new();
        cache.set_default_schema(Some("public".to_string()));
        cache.insert_table_oid(RelationKey::new("t", "public"), Some(1));
        cache.insert_check_constraints(RelationKey::new("t", "public"), Vec::new());
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
