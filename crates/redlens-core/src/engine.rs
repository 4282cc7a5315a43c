//! The reflection engine.

use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::catalog::{self, CatalogConnection, CatalogQuery, CatalogRow, ParameterStyle};
use crate::dialect::{DialectOptions, DriverCapabilities};
use crate::error::Result;
use crate::inspector::Inspector;
use crate::types::{DomainMap, EnumMap};

/// Long-lived reflection state for one driver configuration.
///
/// The engine owns the domain table, which is loaded from the first
/// connection that needs it and then shared by every [`Inspector`] it
/// creates. The warehouse does not allow user-defined domains, so the table
/// never needs invalidating. If two sessions race to load it, the first
/// stored value wins and the other is discarded.
#[derive(Debug, Default)]
pub struct ReflectionEngine {
    options: DialectOptions,
    capabilities: DriverCapabilities,
    domains: OnceLock<Arc<DomainMap>>,
    enums: EnumMap,
}

impl ReflectionEngine {
    pub fn new(capabilities: DriverCapabilities) -> Self {
        Self {
            options: DialectOptions::default(),
            capabilities,
            domains: OnceLock::new(),
            enums: EnumMap::new(),
        }
    }

    pub fn with_options(mut self, options: DialectOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &DialectOptions {
        &self.options
    }

    pub fn capabilities(&self) -> &DriverCapabilities {
        &self.capabilities
    }

    /// Parameter style used for every catalog query.
    pub fn parameter_style(&self) -> ParameterStyle {
        self.options
            .parameter_style
            .unwrap_or(self.capabilities.parameter_style)
    }

    /// Starts a reflection session over `conn` with an empty cache.
    pub fn inspector<C: CatalogConnection>(&self, conn: C) -> Inspector<'_, C> {
        Inspector::new(self, conn)
    }

    /// Enumerated types. The warehouse has no enum catalog, so this is empty.
    pub(crate) fn enums(&self) -> &EnumMap {
        &self.enums
    }

    /// Returns the domain table, loading it through `conn` on first use.
    pub fn domains<C: CatalogConnection + ?Sized>(&self, conn: &C) -> Result<Arc<DomainMap>> {
        if let Some(domains) = self.domains.get() {
            return Ok(Arc::clone(domains));
        }
        let rows = execute(conn, &catalog::domains_query(self.parameter_style()))?;
        let loaded = Arc::new(catalog::domain_map(&rows)?);
        debug!(count = loaded.len(), "loaded domain definitions");
        Ok(Arc::clone(self.domains.get_or_init(|| loaded)))
    }

    /// Whether the domain table has been loaded.
    pub fn domains_loaded(&self) -> bool {
        self.domains.get().is_some()
    }
}

/// Runs `query`, tagging failures with its kind.
pub(crate) fn execute<C: CatalogConnection + ?Sized>(
    conn: &C,
    query: &CatalogQuery,
) -> Result<Vec<CatalogRow>> {
    debug!(kind = %query.kind, params = query.params.len(), "running catalog query");
    conn.execute(query).map_err(|err| {
        let err = if err.query.is_none() {
            err.with_query(query.kind)
        } else {
            err
        };
        err.into()
    })
}
