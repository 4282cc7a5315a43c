//! The reflection report printed by the CLI.

use redlens_core::{CatalogConnection, Inspector, ReflectionError, TableReflection};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Everything reflected from one schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionReport {
    /// Reflected schema; empty when the session has no current schema.
    pub schema: String,
    pub tables: Vec<TableReflection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub views: Vec<ViewReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewReport {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

/// What to reflect.
#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    pub schema: Option<String>,
    /// Tables to reflect; every table of the schema when empty.
    pub tables: Vec<String>,
    pub include_views: bool,
}

/// Reflects the requested relations through `inspector`.
pub fn build_report<C: CatalogConnection>(
    inspector: &mut Inspector<'_, C>,
    request: &ReportRequest,
) -> Result<ReflectionReport, ReflectionError> {
    let schema = match request.schema.as_deref() {
        Some(schema) => Some(schema.to_string()),
        None => inspector.default_schema_name()?,
    };
    let schema_ref = schema.as_deref();

    let table_names = if request.tables.is_empty() {
        inspector.get_table_names(schema_ref)?
    } else {
        request.tables.clone()
    };

    let tables = table_names
        .iter()
        .map(|name| inspector.reflect_table(name, schema_ref))
        .collect::<Result<Vec<_>, _>>()?;

    let mut views = Vec::new();
    if request.include_views {
        for name in inspector.get_view_names(schema_ref)? {
            let definition = inspector.get_view_definition(&name, schema_ref)?;
            views.push(ViewReport { name, definition });
        }
    }

    info!(
        tables = tables.len(),
        views = views.len(),
        cached = inspector.cache().len(),
        "reflection finished"
    );

    Ok(ReflectionReport {
        schema: schema.unwrap_or_default(),
        tables,
        views,
    })
}
