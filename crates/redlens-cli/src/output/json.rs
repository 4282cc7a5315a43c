//! JSON output formatting.

use crate::report::ReflectionReport;

/// Format the reflection report as JSON.
///
/// If `compact` is true, outputs minified JSON without whitespace.
pub fn format_json(report: &ReflectionReport, compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(report)
    } else {
        serde_json::to_string_pretty(report)
    }
}

/// JSON schema describing the report produced by `--format json`.
pub fn format_json_schema() -> serde_json::Result<String> {
    let schema = schemars::schema_for!(ReflectionReport);
    serde_json::to_string_pretty(&schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ReflectionReport {
        serde_json::from_str(
            r#"{
                "schema": "public",
                "tables": [{
                    "schema": "public",
                    "name": "orders",
                    "columns": [{"name": "id", "type": {"kind": "integer"}, "nullable": false, "autoincrement": false}],
                    "primaryKey": {"constrainedColumns": ["id"], "name": "orders_pkey"},
                    "foreignKeys": [],
                    "uniqueConstraints": [],
                    "checkConstraints": [],
                    "options": {}
                }]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_json_pretty() {
        let json = format_json(&report(), false).unwrap();
        assert!(json.contains('\n'));
        assert!(json.contains("\"primaryKey\""));
    }

    #[test]
    fn test_json_compact() {
        let json = format_json(&report(), true).unwrap();
        assert!(!json.starts_with("{\n"));
        assert!(json.contains(r#""type":{"kind":"integer"}"#));
    }

    #[test]
    fn test_schema_describes_tables() {
        let schema = format_json_schema().unwrap();
        assert!(schema.contains("ReflectionReport"));
        assert!(schema.contains("TableReflection"));
    }
}
