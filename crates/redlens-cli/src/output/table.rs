//! Human-readable table output formatting.

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use redlens_core::{DistStyle, ReflectedColumn, TableReflection};
use std::fmt;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::report::{ReflectionReport, ViewReport};

/// Format the reflection report as human-readable text with optional colors.
pub fn format_table(report: &ReflectionReport, use_colors: bool) -> String {
    let colored = use_colors && std::io::stdout().is_terminal();
    TextReport { report, colored }.to_string()
}

#[derive(Tabled)]
#[tabled(rename_all = "UPPERCASE")]
struct ColumnLine {
    name: String,
    #[tabled(rename = "TYPE")]
    column_type: String,
    null: &'static str,
    default: String,
    encode: String,
}

impl From<&ReflectedColumn> for ColumnLine {
    fn from(column: &ReflectedColumn) -> Self {
        let default = match (&column.identity, &column.default) {
            (Some(identity), _) => format!("IDENTITY({}, {})", identity.seed, identity.step),
            (None, Some(default)) => default.clone(),
            (None, None) => String::new(),
        };
        Self {
            name: column.name.clone(),
            column_type: column.column_type.to_string(),
            null: if column.nullable { "YES" } else { "NO" },
            default,
            encode: column.info.encode.clone().unwrap_or_default(),
        }
    }
}

struct TextReport<'a> {
    report: &'a ReflectionReport,
    colored: bool,
}

impl TextReport<'_> {
    fn heading(&self, text: &str) -> String {
        if self.colored {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn label(&self, text: &str) -> String {
        if self.colored {
            text.cyan().to_string()
        } else {
            text.to_string()
        }
    }

    fn write_table(&self, f: &mut fmt::Formatter<'_>, table: &TableReflection) -> fmt::Result {
        writeln!(f, "{}", self.heading(&format!("{}.{}", table.schema, table.name)))?;

        let lines: Vec<ColumnLine> = table.columns.iter().map(ColumnLine::from).collect();
        let mut grid = Table::new(lines);
        grid.with(Style::psql());
        writeln!(f, "{grid}")?;

        let pk = &table.primary_key;
        if let Some(name) = &pk.name {
            writeln!(
                f,
                "{} {name} ({})",
                self.label("Primary key:"),
                pk.constrained_columns.join(", ")
            )?;
        }

        for fk in &table.foreign_keys {
            let target = match &fk.referred_schema {
                Some(schema) => format!("{schema}.{}", fk.referred_table),
                None => fk.referred_table.clone(),
            };
            writeln!(
                f,
                "{} {} ({}) -> {target} ({})",
                self.label("Foreign key:"),
                fk.name,
                fk.constrained_columns.join(", "),
                fk.referred_columns.join(", ")
            )?;
        }

        for unique in &table.unique_constraints {
            writeln!(
                f,
                "{} {} ({})",
                self.label("Unique:"),
                unique.name,
                unique.column_names.join(", ")
            )?;
        }

        for check in &table.check_constraints {
            let suffix = if check.not_valid { " NOT VALID" } else { "" };
            writeln!(
                f,
                "{} {} CHECK ({}){suffix}",
                self.label("Check:"),
                check.name,
                check.sqltext
            )?;
        }

        let options = &table.options;
        if let Some(style) = options.diststyle {
            let style = match style {
                DistStyle::Even => "EVEN",
                DistStyle::Key => "KEY",
                DistStyle::All => "ALL",
            };
            match &options.distkey {
                Some(key) => writeln!(f, "{} {style} ({key})", self.label("Distribution:"))?,
                None => writeln!(f, "{} {style}", self.label("Distribution:"))?,
            }
        }
        if let Some(keys) = &options.sortkey {
            writeln!(f, "{} COMPOUND ({})", self.label("Sort key:"), keys.join(", "))?;
        }
        if let Some(keys) = &options.interleaved_sortkey {
            writeln!(f, "{} INTERLEAVED ({})", self.label("Sort key:"), keys.join(", "))?;
        }
        if let Some(datashare) = &options.datashare {
            writeln!(f, "{} {datashare}", self.label("Datashare:"))?;
        }
        writeln!(f)
    }

    fn write_view(&self, f: &mut fmt::Formatter<'_>, view: &ViewReport) -> fmt::Result {
        writeln!(f, "  {}", view.name)?;
        if let Some(definition) = &view.definition {
            for line in definition.lines() {
                if self.colored {
                    writeln!(f, "    {}", line.dimmed())?;
                } else {
                    writeln!(f, "    {line}")?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schema = if self.report.schema.is_empty() {
            "(no schema)"
        } else {
            self.report.schema.as_str()
        };
        writeln!(f, "{}", self.heading(&format!("Schema {schema}")))?;
        writeln!(f, "{}", "═".repeat(50))?;
        writeln!(
            f,
            "{} tables | {} views",
            self.report.tables.len(),
            self.report.views.len()
        )?;
        writeln!(f)?;

        for table in &self.report.tables {
            self.write_table(f, table)?;
        }

        if !self.report.views.is_empty() {
            writeln!(f, "{}", self.heading("Views:"))?;
            for view in &self.report.views {
                self.write_view(f, view)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redlens_core::{
        CheckConstraint, ColumnInfo, ColumnType, ForeignKeyConstraint, IdentitySpec,
        PrimaryKeyConstraint, TableOptions,
    };

    fn column(name: &str, column_type: ColumnType) -> ReflectedColumn {
        ReflectedColumn {
            name: name.to_string(),
            column_type,
            nullable: true,
            default: None,
            autoincrement: false,
            comment: None,
            identity: None,
            computed: None,
            info: ColumnInfo::default(),
        }
    }

    fn report() -> ReflectionReport {
        let mut id = column("id", ColumnType::BigInt);
        id.nullable = false;
        id.identity = Some(IdentitySpec { seed: 1, step: 1 });
        id.info.encode = Some("az64".to_string());

        ReflectionReport {
            schema: "public".to_string(),
            tables: vec![TableReflection {
                schema: "public".to_string(),
                name: "orders".to_string(),
                columns: vec![id, column("note", ColumnType::Varchar { length: Some(30) })],
                primary_key: PrimaryKeyConstraint {
                    name: Some("orders_pkey".to_string()),
                    constrained_columns: vec!["id".to_string()],
                },
                foreign_keys: vec![ForeignKeyConstraint {
                    name: "orders_customer_fkey".to_string(),
                    constrained_columns: vec!["customer_id".to_string()],
                    referred_schema: Some("crm".to_string()),
                    referred_table: "customers".to_string(),
                    referred_columns: vec!["id".to_string()],
                }],
                unique_constraints: vec![],
                check_constraints: vec![CheckConstraint {
                    name: "note_len".to_string(),
                    sqltext: "len(note) > 0".to_string(),
                    not_valid: true,
                }],
                options: TableOptions {
                    diststyle: Some(DistStyle::Key),
                    distkey: Some("id".to_string()),
                    interleaved_sortkey: Some(vec!["id".to_string(), "note".to_string()]),
                    ..TableOptions::default()
                },
            }],
            views: vec![ViewReport {
                name: "recent".to_string(),
                definition: Some("SELECT *\nFROM orders".to_string()),
            }],
        }
    }

    #[test]
    fn test_plain_report() {
        let out = format_table(&report(), false);
        assert!(out.contains("Schema public"));
        assert!(out.contains("public.orders"));
        assert!(out.contains("BIGINT"));
        assert!(out.contains("VARCHAR(30)"));
        assert!(out.contains("IDENTITY(1, 1)"));
        assert!(out.contains("az64"));
        assert!(out.contains("Primary key: orders_pkey (id)"));
        assert!(out.contains("orders_customer_fkey (customer_id) -> crm.customers (id)"));
        assert!(out.contains("CHECK (len(note) > 0) NOT VALID"));
        assert!(out.contains("Distribution: KEY (id)"));
        assert!(out.contains("Sort key: INTERLEAVED (id, note)"));
        assert!(out.contains("    FROM orders"));
        assert!(!out.contains('\u{1b}'));
    }

    #[test]
    fn test_empty_report() {
        let out = format_table(&ReflectionReport::default(), false);
        assert!(out.contains("(no schema)"));
        assert!(out.contains("0 tables | 0 views"));
        assert!(!out.contains("Views:"));
    }
}
