//! redlens CLI - Redshift schema reflection

use redlens_cli::cli;
#[cfg(feature = "live-catalog")]
use redlens_cli::catalog;
use redlens_cli::logging;
use redlens_cli::output;
use redlens_cli::report;
use redlens_cli::ConfigError;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use cli::{Args, OutputFormat};

/// Reflection or connection failed.
const EXIT_FAILURE: u8 = 1;
/// Configuration error (e.g. missing or malformed connection URL).
const EXIT_CONFIG_ERROR: u8 = 66;

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.quiet, args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("redlens: error: {e:#}");
            if e.downcast_ref::<ConfigError>().is_some() {
                ExitCode::from(EXIT_CONFIG_ERROR)
            } else {
                ExitCode::from(EXIT_FAILURE)
            }
        }
    }
}

fn run(args: Args) -> Result<()> {
    if args.print_schema {
        let schema = output::format_json_schema().context("failed to render report schema")?;
        return write_output(&args, &schema);
    }

    let url = args.url.as_deref().ok_or(ConfigError::MissingUrl)?;
    let report = reflect(&args, url)?;

    let rendered = match args.format {
        OutputFormat::Json => {
            output::format_json(&report, args.compact).context("failed to serialize report")?
        }
        OutputFormat::Table => output::format_table(&report, args.output.is_none()),
    };
    write_output(&args, &rendered)
}

#[cfg(feature = "live-catalog")]
fn reflect(args: &Args, url: &str) -> Result<report::ReflectionReport> {
    use redlens_core::{DialectOptions, DriverCapabilities, DriverKind, ParameterStyle, ReflectionEngine};

    let mut capabilities = DriverCapabilities::for_kind(args.driver.into());
    if let Some(path) = &args.ssl_root_cert {
        if capabilities.kind != DriverKind::Libpq {
            anyhow::bail!(ConfigError::InvalidParameter {
                name: "ssl-root-cert".to_string(),
                value: path.display().to_string(),
            });
        }
        capabilities = DriverCapabilities::libpq(Some(path.clone()));
    }
    // This transport always speaks the PostgreSQL extended protocol.
    let options = DialectOptions {
        parameter_style: Some(ParameterStyle::Numeric),
        max_domain_depth: args.max_domain_depth,
        ..DialectOptions::default()
    };

    let conn = catalog::SqlxCatalog::connect(url, &capabilities, &options)
        .context("failed to connect to the warehouse")?;
    let engine = ReflectionEngine::new(capabilities).with_options(options);
    let mut inspector = engine.inspector(conn);

    let request = report::ReportRequest {
        schema: args.schema.clone(),
        tables: args.tables.clone(),
        include_views: args.views,
    };
    report::build_report(&mut inspector, &request).context("reflection failed")
}

#[cfg(not(feature = "live-catalog"))]
fn reflect(_args: &Args, url: &str) -> Result<report::ReflectionReport> {
    redlens_cli::catalog::parse_url(url)?;
    Err(ConfigError::LiveCatalogDisabled.into())
}

fn write_output(args: &Args, content: &str) -> Result<()> {
    match &args.output {
        Some(path) => fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            if !content.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
            Ok(())
        }
    }
}
