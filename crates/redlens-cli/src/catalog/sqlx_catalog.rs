//! SQLx-based catalog connection over the PostgreSQL wire protocol.
//!
//! The reflection API is synchronous, so every query runs to completion on a
//! private tokio runtime.

use redlens_core::catalog::{default_schema, default_schema_query};
use redlens_core::{
    CatalogConnection, CatalogError, CatalogQuery, CatalogRow, CatalogValue, ClientEncoding,
    ConnectArgs, ConnectValue, DialectOptions, DriverCapabilities, ParameterStyle,
};
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow, PgSslMode};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::str::FromStr;
use tokio::runtime::Runtime;
use tracing::debug;

use super::parse_url;
use crate::error::ConfigError;

/// A catalog connection backed by a single-connection `PgPool`.
pub struct SqlxCatalog {
    runtime: Runtime,
    pool: PgPool,
}

impl SqlxCatalog {
    /// Connects to the warehouse at `url` using `capabilities`' conventions.
    ///
    /// URL query parameters pass through the driver's argument builder, so
    /// defaults such as `sslmode=verify-full` apply unless overridden.
    pub fn connect(
        url: &str,
        capabilities: &DriverCapabilities,
        options: &DialectOptions,
    ) -> anyhow::Result<Self> {
        let target = parse_url(url)?;
        let args = capabilities
            .connect_args
            .build(&target.params, options)
            .map_err(ConfigError::Options)?;
        let connect_options = PgConnectOptions::from_str(target.address.as_str())
            .map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;
        let connect_options = apply_args(connect_options, &args)?;

        let mut pool_options = PgPoolOptions::new().max_connections(1);
        let deferred_encoding = match capabilities.client_encoding {
            ClientEncoding::SetAfterConnect => args.client_encoding.as_deref(),
            // Carried in the connect arguments and checked by `apply_args`.
            ClientEncoding::ConnectArgument => None,
        };
        if let Some(encoding) = deferred_encoding {
            require_utf8(encoding)?;
            let statement = ClientEncoding::set_statement(encoding);
            pool_options = pool_options.after_connect(move |conn, _meta| {
                let statement = statement.clone();
                Box::pin(async move {
                    sqlx::query(&statement).execute(conn).await?;
                    Ok(())
                })
            });
        }

        let runtime = Runtime::new()?;
        let pool = runtime.block_on(pool_options.connect_with(connect_options))?;
        debug!(driver = ?capabilities.kind, "connected to warehouse");
        Ok(Self { runtime, pool })
    }

    async fn fetch(&self, query: &CatalogQuery) -> Result<Vec<PgRow>, sqlx::Error> {
        let mut statement = sqlx::query(&query.sql);
        for param in &query.params {
            statement = statement.bind(param.as_str());
        }
        statement.fetch_all(&self.pool).await
    }
}

impl CatalogConnection for SqlxCatalog {
    fn execute(&self, query: &CatalogQuery) -> Result<Vec<CatalogRow>, CatalogError> {
        let rows = self
            .runtime
            .block_on(self.fetch(query))
            .map_err(|e| CatalogError::new(e.to_string()).with_query(query.kind))?;
        rows.iter()
            .map(|row| {
                decode_row(row).map_err(|e| CatalogError::new(e.to_string()).with_query(query.kind))
            })
            .collect()
    }

    fn default_schema_name(&self) -> Result<Option<String>, CatalogError> {
        let rows = self.execute(&default_schema_query(ParameterStyle::Numeric))?;
        default_schema(&rows)
    }
}

/// Applies driver arguments to the connect options.
///
/// Parameters without a dedicated setting are sent as server runtime
/// parameters.
fn apply_args(mut options: PgConnectOptions, args: &ConnectArgs) -> Result<PgConnectOptions, ConfigError> {
    for (name, value) in &args.params {
        let text = match value {
            ConnectValue::Text(text) => text.clone(),
            ConnectValue::Int(number) => number.to_string(),
            ConnectValue::Bool(flag) => flag.to_string(),
        };
        let invalid = || ConfigError::InvalidParameter {
            name: name.clone(),
            value: text.clone(),
        };
        options = match name.as_str() {
            "sslmode" => options.ssl_mode(PgSslMode::from_str(&text).map_err(|_| invalid())?),
            "sslrootcert" => options.ssl_root_cert(&text),
            "application_name" => options.application_name(&text),
            "port" => options.port(text.parse().map_err(|_| invalid())?),
            "user" | "username" => options.username(&text),
            "password" => options.password(&text),
            "dbname" | "database" => options.database(&text),
            "client_encoding" => {
                require_utf8(&text)?;
                options.options([(name.as_str(), text.as_str())])
            }
            // TLS is governed by sslmode on this transport.
            "ssl" => options,
            _ => options.options([(name.as_str(), text.as_str())]),
        };
    }
    Ok(options)
}

/// Rows are decoded as UTF-8, so any other session encoding is refused.
fn require_utf8(encoding: &str) -> Result<(), ConfigError> {
    if ClientEncoding::is_utf8(encoding) {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name: "client_encoding".to_string(),
            value: encoding.to_string(),
        })
    }
}

/// Converts one result row, dispatching on the server-reported type name.
fn decode_row(row: &PgRow) -> Result<CatalogRow, sqlx::Error> {
    let mut decoded = CatalogRow::new();
    for column in row.columns() {
        let index = column.ordinal();
        let value = if row.try_get_raw(index)?.is_null() {
            CatalogValue::Null
        } else {
            match column.type_info().name() {
                "BOOL" => CatalogValue::Bool(row.try_get(index)?),
                "INT2" => CatalogValue::Int(i64::from(row.try_get::<i16, _>(index)?)),
                "INT4" => CatalogValue::Int(i64::from(row.try_get::<i32, _>(index)?)),
                "INT8" => CatalogValue::Int(row.try_get(index)?),
                "OID" => CatalogValue::Int(i64::from(row.try_get::<Oid, _>(index)?.0)),
                // The single-byte `"char"` type, as in pg_class.relkind.
                "\"CHAR\"" => {
                    let code = row.try_get::<i8, _>(index)?;
                    CatalogValue::Text(char::from(code as u8).to_string())
                }
                "INT2[]" => CatalogValue::IntArray(
                    row.try_get::<Vec<i16>, _>(index)?
                        .into_iter()
                        .map(i64::from)
                        .collect(),
                ),
                "INT4[]" => CatalogValue::IntArray(
                    row.try_get::<Vec<i32>, _>(index)?
                        .into_iter()
                        .map(i64::from)
                        .collect(),
                ),
                _ => CatalogValue::Text(row.try_get(index)?),
            }
        };
        decoded.insert(column.name(), value);
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn args(pairs: &[(&str, ConnectValue)]) -> ConnectArgs {
        ConnectArgs {
            params: pairs
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect::<IndexMap<_, _>>(),
            client_encoding: None,
        }
    }

    #[test]
    fn test_apply_args_sets_known_options() {
        let base = PgConnectOptions::new().host("localhost");
        let options = apply_args(
            base,
            &args(&[
                ("sslmode", ConnectValue::Text("require".to_string())),
                ("port", ConnectValue::Int(5439)),
                ("user", ConnectValue::Text("admin".to_string())),
                ("application_name", ConnectValue::Text("redlens".to_string())),
                ("ssl", ConnectValue::Bool(true)),
            ]),
        )
        .unwrap();
        assert_eq!(options.get_port(), 5439);
        assert_eq!(options.get_username(), "admin");
        assert_eq!(options.get_application_name(), Some("redlens"));
    }

    #[test]
    fn test_apply_args_accepts_utf8_client_encoding() {
        let result = apply_args(
            PgConnectOptions::new(),
            &args(&[("client_encoding", ConnectValue::Text("UTF8".to_string()))]),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_apply_args_rejects_other_client_encodings() {
        let err = apply_args(
            PgConnectOptions::new(),
            &args(&[("client_encoding", ConnectValue::Text("latin1".to_string()))]),
        )
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidParameter { ref name, ref value } if name == "client_encoding" && value == "latin1")
        );
    }

    #[test]
    fn test_deferred_encoding_must_be_utf8() {
        assert!(require_utf8("utf-8").is_ok());
        assert!(matches!(
            require_utf8("win1252"),
            Err(ConfigError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_apply_args_rejects_bad_sslmode() {
        let err = apply_args(
            PgConnectOptions::new(),
            &args(&[("sslmode", ConnectValue::Text("sometimes".to_string()))]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { ref name, .. } if name == "sslmode"));
    }
}
