//! Dialect options and per-driver capabilities.
//!
//! One reflection engine serves every driver. What differs between drivers is
//! captured in [`DriverCapabilities`]: how parameters are written, which
//! connection arguments are added, and how the client encoding is applied.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::ParameterStyle;
use crate::error::{ReflectionError, Result};
use crate::type_resolver::DEFAULT_MAX_DOMAIN_DEPTH;

/// Default `application_name` reported to the server.
pub const DEFAULT_APPLICATION_NAME: &str = "redlens";

/// User-facing engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DialectOptions {
    /// Overrides the driver's parameter style when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_style: Option<ParameterStyle>,
    /// Maximum number of nested domain aliases followed for one column.
    pub max_domain_depth: usize,
    pub application_name: String,
}

impl Default for DialectOptions {
    fn default() -> Self {
        Self {
            parameter_style: None,
            max_domain_depth: DEFAULT_MAX_DOMAIN_DEPTH,
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
        }
    }
}

/// Supported driver families.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum DriverKind {
    /// libpq-compatible PostgreSQL drivers.
    #[default]
    Libpq,
    /// The native Redshift connector.
    RedshiftConnector,
}

/// How a requested client encoding reaches the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEncoding {
    /// Passed through as the `client_encoding` connection argument.
    ConnectArgument,
    /// Removed from the arguments and set with a statement after connecting.
    SetAfterConnect,
}

impl ClientEncoding {
    /// Statement that applies `encoding` to an open session.
    pub fn set_statement(encoding: &str) -> String {
        format!("SET CLIENT_ENCODING TO '{}'", encoding.replace('\'', "''"))
    }

    /// Whether `encoding` names UTF-8 under any of the server's spellings.
    pub fn is_utf8(encoding: &str) -> bool {
        let normalized: String = encoding
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        matches!(normalized.as_str(), "utf8" | "unicode")
    }
}

/// A connection argument value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConnectValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl ConnectValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Final driver arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectArgs {
    pub params: IndexMap<String, ConnectValue>,
    /// Encoding to apply after connecting, when the driver cannot take it as
    /// an argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_encoding: Option<String>,
}

impl ConnectArgs {
    pub fn get(&self, name: &str) -> Option<&ConnectValue> {
        self.params.get(name)
    }
}

/// Builds driver arguments from URL-derived parameters.
///
/// Caller parameters override driver defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectArgsBuilder {
    Libpq { ssl_root_cert: Option<PathBuf> },
    RedshiftConnector,
}

impl ConnectArgsBuilder {
    pub fn build(
        &self,
        params: &IndexMap<String, String>,
        options: &DialectOptions,
    ) -> Result<ConnectArgs> {
        let mut args = ConnectArgs::default();
        args.params.insert(
            "sslmode".to_string(),
            ConnectValue::Text("verify-full".to_string()),
        );

        match self {
            Self::Libpq { ssl_root_cert } => {
                if let Some(path) = ssl_root_cert {
                    args.params.insert(
                        "sslrootcert".to_string(),
                        ConnectValue::Text(path.display().to_string()),
                    );
                }
                for (name, value) in params {
                    args.params
                        .insert(name.clone(), ConnectValue::Text(value.clone()));
                }
            }
            Self::RedshiftConnector => {
                args.params.insert("ssl".to_string(), ConnectValue::Bool(true));
                args.params.insert(
                    "application_name".to_string(),
                    ConnectValue::Text(options.application_name.clone()),
                );
                for (name, value) in params {
                    match name.as_str() {
                        "client_encoding" => args.client_encoding = Some(value.clone()),
                        "port" => {
                            let port = value.parse::<i64>().map_err(|_| {
                                ReflectionError::Configuration(format!(
                                    "port must be an integer, got '{value}'"
                                ))
                            })?;
                            args.params.insert("port".to_string(), ConnectValue::Int(port));
                        }
                        "username" => {
                            args.params
                                .insert("user".to_string(), ConnectValue::Text(value.clone()));
                        }
                        _ => {
                            args.params
                                .insert(name.clone(), ConnectValue::Text(value.clone()));
                        }
                    }
                }
            }
        }
        Ok(args)
    }
}

/// Everything that varies between driver families.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverCapabilities {
    pub kind: DriverKind,
    pub parameter_style: ParameterStyle,
    pub connect_args: ConnectArgsBuilder,
    pub client_encoding: ClientEncoding,
}

impl DriverCapabilities {
    pub fn libpq(ssl_root_cert: Option<PathBuf>) -> Self {
        Self {
            kind: DriverKind::Libpq,
            parameter_style: ParameterStyle::Numeric,
            connect_args: ConnectArgsBuilder::Libpq { ssl_root_cert },
            client_encoding: ClientEncoding::ConnectArgument,
        }
    }

    pub fn redshift_connector() -> Self {
        Self {
            kind: DriverKind::RedshiftConnector,
            parameter_style: ParameterStyle::Format,
            connect_args: ConnectArgsBuilder::RedshiftConnector,
            client_encoding: ClientEncoding::SetAfterConnect,
        }
    }

    pub fn for_kind(kind: DriverKind) -> Self {
        match kind {
            DriverKind::Libpq => Self::libpq(None),
            DriverKind::RedshiftConnector => Self::redshift_connector(),
        }
    }
}

impl Default for DriverCapabilities {
    fn default() -> Self {
        Self::libpq(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: DialectOptions =
            serde_json::from_str(r#"{"parameterStyle": "format"}"#).unwrap();
        assert_eq!(options.parameter_style, Some(ParameterStyle::Format));
        assert_eq!(options.max_domain_depth, 32);
        assert_eq!(options.application_name, "redlens");
    }

    #[test]
    fn test_libpq_args() {
        let builder = ConnectArgsBuilder::Libpq {
            ssl_root_cert: Some(PathBuf::from("/etc/redshift-ca-bundle.crt")),
        };
        let args = builder
            .build(&params(&[("sslmode", "require")]), &DialectOptions::default())
            .unwrap();
        assert_eq!(args.get("sslmode").and_then(ConnectValue::as_text), Some("require"));
        assert_eq!(
            args.get("sslrootcert").and_then(ConnectValue::as_text),
            Some("/etc/redshift-ca-bundle.crt")
        );
        assert!(args.client_encoding.is_none());
    }

    #[test]
    fn test_redshift_connector_args() {
        let args = DriverCapabilities::redshift_connector()
            .connect_args
            .build(
                &params(&[
                    ("port", "5439"),
                    ("username", "admin"),
                    ("client_encoding", "utf8"),
                ]),
                &DialectOptions::default(),
            )
            .unwrap();
        assert_eq!(args.get("port"), Some(&ConnectValue::Int(5439)));
        assert_eq!(args.get("user").and_then(ConnectValue::as_text), Some("admin"));
        assert!(args.get("username").is_none());
        assert!(args.get("client_encoding").is_none());
        assert_eq!(args.client_encoding.as_deref(), Some("utf8"));
        assert_eq!(args.get("ssl"), Some(&ConnectValue::Bool(true)));
        assert_eq!(
            args.get("application_name").and_then(ConnectValue::as_text),
            Some("redlens")
        );
    }

    #[test]
    fn test_redshift_connector_rejects_bad_port() {
        let err = ConnectArgsBuilder::RedshiftConnector
            .build(&params(&[("port", "abc")]), &DialectOptions::default())
            .unwrap_err();
        assert!(matches!(err, ReflectionError::Configuration(_)));
    }

    #[test]
    fn test_utf8_spellings() {
        assert!(ClientEncoding::is_utf8("utf8"));
        assert!(ClientEncoding::is_utf8("UTF-8"));
        assert!(ClientEncoding::is_utf8("Unicode"));
        assert!(!ClientEncoding::is_utf8("latin1"));
        assert!(!ClientEncoding::is_utf8("SQL_ASCII"));
    }

    #[test]
    fn test_set_statement_escapes_quotes() {
        assert_eq!(
            ClientEncoding::set_statement("x'y"),
            "SET CLIENT_ENCODING TO 'x''y'"
        );
    }
}
