//! Usage and configuration errors.
//!
//! These map to the configuration exit code; anything else that fails while
//! reflecting is reported as a plain failure.

use redlens_core::ReflectionError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no connection URL given (use --url or set REDLENS_URL)")]
    MissingUrl,

    #[error("invalid connection URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported URL scheme '{0}' (expected redshift://, postgres:// or postgresql://)")]
    UnsupportedScheme(String),

    #[error("invalid value '{value}' for connection parameter '{name}'")]
    InvalidParameter { name: String, value: String },

    #[error(transparent)]
    Options(#[from] ReflectionError),

    #[error("this build has no live catalog support (enable the 'live-catalog' feature)")]
    LiveCatalogDisabled,
}
