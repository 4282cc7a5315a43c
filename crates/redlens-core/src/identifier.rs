//! Relation identifiers and identifier quoting rules.
//!
//! [`RelationKey`] is the lookup key for every per-schema bulk result. The
//! catalog sometimes stores a name without the quoting that DDL requires (a
//! table called `Group` is reported as `Group`, while callers pass
//! `"Group"`), so lookups retry with [`RelationKey::unquoted`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use crate::error::{ReflectionError, Result};

/// Name and schema of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelationKey {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

impl RelationKey {
    /// Builds a key from catalog-reported parts.
    pub fn new(name: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: Some(schema.into()),
        }
    }

    /// Builds a key with an explicit schema, falling back to `default_schema`.
    ///
    /// Fails with [`ReflectionError::Configuration`] when neither yields a
    /// schema, so a key is never ambiguous.
    pub fn resolve<F>(name: &str, schema: Option<&str>, default_schema: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Option<String>>,
    {
        let schema = match schema {
            Some(schema) if !schema.is_empty() => schema.to_string(),
            _ => default_schema()?.ok_or_else(|| {
                ReflectionError::Configuration(format!(
                    "relation '{name}' has no schema and the connection reports no default schema"
                ))
            })?,
        };
        Ok(Self::new(name, schema))
    }

    /// Returns the key with one level of double quotes removed from each part.
    pub fn unquoted(&self) -> Self {
        Self {
            name: unquote(&self.name).to_string(),
            schema: self.schema.as_deref().map(|s| unquote(s).to_string()),
        }
    }
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", unquote(schema), unquote(&self.name)),
            None => write!(f, "{}", unquote(&self.name)),
        }
    }
}

/// A cross-database schema reference of the form `database.schema`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatashareRef {
    pub datashare: String,
    pub schema: String,
}

impl DatashareRef {
    /// Splits a caller-supplied schema on its first unquoted `.`.
    ///
    /// Schemas containing a double quote are never datashare references.
    pub fn parse(schema: &str) -> Option<Self> {
        if schema.contains('"') {
            return None;
        }
        let (datashare, rest) = schema.split_once('.')?;
        let schema = rest.split('.').next().unwrap_or(rest);
        Some(Self {
            datashare: datashare.to_string(),
            schema: schema.to_string(),
        })
    }
}

/// Strips exactly one surrounding pair of double quotes, if present.
pub fn unquote(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Like [`unquote`], passing `None` through.
pub fn unquote_opt(text: Option<&str>) -> Option<String> {
    text.map(|t| unquote(t).to_string())
}

/// Quotes `name` when the warehouse would not accept it bare.
///
/// Reserved words, names that are not plain lowercase identifiers and names
/// containing quotes are wrapped in double quotes, with embedded quotes
/// doubled.
pub fn quote_identifier(name: &str) -> String {
    if requires_quotes(name) {
        format!("\"{}\"", name.replace('"', "\"\""))
    } else {
        name.to_string()
    }
}

fn requires_quotes(name: &str) -> bool {
    let mut chars = name.chars();
    let legal_start = matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_lowercase());
    let legal_rest = chars.all(|c| c == '_' || c == '$' || c.is_ascii_lowercase() || c.is_ascii_digit());
    !(legal_start && legal_rest) || is_reserved_word(name)
}

/// Returns true if `word` is reserved by the warehouse SQL grammar.
pub fn is_reserved_word(word: &str) -> bool {
    reserved_words().contains(word.to_ascii_lowercase().as_str())
}

fn reserved_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| RESERVED_WORDS.iter().copied().collect())
}

const RESERVED_WORDS: &[&str] = &[
    "aes128", "aes256", "all", "allowoverwrite", "analyse", "analyze", "and", "any", "array",
    "as", "asc", "authorization", "az64", "backup", "between", "binary", "blanksasnull", "both",
    "bytedict", "bzip2", "case", "cast", "check", "collate", "column", "constraint", "create",
    "credentials", "cross", "current_date", "current_time", "current_timestamp", "current_user",
    "current_user_id", "default", "deferrable", "deflate", "defrag", "delta", "delta32k", "desc",
    "disable", "distinct", "do", "else", "emptyasnull", "enable", "encode", "encrypt",
    "encryption", "end", "except", "explicit", "false", "for", "foreign", "freeze", "from",
    "full", "globaldict256", "globaldict64k", "grant", "group", "gzip", "having", "identity",
    "ignore", "ilike", "in", "initially", "inner", "intersect", "into", "is", "isnull", "join",
    "language", "leading", "left", "like", "limit", "localtime", "localtimestamp", "lun", "luns",
    "lzo", "lzop", "minus", "mostly16", "mostly32", "mostly8", "natural", "new", "not",
    "notnull", "null", "nulls", "off", "offline", "offset", "oid", "old", "on", "only", "open",
    "or", "order", "outer", "overlaps", "parallel", "partition", "percent", "permissions",
    "pivot", "placing", "primary", "raw", "readratio", "recover", "references", "respect",
    "rejectlog", "resort", "restore", "right", "select", "session_user", "similar", "snapshot",
    "some", "sysdate", "system", "table", "tag", "tdes", "text255", "text32k", "then",
    "timestamp", "to", "top", "trailing", "true", "truncatecolumns", "union", "unique",
    "unnest", "unpivot", "user", "using", "verbose", "wallet", "when", "where", "with",
    "without",
];

/// Splits a possibly schema-qualified type name into unquoted parts.
///
/// `"My Schema".my_domain` becomes `["My Schema", "my_domain"]`. Dots inside
/// quotes do not split, and a doubled quote inside quotes is a literal quote.
pub fn split_quoted_tokens(name: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = name.chars().peekable();
    let mut in_quotes = false;

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
            continue;
        }

        match ch {
            '"' => in_quotes = true,
            '.' => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    parts.push(current);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_default() -> Result<Option<String>> {
        Ok(None)
    }

    #[test]
    fn test_resolve_uses_explicit_schema() {
        let key = RelationKey::resolve("t", Some("s"), no_default).unwrap();
        assert_eq!(key, RelationKey::new("t", "s"));
    }

    #[test]
    fn test_resolve_falls_back_to_default_schema() {
        let key = RelationKey::resolve("t", None, || Ok(Some("public".to_string()))).unwrap();
        assert_eq!(key.schema.as_deref(), Some("public"));
    }

    #[test]
    fn test_resolve_without_any_schema_fails() {
        let err = RelationKey::resolve("t", None, no_default).unwrap_err();
        assert!(matches!(err, ReflectionError::Configuration(_)));
    }

    #[test]
    fn test_unquote_strips_one_level() {
        assert_eq!(unquote("\"Group\""), "Group");
        assert_eq!(unquote("\"\"x\"\""), "\"x\"");
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote("\"half"), "\"half");
        assert_eq!(unquote("\""), "\"");
    }

    #[test]
    fn test_unquoted_key_handles_parts_independently() {
        let key = RelationKey::new("\"Group\"", "public");
        assert_eq!(key.unquoted(), RelationKey::new("Group", "public"));
    }

    #[test]
    fn test_display_strips_quotes() {
        assert_eq!(
            RelationKey::new("\"Group\"", "\"Sales\"").to_string(),
            "Sales.Group"
        );
        let bare = RelationKey {
            name: "t".to_string(),
            schema: None,
        };
        assert_eq!(bare.to_string(), "t");
    }

    #[test]
    fn test_datashare_parse() {
        assert_eq!(
            DatashareRef::parse("share_db.sales"),
            Some(DatashareRef {
                datashare: "share_db".to_string(),
                schema: "sales".to_string(),
            })
        );
        assert_eq!(DatashareRef::parse("sales"), None);
        assert_eq!(DatashareRef::parse("\"odd.schema\""), None);
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("orders"), "orders");
        assert_eq!(quote_identifier("group"), "\"group\"");
        assert_eq!(quote_identifier("Group"), "\"Group\"");
        assert_eq!(quote_identifier("my table"), "\"my table\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_reserved_words_are_case_insensitive() {
        assert!(is_reserved_word("SELECT"));
        assert!(is_reserved_word("az64"));
        assert!(!is_reserved_word("orders"));
    }

    #[test]
    fn test_split_quoted_tokens() {
        assert_eq!(split_quoted_tokens("my_domain"), vec!["my_domain"]);
        assert_eq!(
            split_quoted_tokens("\"My Schema\".\"Dom.ain\""),
            vec!["My Schema", "Dom.ain"]
        );
        assert_eq!(split_quoted_tokens("\"a\"\"b\""), vec!["a\"b"]);
    }
}
