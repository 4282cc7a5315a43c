//! Grammars for the textual encodings the warehouse catalog emits.
//!
//! Constraint definitions (`pg_get_constraintdef`), identity column defaults
//! and sequence defaults only come back as text, so structure is recovered
//! with regular expressions. Each grammar is a best-effort match against one
//! fixed shape and reports a [`ParseError`] when the text does not fit; the
//! caller decides whether that is fatal.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{ParseError, ParseErrorKind};
use crate::types::IdentitySpec;

/// A bare SQL identifier or a double-quote delimited one.
const IDENTIFIER: &str = r#"[_a-zA-Z][\w$]*|(?:"[^"]+")+"#;

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(IDENTIFIER).expect("Invalid regex pattern"))
}

fn identity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // e.g. "identity"(445178, 0, '1,1'::text)
    RE.get_or_init(|| {
        Regex::new(
            r#"(?x)
            ^"identity" \(
              (?P<current>-?\d+)
              ,\s
              (?P<base>-?\d+)
              ,\s
              '(?P<seed>-?\d+),(?P<step>-?\d+)'
              .*
            \)"#,
        )
        .expect("Invalid regex pattern")
    })
}

fn primary_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?x)
            ^PRIMARY \s* KEY \s* \(
              (?P<columns>
                (?: \s* (?: [_a-zA-Z][\w$]* | (?:"[^"]*")+ ) \s* ,? )+
              )
            \s* \) \s*"#,
        )
        .expect("Invalid regex pattern")
    })
}

fn foreign_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?x)
            ^FOREIGN\ KEY \s* \(
              (?P<columns>
                (?: \s* (?: [_a-zA-Z][\w$]* | (?:"[^"]+")+ ) \s* ,? )+
              )
            \s* \)
            \s* REFERENCES \s*
            (?: (?P<referred_schema> [_a-zA-Z][\w$]* | (?:"[^"]*")+ ) \. )?
            (?P<referred_table> [_a-zA-Z][\w$]* | (?:"[^"]*")+ )
            \s* \(
              (?P<referred_columns>
                (?: \s* (?: [_a-zA-Z][\w$]* | (?:"[^"]+")+ ) \s* ,? )+
              )
            \s* \)"#,
        )
        .expect("Invalid regex pattern")
    })
}

fn check_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^CHECK *\((?P<body>.+)\)(?P<not_valid> NOT VALID)?$")
            .expect("Invalid regex pattern")
    })
}

fn sequence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)(?P<head>nextval\(')(?P<name>[^']+)(?P<tail>'.*$)")
            .expect("Invalid regex pattern")
    })
}

/// Parsed `FOREIGN KEY ... REFERENCES ...` definition.
///
/// Identifiers keep their quotes; callers unquote what they need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDef {
    pub columns: Vec<String>,
    pub referred_schema: Option<String>,
    pub referred_table: String,
    pub referred_columns: Vec<String>,
}

/// Parsed `CHECK (...)` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckDef {
    pub sqltext: String,
    pub not_valid: bool,
}

/// A `nextval('<name>'...)` default split around the sequence name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceDefault<'a> {
    head: &'a str,
    pub name: &'a str,
    tail: &'a str,
}

impl SequenceDefault<'_> {
    /// Whether the sequence name carries a schema.
    pub fn is_qualified(&self) -> bool {
        self.name.contains('.')
    }

    /// Rewrites the default with the sequence qualified by `schema`.
    pub fn qualified_with(&self, schema: &str) -> String {
        format!("{}\"{}\".{}{}", self.head, schema, self.name, self.tail)
    }
}

/// Extracts every identifier from a comma-separated column list.
pub fn identifier_list(text: &str) -> Vec<String> {
    identifier_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Parses an identity column default into its seed and step.
pub fn parse_identity(default: &str) -> Result<IdentitySpec, ParseError> {
    let caps = identity_regex()
        .captures(default)
        .ok_or_else(|| ParseError::new(ParseErrorKind::Identity, default))?;
    let number = |group: &str| -> Result<i64, ParseError> {
        caps[group].parse().map_err(|_| {
            ParseError::new(ParseErrorKind::Identity, default)
                .with_message(format!("{group} is out of range"))
        })
    };
    Ok(IdentitySpec {
        seed: number("seed")?,
        step: number("step")?,
    })
}

/// Parses `PRIMARY KEY (a, b)` into its ordered column list.
pub fn parse_primary_key(condef: &str) -> Result<Vec<String>, ParseError> {
    let caps = primary_key_regex()
        .captures(condef)
        .ok_or_else(|| ParseError::new(ParseErrorKind::PrimaryKey, condef))?;
    Ok(identifier_list(&caps["columns"]))
}

/// Parses `FOREIGN KEY (a) REFERENCES [schema.]table (b)`.
pub fn parse_foreign_key(condef: &str) -> Result<ForeignKeyDef, ParseError> {
    let caps = foreign_key_regex()
        .captures(condef)
        .ok_or_else(|| ParseError::new(ParseErrorKind::ForeignKey, condef))?;
    Ok(ForeignKeyDef {
        columns: identifier_list(&caps["columns"]),
        referred_schema: caps.name("referred_schema").map(|m| m.as_str().to_string()),
        referred_table: caps["referred_table"].to_string(),
        referred_columns: identifier_list(&caps["referred_columns"]),
    })
}

/// Parses `CHECK (<body>) [NOT VALID]`.
///
/// One redundant pair of parentheses wrapping the whole body is removed, so
/// `CHECK (((a > 1) AND (a < 5)))` yields `(a > 1) AND (a < 5)`.
pub fn parse_check(src: &str) -> Result<CheckDef, ParseError> {
    let caps = check_regex()
        .captures(src)
        .ok_or_else(|| ParseError::new(ParseErrorKind::Check, src))?;
    Ok(CheckDef {
        sqltext: strip_outer_parens(&caps["body"]).to_string(),
        not_valid: caps.name("not_valid").is_some(),
    })
}

/// Matches a sequence-backed default such as `nextval('seq'::regclass)`.
pub fn sequence_default(default: &str) -> Option<SequenceDefault<'_>> {
    let caps = sequence_regex().captures(default)?;
    Some(SequenceDefault {
        head: caps.name("head")?.as_str(),
        name: caps.name("name")?.as_str(),
        tail: caps.name("tail")?.as_str(),
    })
}

/// Removes one pair of parentheses when the opening one closes at the end.
fn strip_outer_parens(body: &str) -> &str {
    let trimmed = body.trim();
    if !(trimmed.starts_with('(') && trimmed.ends_with(')')) {
        return body;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    for (idx, ch) in trimmed.char_indices() {
        match ch {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return if idx == trimmed.len() - 1 {
                        &trimmed[1..idx]
                    } else {
                        body
                    };
                }
            }
            _ => {}
        }
    }
    body
}
