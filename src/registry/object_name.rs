//! Object names and object name patterns.
//!
//! An object name has the form `domain:key=value[,key=value...]`. Values may be quoted
//! (`key="a,b"`), in which case `\"`, `\\`, `\*`, `\?` and `\n` are escapes. A name becomes a
//! pattern when the domain contains `*` or `?`, when a value contains an unescaped `*` or `?`,
//! or when the key list contains the `*` property-list wildcard.

use core::fmt::{Display, Formatter, Result as FmtResult};
use core::str::FromStr;
use regex::Regex;
use std::collections::BTreeMap;
use thiserror::Error;

/// Characters a key may never contain.
const ILLEGAL_KEY_CHARS: &[char] = &[':', ',', '=', '*', '?', '"', '\n'];

/// Characters an unquoted value may never contain.
const ILLEGAL_VALUE_CHARS: &[char] = &[':', ',', '=', '"', '\n'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ObjectNameError {
    reason: String,
}

impl ObjectNameError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectName {
    domain: String,
    properties: BTreeMap<String, String>,
    property_list_pattern: bool,
}

impl ObjectName {
    pub fn parse(name: &str) -> Result<Self, ObjectNameError> {
        let Some((domain, key_list)) = name.split_once(':') else {
            return Err(ObjectNameError::new("missing ':' between domain and key properties"));
        };

        if domain.contains('\n') {
            return Err(ObjectNameError::new("domain contains a newline"));
        }

        let mut properties = BTreeMap::new();
        let mut property_list_pattern = false;

        for entry in split_key_list(key_list)? {
            if entry == "*" {
                if property_list_pattern {
                    return Err(ObjectNameError::new("property list wildcard '*' appears more than once"));
                }
                property_list_pattern = true;
                continue;
            }

            if entry.is_empty() {
                return Err(ObjectNameError::new("empty key property"));
            }

            let Some((key, value)) = entry.split_once('=') else {
                return Err(ObjectNameError::new(format!("key property '{entry}' is missing '='")));
            };

            validate_key(key)?;
            validate_value(key, value)?;

            if properties.insert(key.to_owned(), value.to_owned()).is_some() {
                return Err(ObjectNameError::new(format!("key '{key}' appears more than once")));
            }
        }

        if properties.is_empty() && !property_list_pattern {
            return Err(ObjectNameError::new("key properties cannot be empty"));
        }

        Ok(Self {
            domain: domain.to_owned(),
            properties,
            property_list_pattern,
        })
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The value of a key property exactly as written (quoted values keep their quotes).
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_domain_pattern(&self) -> bool {
        has_wildcard(&self.domain)
    }

    #[must_use]
    pub const fn is_property_list_pattern(&self) -> bool {
        self.property_list_pattern
    }

    #[must_use]
    pub fn is_property_value_pattern(&self) -> bool {
        self.properties.values().any(|v| has_wildcard(v))
    }

    #[must_use]
    pub fn is_pattern(&self) -> bool {
        self.is_domain_pattern() || self.is_property_list_pattern() || self.is_property_value_pattern()
    }

    /// Returns the same name with the domain replaced, used to resolve the empty (default) domain.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Check whether `name` is selected by this name when treated as a pattern.
    ///
    /// A name that is not a pattern only matches an identical name. Use [`Self::matcher`] when
    /// testing many names against the same pattern.
    #[must_use]
    pub fn matches(&self, name: &Self) -> bool {
        self.matcher().matches(name)
    }

    /// Compile this name's wildcards once for matching many names.
    #[must_use]
    pub fn matcher(&self) -> NameMatcher<'_> {
        NameMatcher {
            pattern: self,
            domain: Glob::new(&self.domain),
            values: self.properties.iter().map(|(k, v)| (k.as_str(), Glob::new(v))).collect(),
        }
    }

    /// The canonical form: domain followed by the key properties sorted by key.
    #[must_use]
    pub fn canonical_name(&self) -> String {
        let mut name = format!("{}:", self.domain);
        name.push_str(&self.properties.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(","));

        if self.property_list_pattern {
            if !self.properties.is_empty() {
                name.push(',');
            }
            name.push('*');
        }

        name
    }
}

impl FromStr for ObjectName {
    type Err = ObjectNameError;

    fn from_str(s: &str) -> Result<Self, ObjectNameError> {
        Self::parse(s)
    }
}

impl Display for ObjectName {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.canonical_name())
    }
}

/// Strip the quotes from a quoted property value and resolve its escapes.
///
/// Unquoted values are returned unchanged.
#[must_use]
pub fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
        return value.to_owned();
    };

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some(escaped) => result.push(escaped),
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Split the key list on commas that are not inside a quoted value.
fn split_key_list(key_list: &str) -> Result<Vec<&str>, ObjectNameError> {
    if key_list.is_empty() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (index, c) in key_list.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }

        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                entries.push(&key_list[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }

    if in_quotes {
        return Err(ObjectNameError::new("unterminated quoted value"));
    }

    entries.push(&key_list[start..]);
    Ok(entries)
}

fn validate_key(key: &str) -> Result<(), ObjectNameError> {
    if key.is_empty() {
        return Err(ObjectNameError::new("key property has an empty key"));
    }

    if key.contains(ILLEGAL_KEY_CHARS) {
        return Err(ObjectNameError::new(format!("key '{key}' contains an illegal character")));
    }

    Ok(())
}

fn validate_value(key: &str, value: &str) -> Result<(), ObjectNameError> {
    if value.is_empty() {
        return Err(ObjectNameError::new(format!("key '{key}' has an empty value")));
    }

    if let Some(rest) = value.strip_prefix('"') {
        let mut chars = rest.chars();
        let mut closed = false;

        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('"' | '\\' | '*' | '?' | 'n') => {}
                    _ => return Err(ObjectNameError::new(format!("value of key '{key}' contains an invalid escape"))),
                },
                '"' => {
                    closed = true;
                    break;
                }
                '\n' => return Err(ObjectNameError::new(format!("value of key '{key}' contains a newline"))),
                _ => {}
            }
        }

        if !closed || chars.next().is_some() {
            return Err(ObjectNameError::new(format!("value of key '{key}' is not properly quoted")));
        }

        return Ok(());
    }

    if value.contains(ILLEGAL_VALUE_CHARS) {
        return Err(ObjectNameError::new(format!("value of key '{key}' contains an illegal character")));
    }

    Ok(())
}

/// Whether the text contains an unescaped `*` or `?`.
fn has_wildcard(text: &str) -> bool {
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let _ = chars.next();
            }
            '*' | '?' => return true,
            _ => {}
        }
    }
    false
}

/// An object name pattern with its wildcards compiled.
#[derive(Debug)]
pub struct NameMatcher<'a> {
    pattern: &'a ObjectName,
    domain: Glob<'a>,
    values: Vec<(&'a str, Glob<'a>)>,
}

impl NameMatcher<'_> {
    #[must_use]
    pub fn matches(&self, name: &ObjectName) -> bool {
        if !self.domain.matches(&name.domain) {
            return false;
        }

        let values_match = self
            .values
            .iter()
            .all(|(key, glob)| name.properties.get(*key).is_some_and(|candidate| glob.matches(candidate)));

        values_match && (self.pattern.property_list_pattern || self.pattern.properties.len() == name.properties.len())
    }
}

/// A glob where `*` is any run of characters and `?` is any single character.
/// Backslash escapes are compared literally.
#[derive(Debug)]
enum Glob<'a> {
    Literal(&'a str),
    Wildcard(Regex),
    Never,
}

impl<'a> Glob<'a> {
    fn new(pattern: &'a str) -> Self {
        if !has_wildcard(pattern) {
            return Self::Literal(pattern);
        }

        let mut expr = String::from("^");
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                '\\' => {
                    expr.push_str(r"\\");
                    if let Some(next) = chars.next() {
                        expr.push_str(&regex::escape(next.encode_utf8(&mut [0; 4])));
                    }
                }
                _ => expr.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
        expr.push('$');

        Regex::new(&expr).map_or(Self::Never, Self::Wildcard)
    }

    fn matches(&self, text: &str) -> bool {
        match self {
            Self::Literal(literal) => *literal == text,
            Self::Wildcard(re) => re.is_match(text),
            Self::Never => false,
        }
    }
}
