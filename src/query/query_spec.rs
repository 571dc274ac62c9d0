use super::MalformedQuery;
use core::fmt::{Display, Formatter, Result as FmtResult};
use core::str::FromStr;
use std::collections::BTreeMap;

/// Wildcard accepted in the attribute and key segments.
const ALL: &str = "*";

/// Separates the metric name/labels prefix from the object pattern.
const PREFIX_SEPARATOR: &str = "==";

/// One requested metric query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    object_pattern: String,
    attribute: String,
    attribute_key: Option<String>,
    metric_name: Option<String>,
    metric_labels: Option<BTreeMap<String, String>>,
}

impl QuerySpec {
    /// Create a spec selecting every attribute of the objects matching `object_pattern`
    #[must_use]
    pub fn new(object_pattern: impl Into<String>) -> Self {
        Self {
            object_pattern: object_pattern.into(),
            attribute: ALL.to_owned(),
            attribute_key: None,
            metric_name: None,
            metric_labels: None,
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = attribute.into();
        self
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.attribute_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_metric_name(mut self, name: impl Into<String>) -> Self {
        self.metric_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_metric_labels<I, K, V>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.metric_labels = Some(labels.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Parse a single query token.
    ///
    /// The token has the form `[name][<label=value,...>]==]{object}[/{attribute}[/{key}]]`.
    /// A `/` inside a segment is written as `\/`.
    pub fn parse(token: &str) -> Result<Self, MalformedQuery> {
        let trimmed = token.trim();

        let (metric_name, metric_labels, body) = match trimmed.split_once(PREFIX_SEPARATOR) {
            Some((prefix, body)) => {
                let (name, labels) = parse_prefix(token, prefix)?;
                (name, labels, body)
            }
            None => (None, None, trimmed),
        };

        let mut segments = split_segments(body).into_iter();
        let object_pattern = segments.next().unwrap_or_default();
        if object_pattern.is_empty() {
            return Err(MalformedQuery::new(token, "object pattern is empty"));
        }

        let attribute = segments.next().filter(|s| !s.is_empty()).unwrap_or_else(|| ALL.to_owned());
        let attribute_key = segments.next().filter(|s| !s.is_empty() && s != ALL);

        Ok(Self {
            object_pattern,
            attribute,
            attribute_key,
            metric_name,
            metric_labels,
        })
    }

    #[must_use]
    pub fn object_pattern(&self) -> &str {
        &self.object_pattern
    }

    /// The attribute as written; `*` when every attribute is selected.
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// The attribute a reading must match, or `None` when every attribute is selected.
    #[must_use]
    pub fn attribute_filter(&self) -> Option<&str> {
        Some(self.attribute.as_str()).filter(|a| *a != ALL)
    }

    #[must_use]
    pub fn selects_attribute(&self, name: &str) -> bool {
        self.attribute_filter().is_none_or(|wanted| wanted == name)
    }

    /// The nested key to select, or `None` when every nested field is selected.
    #[must_use]
    pub fn attribute_key(&self) -> Option<&str> {
        self.attribute_key.as_deref().filter(|k| *k != ALL)
    }

    #[must_use]
    pub fn metric_name(&self) -> Option<&str> {
        self.metric_name.as_deref()
    }

    #[must_use]
    pub const fn metric_labels(&self) -> Option<&BTreeMap<String, String>> {
        self.metric_labels.as_ref()
    }
}

impl FromStr for QuerySpec {
    type Err = MalformedQuery;

    fn from_str(s: &str) -> Result<Self, MalformedQuery> {
        Self::parse(s)
    }
}

impl Display for QuerySpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.metric_name.is_some() || self.metric_labels.is_some() {
            write!(f, "{}", self.metric_name.as_deref().unwrap_or_default())?;
            if let Some(labels) = &self.metric_labels {
                let labels = labels.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(",");
                write!(f, "<{labels}>")?;
            }
            write!(f, "{PREFIX_SEPARATOR}")?;
        }

        write!(f, "{}", escape_segment(&self.object_pattern))?;

        let attribute = self.attribute.as_str();
        match self.attribute_key() {
            Some(key) => write!(f, "/{}/{}", escape_segment(attribute), escape_segment(key)),
            None if attribute != ALL => write!(f, "/{}", escape_segment(attribute)),
            None => Ok(()),
        }
    }
}

/// Parse a `;`-separated list of query tokens.
///
/// Empty tokens (for example a trailing `;`) are ignored, but the list as a whole must contain at
/// least one query.
pub fn parse_queries(input: &str) -> Result<Vec<QuerySpec>, MalformedQuery> {
    let specs = input
        .split(';')
        .filter(|token| !token.trim().is_empty())
        .map(QuerySpec::parse)
        .collect::<Result<Vec<_>, _>>()?;

    if specs.is_empty() {
        return Err(MalformedQuery::new(input, "no queries given"));
    }

    Ok(specs)
}

type Prefix = (Option<String>, Option<BTreeMap<String, String>>);

fn parse_prefix(token: &str, prefix: &str) -> Result<Prefix, MalformedQuery> {
    let prefix = prefix.trim();

    let (name, labels) = match prefix.split_once('<') {
        Some((name, rest)) => {
            let Some(inner) = rest.strip_suffix('>') else {
                return Err(MalformedQuery::new(token, "metric labels must be enclosed in '<' and '>'"));
            };
            (name, Some(parse_labels(token, inner)?))
        }
        None => (prefix, None),
    };

    let name = name.trim();
    Ok(((!name.is_empty()).then(|| name.to_owned()), labels))
}

fn parse_labels(token: &str, inner: &str) -> Result<BTreeMap<String, String>, MalformedQuery> {
    let mut labels = BTreeMap::new();

    for pair in inner.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(MalformedQuery::new(token, format!("label '{pair}' is missing '='")));
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(MalformedQuery::new(token, format!("label '{pair}' has an empty name")));
        }

        let _ = labels.insert(key.to_owned(), value.trim().to_owned());
    }

    Ok(labels)
}

/// Split on unescaped `/` into at most three segments; anything after the second separator is
/// part of the key.
fn split_segments(body: &str) -> Vec<String> {
    let mut segments = Vec::with_capacity(3);
    let mut current = String::new();
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'/') => {
                let _ = chars.next();
                current.push('/');
            }
            '/' if segments.len() < 2 => segments.push(core::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    segments.push(current);
    segments
}

fn escape_segment(segment: &str) -> String {
    segment.replace('/', "\\/")
}
