use core::fmt::{Display, Formatter, Result as FmtResult};
use serde_json::{Number, Value as Json};
use std::collections::BTreeMap;

/// Declared type of composite attribute values.
pub const COMPOSITE_TYPE: &str = "javax.management.openmbean.CompositeData";

/// Declared type of tabular attribute values.
pub const TABULAR_TYPE: &str = "javax.management.openmbean.TabularData";

/// A primitive attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Number(Number),
    Text(String),
}

impl Scalar {
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Self::Bool(b) => Json::Bool(*b),
            Self::Number(n) => Json::Number(n.clone()),
            Self::Text(s) => Json::String(s.clone()),
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// A snapshot of one attribute value as fetched from the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The registry returned no value.
    Null,

    /// A primitive value.
    Scalar(Scalar),

    /// A record of named fields, each holding its own value.
    Composite(BTreeMap<String, Self>),

    /// A table of composite rows, kept in its raw form.
    Tabular(Json),

    /// An array value, kept in its raw form.
    Sequence(Json),
}

impl Value {
    /// Interpret a JSON rendering of an attribute value.
    ///
    /// The declared type decides whether a JSON object is a table; every other JSON object is
    /// treated as a composite record.
    #[must_use]
    pub fn from_json(declared_type: Option<&str>, json: Json) -> Self {
        if !json.is_null() && declared_type.is_some_and(is_tabular_type) {
            return Self::Tabular(json);
        }

        Self::from_untyped_json(json)
    }

    fn from_untyped_json(json: Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Json::Number(n) => Self::Scalar(Scalar::Number(n)),
            Json::String(s) => Self::Scalar(Scalar::Text(s)),
            array @ Json::Array(_) => Self::Sequence(array),
            Json::Object(fields) => Self::Composite(fields.into_iter().map(|(k, v)| (k, Self::from_untyped_json(v))).collect()),
        }
    }

    /// Build a composite record from named fields.
    #[must_use]
    pub fn composite<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Self)>,
        K: Into<String>,
    {
        Self::Composite(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Scalar(Scalar::Bool(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Scalar(Scalar::Number(value.into()))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Scalar(Scalar::Number(value.into()))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, |n| Self::Scalar(Scalar::Number(n)))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Scalar(Scalar::Text(value.to_owned()))
    }
}

fn is_tabular_type(declared_type: &str) -> bool {
    declared_type.contains("TabularData")
}
