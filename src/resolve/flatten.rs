use super::{Reading, ReadingOrigin, ReadingValue};
use crate::registry::Value;

/// Flatten one fetched attribute value into leaf readings.
///
/// A composite value is expanded field by field, each leaf keyed by the dotted path of field
/// names leading to it. When `requested_key` is set on a composite value only that field is
/// expanded, with paths starting at the requested key; a missing field yields no readings.
/// A key on any other value is ignored. Tables and arrays are reported raw as a single opaque
/// reading.
#[must_use]
pub fn flatten(origin: &ReadingOrigin<'_>, requested_key: Option<&str>, value: &Value) -> Vec<Reading> {
    match (requested_key, value) {
        (Some(key), Value::Composite(fields)) => fields
            .get(key)
            .map_or_else(Vec::new, |field| expand(origin, Some(key.to_owned()), field)),

        // keys only address composite fields
        _ => expand(origin, None, value),
    }
}

fn expand(origin: &ReadingOrigin<'_>, path: Option<String>, value: &Value) -> Vec<Reading> {
    match value {
        Value::Null => vec![origin.reading(path, ReadingValue::Unavailable)],
        Value::Scalar(scalar) => vec![origin.reading(path, ReadingValue::Scalar(scalar.clone()))],
        Value::Tabular(raw) | Value::Sequence(raw) => vec![origin.reading(path, ReadingValue::Opaque(raw.clone()))],
        Value::Composite(fields) => fields
            .iter()
            .flat_map(|(name, field)| expand(origin, Some(child_path(path.as_deref(), name)), field))
            .collect(),
    }
}

fn child_path(parent: Option<&str>, name: &str) -> String {
    match parent {
        Some(parent) => format!("{parent}.{name}"),
        None => name.to_owned(),
    }
}
