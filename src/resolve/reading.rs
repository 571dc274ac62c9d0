use super::tokens::replace_tokens;
use crate::query::QuerySpec;
use crate::registry::{ObjectHandle, Scalar};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use strum::Display;

/// The value carried by a reading.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingValue {
    /// A primitive leaf value.
    Scalar(Scalar),

    /// The value could not be fetched, or the registry returned nothing.
    Unavailable,

    /// A value that is reported raw and never flattened, such as a table.
    Opaque(Json),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    Scalar,
    Unavailable,
    Opaque,
}

impl ReadingValue {
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Scalar(_) => ValueKind::Scalar,
            Self::Unavailable => ValueKind::Unavailable,
            Self::Opaque(_) => ValueKind::Opaque,
        }
    }

    /// The value as JSON; `null` when unavailable.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Self::Scalar(scalar) => scalar.to_json(),
            Self::Unavailable => Json::Null,
            Self::Opaque(raw) => raw.clone(),
        }
    }
}

/// One resolved, flattened metric instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub object_identity: ObjectHandle,
    pub attribute: String,
    pub attribute_type: Option<String>,
    pub key: Option<String>,
    pub value: ReadingValue,
    pub metric_name: Option<String>,
    pub metric_labels: Option<BTreeMap<String, String>>,
}

impl Reading {
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        self.value.kind()
    }

    /// Substitute `{token}` placeholders in the metric name and label values with the values of
    /// this reading.
    #[must_use]
    pub fn with_tokens_replaced(mut self) -> Self {
        if let Some(name) = &self.metric_name {
            self.metric_name = Some(replace_tokens(name, &self));
        }

        if let Some(labels) = &self.metric_labels {
            let replaced = labels.iter().map(|(k, v)| (k.clone(), replace_tokens(v, &self))).collect();
            self.metric_labels = Some(replaced);
        }

        self
    }
}

/// Where readings come from: the spec being resolved, the concrete object, and the attribute.
///
/// Every reading produced from one origin carries the same identity and metric metadata.
#[derive(Debug, Clone, Copy)]
pub struct ReadingOrigin<'a> {
    pub spec: &'a QuerySpec,
    pub object: &'a ObjectHandle,
    pub attribute: &'a str,
    pub attribute_type: Option<&'a str>,
}

impl<'a> ReadingOrigin<'a> {
    /// An origin for `object` whose attribute is the spec's own, `*` when it selects every attribute.
    #[must_use]
    pub fn new(spec: &'a QuerySpec, object: &'a ObjectHandle) -> Self {
        Self {
            spec,
            object,
            attribute: spec.attribute(),
            attribute_type: None,
        }
    }

    #[must_use]
    pub const fn with_attribute(mut self, attribute: &'a str, attribute_type: Option<&'a str>) -> Self {
        self.attribute = attribute;
        self.attribute_type = attribute_type;
        self
    }

    #[must_use]
    pub fn reading(&self, key: Option<String>, value: ReadingValue) -> Reading {
        Reading {
            object_identity: self.object.clone(),
            attribute: self.attribute.to_owned(),
            attribute_type: self.attribute_type.map(str::to_owned),
            key,
            value,
            metric_name: self.spec.metric_name().map(str::to_owned),
            metric_labels: self.spec.metric_labels().cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_kinds() {
        assert_eq!(ReadingValue::Scalar(Scalar::Bool(true)).kind(), ValueKind::Scalar);
        assert_eq!(ReadingValue::Unavailable.kind(), ValueKind::Unavailable);
        assert_eq!(ReadingValue::Opaque(json!([])).kind(), ValueKind::Opaque);
        assert_eq!(ValueKind::Unavailable.to_string(), "unavailable");
    }

    #[test]
    fn test_value_to_json() {
        assert_eq!(ReadingValue::Scalar(Scalar::Text("up".into())).to_json(), json!("up"));
        assert_eq!(ReadingValue::Unavailable.to_json(), Json::Null);
        assert_eq!(ReadingValue::Opaque(json!({"a": 1})).to_json(), json!({"a": 1}));
    }

    #[test]
    fn test_origin_copies_spec_metadata() {
        let spec = QuerySpec::new("app:type=Cache")
            .with_metric_name("cache_stats")
            .with_metric_labels([("env", "prod")]);
        let object = ObjectHandle::new("app:type=Cache");

        let reading = ReadingOrigin::new(&spec, &object)
            .with_attribute("stats", Some("long"))
            .reading(Some("size".into()), ReadingValue::Unavailable);

        assert_eq!(reading.object_identity, object);
        assert_eq!(reading.attribute, "stats");
        assert_eq!(reading.attribute_type.as_deref(), Some("long"));
        assert_eq!(reading.key.as_deref(), Some("size"));
        assert_eq!(reading.metric_name.as_deref(), Some("cache_stats"));
        assert_eq!(reading.metric_labels.unwrap()["env"], "prod");
    }

    #[test]
    fn test_origin_defaults_to_spec_attribute() {
        let object = ObjectHandle::new("app:type=Cache");

        let all = QuerySpec::new("app:type=Cache");
        let reading = ReadingOrigin::new(&all, &object).reading(None, ReadingValue::Unavailable);
        assert_eq!(reading.attribute, "*");
        assert_eq!(reading.attribute_type, None);

        let one = QuerySpec::new("app:type=Cache").with_attribute("hits");
        let reading = ReadingOrigin::new(&one, &object).reading(None, ReadingValue::Unavailable);
        assert_eq!(reading.attribute, "hits");
    }

    #[test]
    fn test_with_tokens_replaced() {
        let spec = QuerySpec::new("app:type=Cache,name=users")
            .with_metric_name("{domain}_{type}_{attribute}")
            .with_metric_labels([("cache", "{name}"), ("field", "{attributeKey}")]);
        let object = ObjectHandle::new("app:name=users,type=Cache");

        let reading = ReadingOrigin::new(&spec, &object)
            .with_attribute("stats", None)
            .reading(Some("size".into()), ReadingValue::Unavailable)
            .with_tokens_replaced();

        assert_eq!(reading.metric_name.as_deref(), Some("app_Cache_stats"));
        let labels = reading.metric_labels.unwrap();
        assert_eq!(labels["cache"], "users");
        assert_eq!(labels["field"], "size");
    }
}
