//! In-memory registry
//!
//! Serves a fixed set of objects. Objects can be marked faulty and attributes unavailable so
//! that the failure modes of a live registry can be reproduced offline. A registry can be loaded
//! from a JSON snapshot:
//!
//! ```json
//! {
//!   "defaultDomain": "DefaultDomain",
//!   "objects": [
//!     {
//!       "name": "app:type=Cache",
//!       "attributes": [
//!         { "name": "hitRate", "type": "double", "value": 0.92 },
//!         { "name": "stats", "type": "javax.management.openmbean.CompositeData", "value": { "size": 100 } },
//!         { "name": "owner", "type": "java.lang.String", "unavailable": true }
//!       ]
//!     },
//!     { "name": "app:type=Broken", "faulty": true }
//!   ]
//! }
//! ```

use super::{AttributeDescriptor, ObjectHandle, ObjectName, ObjectNameError, RegistryConnection, RegistryError, Value};
use camino::Utf8Path;
use ohno::IntoAppError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;

/// Domain substituted for an empty domain in names and patterns.
const DEFAULT_DOMAIN: &str = "DefaultDomain";

#[derive(Debug, Clone)]
pub struct MemoryAttribute {
    descriptor: AttributeDescriptor,
    value: Option<Value>,
}

impl MemoryAttribute {
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: Option<&str>, value: impl Into<Value>) -> Self {
        Self {
            descriptor: AttributeDescriptor::new(name, type_name),
            value: Some(value.into()),
        }
    }

    /// An attribute that is listed in the schema but whose value can never be fetched.
    #[must_use]
    pub fn unavailable(name: impl Into<String>, type_name: Option<&str>) -> Self {
        Self {
            descriptor: AttributeDescriptor::new(name, type_name),
            value: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryObject {
    name: ObjectName,
    faulty: bool,
    attributes: Vec<MemoryAttribute>,
}

impl MemoryObject {
    /// Create an object with no attributes. The name must not be a pattern.
    pub fn new(name: &str) -> Result<Self, ObjectNameError> {
        let name = ObjectName::parse(name)?;
        if name.is_pattern() {
            return Err(ObjectNameError::new("a registered object name cannot be a pattern"));
        }

        Ok(Self {
            name,
            faulty: false,
            attributes: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_attribute(mut self, attribute: MemoryAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Mark the object as faulty: it is still matched by patterns, but its schema cannot be read.
    #[must_use]
    pub const fn faulty(mut self) -> Self {
        self.faulty = true;
        self
    }

    fn attribute(&self, name: &str) -> Option<&MemoryAttribute> {
        self.attributes.iter().find(|a| a.descriptor.name == name)
    }
}

/// A registry holding its objects in memory.
#[derive(Debug, Clone)]
pub struct MemoryRegistry {
    default_domain: String,
    objects: BTreeMap<String, MemoryObject>,
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_domain: DEFAULT_DOMAIN.to_owned(),
            objects: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_default_domain(mut self, domain: impl Into<String>) -> Self {
        self.default_domain = domain.into();
        self
    }

    /// Register an object, replacing any object with the same canonical name.
    pub fn insert(&mut self, mut object: MemoryObject) {
        if object.name.domain().is_empty() {
            object.name = object.name.with_domain(self.default_domain.as_str());
        }

        let _ = self.objects.insert(object.name.canonical_name(), object);
    }

    #[must_use]
    pub fn with_object(mut self, object: MemoryObject) -> Self {
        self.insert(object);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Build a registry from the JSON snapshot format described in the module documentation.
    pub fn from_snapshot_json(text: &str) -> crate::Result<Self> {
        Self::parse_snapshot(text, "registry snapshot")
    }

    /// Load a JSON snapshot file.
    pub fn load(path: &Utf8Path) -> crate::Result<Self> {
        let text = fs::read_to_string(path).into_app_err_with(|| format!("reading registry snapshot '{path}'"))?;
        Self::parse_snapshot(&text, &format!("registry snapshot '{path}'"))
    }

    fn parse_snapshot(text: &str, source: &str) -> crate::Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(text).into_app_err_with(|| format!("parsing {source}"))?;

        let mut registry = Self::new();
        if let Some(domain) = snapshot.default_domain {
            registry.default_domain = domain;
        }

        for object in snapshot.objects {
            let mut memory_object = MemoryObject::new(&object.name)
                .into_app_err_with(|| format!("invalid object name '{}' in {source}", object.name))?;
            memory_object.faulty = object.faulty;

            for attribute in object.attributes {
                let mut descriptor = AttributeDescriptor::new(attribute.name, attribute.type_name.as_deref());
                descriptor.description = attribute.description;

                let value = (!attribute.unavailable).then(|| Value::from_json(descriptor.type_name.as_deref(), attribute.value));
                memory_object.attributes.push(MemoryAttribute { descriptor, value });
            }

            registry.insert(memory_object);
        }

        log::debug!("loaded {source} with {} object(s)", registry.len());
        Ok(registry)
    }

    fn object(&self, handle: &ObjectHandle) -> Option<&MemoryObject> {
        self.objects.get(handle.name())
    }
}

impl RegistryConnection for MemoryRegistry {
    async fn query_objects(&self, pattern: &str) -> Result<Vec<ObjectHandle>, RegistryError> {
        let mut parsed = ObjectName::parse(pattern).map_err(|e| RegistryError::BadPattern {
            pattern: pattern.to_owned(),
            reason: e.reason().to_owned(),
        })?;

        if parsed.domain().is_empty() {
            parsed = parsed.with_domain(self.default_domain.as_str());
        }

        let matcher = parsed.matcher();
        Ok(self
            .objects
            .iter()
            .filter(|(_, object)| matcher.matches(&object.name))
            .map(|(name, _)| ObjectHandle::new(name))
            .collect())
    }

    async fn attribute_schema(&self, object: &ObjectHandle) -> Result<Vec<AttributeDescriptor>, RegistryError> {
        let fault = |reason: &str| RegistryError::ObjectFault {
            object: object.name().to_owned(),
            reason: reason.to_owned(),
        };

        let registered = self.object(object).ok_or_else(|| fault("object is not registered"))?;
        if registered.faulty {
            return Err(fault("object metadata cannot be read"));
        }

        Ok(registered.attributes.iter().map(|a| a.descriptor.clone()).collect())
    }

    async fn attribute_value(&self, object: &ObjectHandle, attribute: &AttributeDescriptor) -> Result<Value, RegistryError> {
        let unavailable = |reason: &str| RegistryError::AttributeUnavailable {
            object: object.name().to_owned(),
            attribute: attribute.name.clone(),
            reason: reason.to_owned(),
        };

        let registered = self.object(object).ok_or_else(|| unavailable("object is not registered"))?;
        let stored = registered.attribute(&attribute.name).ok_or_else(|| unavailable("no such attribute"))?;

        stored.value.clone().ok_or_else(|| unavailable("value cannot be fetched"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct Snapshot {
    #[serde(default)]
    default_domain: Option<String>,

    #[serde(default)]
    objects: Vec<SnapshotObject>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotObject {
    name: String,

    #[serde(default)]
    faulty: bool,

    #[serde(default)]
    attributes: Vec<SnapshotAttribute>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotAttribute {
    name: String,

    #[serde(default, rename = "type")]
    type_name: Option<String>,

    #[serde(default)]
    description: Option<String>,

    #[serde(default)]
    value: serde_json::Value,

    #[serde(default)]
    unavailable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::COMPOSITE_TYPE;
    use serde_json::json;

    fn sample_registry() -> MemoryRegistry {
        MemoryRegistry::new()
            .with_object(
                MemoryObject::new("app:type=Cache,name=users")
                    .unwrap()
                    .with_attribute(MemoryAttribute::new("hits", Some("long"), 10))
                    .with_attribute(MemoryAttribute::unavailable("owner", Some("java.lang.String"))),
            )
            .with_object(MemoryObject::new("app:type=Cache,name=orders").unwrap())
            .with_object(MemoryObject::new("app:type=Broken").unwrap().faulty())
            .with_object(MemoryObject::new(":type=Local").unwrap())
    }

    fn names(handles: &[ObjectHandle]) -> Vec<&str> {
        handles.iter().map(ObjectHandle::name).collect()
    }

    #[tokio::test]
    async fn test_query_objects_with_patterns() {
        let registry = sample_registry();

        let all = registry.query_objects("*:*").await.unwrap();
        assert_eq!(all.len(), 4);

        let caches = registry.query_objects("app:type=Cache,*").await.unwrap();
        assert_eq!(names(&caches), ["app:name=orders,type=Cache", "app:name=users,type=Cache"]);

        let exact = registry.query_objects("app:type=Cache,name=users").await.unwrap();
        assert_eq!(names(&exact), ["app:name=users,type=Cache"]);

        let none = registry.query_objects("app:type=Missing").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_empty_domain_uses_default_domain() {
        let registry = sample_registry();

        let local = registry.query_objects(":type=Local").await.unwrap();
        assert_eq!(names(&local), ["DefaultDomain:type=Local"]);
    }

    #[tokio::test]
    async fn test_bad_pattern() {
        let registry = sample_registry();

        let err = registry.query_objects("no-colon").await.unwrap_err();
        assert!(matches!(err, RegistryError::BadPattern { ref pattern, .. } if pattern == "no-colon"));
    }

    #[tokio::test]
    async fn test_faulty_object_schema() {
        let registry = sample_registry();

        let err = registry.attribute_schema(&ObjectHandle::new("app:type=Broken")).await.unwrap_err();
        assert!(matches!(err, RegistryError::ObjectFault { .. }));
    }

    #[tokio::test]
    async fn test_unknown_object_schema() {
        let registry = sample_registry();

        let err = registry.attribute_schema(&ObjectHandle::new("app:type=Gone")).await.unwrap_err();
        assert!(matches!(err, RegistryError::ObjectFault { .. }));
    }

    #[tokio::test]
    async fn test_attribute_values() {
        let registry = sample_registry();
        let handle = ObjectHandle::new("app:name=users,type=Cache");

        let schema = registry.attribute_schema(&handle).await.unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema[0].name, "hits");
        assert_eq!(schema[0].type_name.as_deref(), Some("long"));

        assert_eq!(registry.attribute_value(&handle, &schema[0]).await.unwrap(), Value::from(10));

        let err = registry.attribute_value(&handle, &schema[1]).await.unwrap_err();
        assert!(matches!(err, RegistryError::AttributeUnavailable { ref attribute, .. } if attribute == "owner"));

        let missing = AttributeDescriptor::new("nope", None);
        let _ = registry.attribute_value(&handle, &missing).await.unwrap_err();
    }

    #[test]
    fn test_pattern_names_cannot_be_registered() {
        let _ = MemoryObject::new("app:type=*").unwrap_err();
        let _ = MemoryObject::new("app:type=Cache,*").unwrap_err();
    }

    #[tokio::test]
    async fn test_snapshot_json() {
        let text = json!({
            "objects": [
                {
                    "name": "app:type=Cache",
                    "attributes": [
                        { "name": "hitRate", "type": "double", "value": 0.92 },
                        { "name": "stats", "type": COMPOSITE_TYPE, "value": { "size": 100, "evictions": 3 }, "description": "cache stats" },
                        { "name": "owner", "unavailable": true }
                    ]
                },
                { "name": "app:type=Broken", "faulty": true }
            ]
        })
        .to_string();

        let registry = MemoryRegistry::from_snapshot_json(&text).unwrap();
        assert_eq!(registry.len(), 2);

        let handle = ObjectHandle::new("app:type=Cache");
        let schema = registry.attribute_schema(&handle).await.unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema[1].description.as_deref(), Some("cache stats"));

        let stats = registry.attribute_value(&handle, &schema[1]).await.unwrap();
        assert_eq!(stats, Value::composite([("evictions", Value::from(3)), ("size", Value::from(100))]));

        let _ = registry.attribute_value(&handle, &schema[2]).await.unwrap_err();
        let _ = registry.attribute_schema(&ObjectHandle::new("app:type=Broken")).await.unwrap_err();
    }

    #[test]
    fn test_snapshot_rejects_invalid_names_and_fields() {
        let bad_name = json!({ "objects": [ { "name": "broken" } ] }).to_string();
        let _ = MemoryRegistry::from_snapshot_json(&bad_name).unwrap_err();

        let unknown_field = json!({ "objects": [ { "name": "a:b=c", "color": "red" } ] }).to_string();
        let _ = MemoryRegistry::from_snapshot_json(&unknown_field).unwrap_err();
    }

    #[test]
    fn test_snapshot_default_domain() {
        let text = json!({ "defaultDomain": "jboss", "objects": [ { "name": ":type=Local" } ] }).to_string();
        let registry = MemoryRegistry::from_snapshot_json(&text).unwrap();
        assert!(registry.objects.contains_key("jboss:type=Local"));
    }

    #[test]
    fn test_load_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::try_from(dir.path().join("snapshot.json")).unwrap();
        fs::write(&path, r#"{ "objects": [ { "name": "a:b=c" } ] }"#).unwrap();

        let registry = MemoryRegistry::load(&path).unwrap();
        assert_eq!(registry.len(), 1);

        let _ = MemoryRegistry::load(&path.with_file_name("missing.json")).unwrap_err();
    }
}
