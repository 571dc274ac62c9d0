use super::{Reading, ReadingOrigin, ReadingValue, flatten};
use crate::query::QuerySpec;
use crate::registry::{AttributeDescriptor, ObjectHandle, RegistryConnection, RegistryError};
use futures::stream::{self, StreamExt};

/// Number of objects resolved at the same time when no other bound is configured.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// A spec that could not be resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecFailure {
    pub spec: QuerySpec,
    pub error: RegistryError,
}

/// The outcome of resolving a list of specs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Readings of every spec that resolved, in spec order.
    pub readings: Vec<Reading>,

    /// Specs that failed, in spec order.
    pub failures: Vec<SpecFailure>,
}

impl Resolution {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resolves query specs against a registry connection.
#[derive(Debug)]
pub struct Resolver<'a, R> {
    registry: &'a R,
    concurrency: usize,
}

impl<'a, R: RegistryConnection> Resolver<'a, R> {
    #[must_use]
    pub const fn new(registry: &'a R) -> Self {
        Self {
            registry,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Bound the number of objects resolved concurrently. Zero is treated as one.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Resolve every spec in order.
    ///
    /// A spec that fails is recorded in [`Resolution::failures`] and does not stop the others.
    /// A connection failure aborts the whole pass.
    pub async fn resolve_all(&self, specs: &[QuerySpec]) -> Result<Resolution, RegistryError> {
        let mut resolution = Resolution::default();

        for spec in specs {
            match self.resolve_one(spec).await {
                Ok(readings) => resolution.readings.extend(readings),
                Err(e) if e.is_connection() => return Err(e),
                Err(e) => {
                    log::warn!("query '{spec}' failed: {e}");
                    resolution.failures.push(SpecFailure {
                        spec: spec.clone(),
                        error: e,
                    });
                }
            }
        }

        log::info!(
            "resolved {} spec(s) into {} reading(s), {} failure(s)",
            specs.len(),
            resolution.readings.len(),
            resolution.failures.len()
        );

        Ok(resolution)
    }

    /// Resolve one spec into readings.
    ///
    /// Failures of individual objects and attributes become unavailable readings; only an
    /// invalid pattern or a connection failure is returned as an error.
    pub async fn resolve_one(&self, spec: &QuerySpec) -> Result<Vec<Reading>, RegistryError> {
        let mut objects = self.registry.query_objects(spec.object_pattern()).await?;
        objects.sort();
        objects.dedup();

        log::debug!("pattern '{}' matched {} object(s)", spec.object_pattern(), objects.len());

        let per_object: Vec<_> = stream::iter(objects.iter().map(|object| self.resolve_object(spec, object)))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut readings = Vec::new();
        for result in per_object {
            readings.extend(result?);
        }

        Ok(readings)
    }

    async fn resolve_object(&self, spec: &QuerySpec, object: &ObjectHandle) -> Result<Vec<Reading>, RegistryError> {
        let schema = match self.registry.attribute_schema(object).await {
            Ok(schema) => schema,
            Err(e) if e.is_connection() => return Err(e),
            Err(e) => {
                log::warn!("{e}");
                return Ok(vec![ReadingOrigin::new(spec, object).reading(None, ReadingValue::Unavailable)]);
            }
        };

        let mut readings = Vec::new();
        for descriptor in schema.iter().filter(|d| spec.selects_attribute(&d.name)) {
            readings.extend(self.resolve_attribute(spec, object, descriptor).await?);
        }

        Ok(readings)
    }

    async fn resolve_attribute(
        &self,
        spec: &QuerySpec,
        object: &ObjectHandle,
        descriptor: &AttributeDescriptor,
    ) -> Result<Vec<Reading>, RegistryError> {
        let origin = ReadingOrigin::new(spec, object).with_attribute(&descriptor.name, descriptor.type_name.as_deref());

        match self.registry.attribute_value(object, descriptor).await {
            Ok(value) => Ok(flatten(&origin, spec.attribute_key(), &value)),
            Err(e) if e.is_connection() => Err(e),
            Err(e) => {
                log::debug!("{e}");
                Ok(vec![origin.reading(None, ReadingValue::Unavailable)])
            }
        }
    }
}
