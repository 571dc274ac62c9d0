//! Registry connections
//!
//! A registry is a namespace of named objects, each exposing typed and possibly nested
//! attributes. The [`RegistryConnection`] trait is the seam between the resolution engine and a
//! concrete registry:
//!
//! - [`JolokiaConnection`] talks to a live JVM through a Jolokia agent over HTTP
//! - [`MemoryRegistry`] serves a fixed set of objects, optionally loaded from a JSON snapshot
//!
//! Object names follow the `domain:key=value,...` grammar implemented by [`ObjectName`].

mod jolokia;
mod memory;
mod object_name;
mod registry_error;
mod value;

pub use jolokia::{ConnectOptions, Credentials, JolokiaConnection};
pub use memory::{MemoryAttribute, MemoryObject, MemoryRegistry};
pub use object_name::{NameMatcher, ObjectName, ObjectNameError, unquote};
pub use registry_error::RegistryError;
pub use value::{COMPOSITE_TYPE, Scalar, TABULAR_TYPE, Value};

use core::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

/// The concrete name of one registered object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectHandle(Arc<str>);

impl ObjectHandle {
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Display for ObjectHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// Metadata describing one attribute of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub name: String,
    pub type_name: Option<String>,
    pub description: Option<String>,
}

impl AttributeDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: Option<&str>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.map(str::to_owned),
            description: None,
        }
    }
}

/// A connection to an object registry.
///
/// Implementations must tolerate concurrent calls on a shared reference: the resolution engine
/// issues requests for different objects at the same time and does not serialize them.
/// Implementations enforce their own timeouts and never retry.
pub trait RegistryConnection: Send + Sync {
    /// Expand an object name pattern into the names of the registered objects it matches.
    fn query_objects(&self, pattern: &str) -> impl Future<Output = Result<Vec<ObjectHandle>, RegistryError>> + Send;

    /// Fetch the attribute descriptors of one object.
    fn attribute_schema(&self, object: &ObjectHandle) -> impl Future<Output = Result<Vec<AttributeDescriptor>, RegistryError>> + Send;

    /// Fetch the current value of one attribute.
    ///
    /// The whole descriptor is passed so the value can be interpreted by its declared type.
    fn attribute_value(
        &self,
        object: &ObjectHandle,
        attribute: &AttributeDescriptor,
    ) -> impl Future<Output = Result<Value, RegistryError>> + Send;

    /// Release the connection.
    fn disconnect(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}
