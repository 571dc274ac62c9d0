use thiserror::Error;

/// Failures reported by a registry connection.
///
/// The variants differ in how far they propagate: a connection failure ends the whole
/// resolution pass, a bad pattern fails one query, and object or attribute failures are
/// recovered into unavailable readings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The registry cannot be reached or rejected the session.
    #[error("registry connection failed: {0}")]
    Connection(String),

    /// The object name pattern is not valid in the registry's naming grammar.
    #[error("invalid object name pattern '{pattern}': {reason}")]
    BadPattern { pattern: String, reason: String },

    /// One object's metadata cannot be read although the registry itself is healthy.
    #[error("unable to read the attributes of '{object}': {reason}")]
    ObjectFault { object: String, reason: String },

    /// One attribute value cannot be fetched.
    #[error("attribute '{attribute}' of '{object}' is unavailable: {reason}")]
    AttributeUnavailable { object: String, attribute: String, reason: String },
}

impl RegistryError {
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}
