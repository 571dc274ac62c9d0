//! Output of resolved readings
//!
//! Readings are written as a JSON array with one object per reading. Failures are written as
//! `{error, message}` objects whose `error` field is an [`ErrorCode`].

mod json;

pub use json::{generate as generate_json, generate_error};

use strum::{Display, IntoStaticStr};

/// Machine-readable error codes reported in `{error, message}` objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorCode {
    /// A query token could not be parsed.
    BadQuery,

    /// An object name pattern is invalid.
    BadPattern,

    /// The registry could not be reached.
    ConnectionError,

    /// The connection was lost while queries were being resolved.
    QueryConnectionError,

    /// Any other failure.
    GeneralException,
}
