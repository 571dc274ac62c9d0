//! Query model
//!
//! A [`QuerySpec`] describes one requested metric: an object name pattern, an optional attribute,
//! an optional nested key, and the caller's metric name and labels. Specs are parsed from the
//! compact `{object}/{attribute}/{key}` grammar, optionally prefixed with
//! `name<label=value,...>==`, and multiple specs are separated by `;`.
//!
//! Parsing never contacts the registry. Patterns are validated lazily during resolution.

mod malformed_query;
mod query_spec;

pub use malformed_query::MalformedQuery;
pub use query_spec::{QuerySpec, parse_queries};
