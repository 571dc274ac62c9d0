//! Metric resolution
//!
//! Expands each query spec against a registry connection and flattens the fetched attribute
//! values into leaf [`Reading`]s. Failures are isolated at the narrowest level possible: a broken
//! object or attribute becomes one unavailable reading, an invalid pattern fails only its spec,
//! and only a lost connection ends the pass.

mod engine;
mod flatten;
mod reading;
mod tokens;

pub use engine::{DEFAULT_CONCURRENCY, Resolution, Resolver, SpecFailure};
pub use flatten::flatten;
pub use reading::{Reading, ReadingOrigin, ReadingValue, ValueKind};
pub use tokens::replace_tokens;
