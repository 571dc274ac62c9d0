//! jmx-query crate
//!
//! Resolves metric queries against a JMX registry and flattens the attribute values into scalar
//! readings. This crate backs the `jmx-query` tool; its API may change without warning.
//!
//! # Module Organization
//!
//! - [`query`]: query tokens and their grammar
//! - [`registry`]: registry connections (Jolokia and in-memory), object names and values
//! - [`resolve`]: pattern expansion, value flattening and failure isolation
//! - [`reports`]: JSON output
//! - [`commands`]: command-line interface and orchestration

/// Result type alias using `ohno::AppError` as the default error type.
pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[doc(hidden)]
pub mod commands;

pub mod query;

pub mod registry;

#[doc(hidden)]
pub mod reports;

pub mod resolve;

pub use crate::commands::{Host, run};
