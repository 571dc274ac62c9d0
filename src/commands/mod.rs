//! Command-line interface and orchestration for jmx-query
//!
//! The `run` function parses command-line arguments using clap and hands them to the query
//! command, which:
//!
//! 1. Parses the query tokens
//! 2. Loads the configuration
//! 3. Connects to a Jolokia agent, or loads a registry snapshot
//! 4. Resolves the queries into readings
//! 5. Writes the readings, or a machine-readable error, as JSON
//!
//! Configuration is read from a TOML file holding connection defaults and timeouts.

mod config;
mod host;
mod query;
mod run;

pub use config::{CONFIG_FILE_NAME, Config, DEFAULT_CONFIG_TOML};
pub use host::Host;
pub use query::{EXIT_FATAL, EXIT_PARTIAL, LogLevel, QueryArgs, process_query};
pub use run::run;
