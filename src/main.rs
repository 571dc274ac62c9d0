//! Query JMX attributes and flatten them into metric readings.
//!
//! # Overview
//!
//! `jmx-query` connects to a JVM through a [Jolokia](https://jolokia.org) agent, expands object
//! name patterns into the registered objects they match, reads their attributes, and prints one
//! JSON object per scalar value. Composite attributes are flattened into one reading per field.
//!
//! # Queries
//!
//! A query has the form `{object}/{attribute}/{key}`. The attribute and key are optional and
//! select everything when omitted or `*`:
//!
//! ```bash
//! jmx-query --url http://localhost:8778/jolokia -q 'java.lang:type=Memory/HeapMemoryUsage/used'
//! jmx-query --url http://localhost:8778/jolokia -q 'java.lang:type=GarbageCollector,*'
//! ```
//!
//! Several queries can be separated by `;` or given with repeated `-q` flags. A query can carry a
//! metric name and labels, which are copied onto every reading it produces. Names and label
//! values may refer to `{attribute}`, `{attributeKey}`, `{domain}` and the key properties of the
//! object name:
//!
//! ```bash
//! jmx-query -q 'jvm_gc_{attributeKey}<collector={name}>==java.lang:type=GarbageCollector,*/LastGcInfo'
//! ```
//!
//! # Offline use
//!
//! `--snapshot PATH` resolves queries against a JSON description of a registry instead of a live
//! agent.
//!
//! # Exit codes
//!
//! - `0`: every query resolved
//! - `1`: readings were printed, but some queries had invalid patterns (reported on stderr)
//! - `2`: nothing could be resolved; a `{error, message}` object is printed instead of readings
//!
//! # Configuration
//!
//! Defaults for the agent URL, user name, concurrency and timeouts are read from
//! `jmx-query.toml` in the working directory, from `--config PATH`, or from the user's
//! configuration directory.

use jmx_query::{Host, run};
use std::io::Write;
use std::io::{stderr, stdout};

/// Default host that writes to the process streams.
#[derive(Debug, Clone, Default)]
pub struct RealHost;

impl Host for RealHost {
    fn output(&mut self) -> impl Write {
        stdout()
    }

    fn error(&mut self) -> impl Write {
        stderr()
    }

    fn exit(&mut self, code: i32) {
        std::process::exit(code);
    }
}

#[tokio::main]
async fn main() -> Result<(), ohno::AppError> {
    run(&mut RealHost, std::env::args()).await
}
