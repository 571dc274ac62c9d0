use super::Host;
use super::config::Config;
use crate::Result;
use crate::query::{MalformedQuery, QuerySpec, parse_queries};
use crate::registry::{Credentials, JolokiaConnection, MemoryRegistry, RegistryConnection};
use crate::reports::{ErrorCode, generate_error, generate_json};
use crate::resolve::{Resolution, Resolver};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, ValueEnum};
use std::io::Write;

/// Exit code when some queries failed but readings were still produced
pub const EXIT_PARTIAL: i32 = 1;

/// Exit code when nothing could be resolved
pub const EXIT_FATAL: i32 = 2;

/// Environment variable holding the agent password
const PASSWORD_ENV: &str = "JMX_PASSWORD";

/// Password value that defers to [`PASSWORD_ENV`]
const PASSWORD_FROM_ENV: &str = "ENV";

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// URL of the Jolokia agent, e.g. `http://localhost:8778/jolokia`
    #[arg(long, value_name = "URL", env = "JMX_QUERY_URL", conflicts_with = "snapshot")]
    pub url: Option<String>,

    /// Resolve queries against a JSON registry snapshot instead of a live agent
    #[arg(long, value_name = "PATH")]
    pub snapshot: Option<Utf8PathBuf>,

    /// User name for agents protected by basic authentication
    #[arg(long, short = 'u', value_name = "USER")]
    pub username: Option<String>,

    /// Password for agents protected by basic authentication; `ENV` reads it from `JMX_PASSWORD`
    #[arg(long, short = 'p', value_name = "PASSWORD", env = "JMX_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Query in the form `[name<labels>==]{object}/{attribute}/{key}`; several queries may be
    /// separated by `;` or given with repeated flags
    #[arg(long = "query", short = 'q', value_name = "QUERY", required = true)]
    pub queries: Vec<String>,

    /// Path to configuration file (default is `jmx-query.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Number of objects resolved at the same time (overrides the configuration file)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..=256))]
    pub concurrency: Option<u16>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none")]
    pub log_level: LogLevel,
}

/// A failure that ends the invocation before any readings are printed.
#[derive(Debug)]
struct Fatal {
    code: ErrorCode,
    message: String,
}

impl Fatal {
    fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<MalformedQuery> for Fatal {
    fn from(e: MalformedQuery) -> Self {
        Self::new(ErrorCode::BadQuery, e.to_string())
    }
}

/// Run the queries and write the readings to the host's output.
///
/// Exits with [`EXIT_PARTIAL`] when some queries failed and [`EXIT_FATAL`] when nothing could be
/// resolved; in the latter case a single `{error, message}` object replaces the readings.
pub async fn process_query<H: Host>(host: &mut H, args: &QueryArgs) -> Result<()> {
    init_logging(args.log_level);

    match execute(args, Utf8Path::new(".")).await {
        Ok(resolution) => {
            let mut text = String::new();
            generate_json(&resolution.readings, args.pretty, &mut text)?;
            host.output().write_all(text.as_bytes())?;

            if !resolution.is_complete() {
                let mut errors = String::new();
                for failure in &resolution.failures {
                    generate_error(ErrorCode::BadPattern, &failure.error.to_string(), &mut errors)?;
                }

                host.error().write_all(errors.as_bytes())?;
                host.exit(EXIT_PARTIAL);
            }
        }

        Err(fatal) => {
            log::error!("{}", fatal.message);

            let mut text = String::new();
            generate_error(fatal.code, &fatal.message, &mut text)?;
            host.output().write_all(text.as_bytes())?;
            host.exit(EXIT_FATAL);
        }
    }

    Ok(())
}

async fn execute(args: &QueryArgs, working_dir: &Utf8Path) -> core::result::Result<Resolution, Fatal> {
    let specs = parse_query_args(&args.queries)?;

    let config = Config::load(working_dir, args.config.as_deref())
        .map_err(|e| Fatal::new(ErrorCode::GeneralException, format!("{e:#}")))?;

    let concurrency = args.concurrency.map_or(config.concurrency, usize::from);

    if let Some(path) = &args.snapshot {
        let registry = MemoryRegistry::load(path).map_err(|e| Fatal::new(ErrorCode::GeneralException, format!("{e:#}")))?;
        return resolve(&registry, &specs, concurrency).await;
    }

    let url = args
        .url
        .as_deref()
        .or(config.url.as_deref())
        .ok_or_else(|| Fatal::new(ErrorCode::GeneralException, "no agent URL given; use --url or --snapshot"))?;

    let credentials = args
        .username
        .as_ref()
        .or(config.username.as_ref())
        .map(|username| {
            let password = resolve_password(args.password.as_deref(), |name| std::env::var(name).ok());
            Credentials::new(username.as_str(), password)
        });

    let connection = JolokiaConnection::connect(url, credentials, &config.connect_options())
        .await
        .map_err(|e| Fatal::new(ErrorCode::ConnectionError, e.to_string()))?;

    let result = resolve(&connection, &specs, concurrency).await;
    connection.disconnect().await;
    result
}

async fn resolve<R: RegistryConnection>(registry: &R, specs: &[QuerySpec], concurrency: usize) -> core::result::Result<Resolution, Fatal> {
    Resolver::new(registry)
        .with_concurrency(concurrency)
        .resolve_all(specs)
        .await
        .map_err(|e| Fatal::new(ErrorCode::QueryConnectionError, e.to_string()))
}

/// Parse every `--query` value, each of which may hold several `;`-separated queries.
fn parse_query_args(values: &[String]) -> core::result::Result<Vec<QuerySpec>, MalformedQuery> {
    let mut specs = Vec::new();
    for value in values {
        specs.extend(parse_queries(value)?);
    }

    Ok(specs)
}

/// The password to send, with the literal `ENV` replaced by the value of [`PASSWORD_ENV`].
fn resolve_password(value: Option<&str>, lookup: impl FnOnce(&str) -> Option<String>) -> Option<String> {
    match value {
        Some(PASSWORD_FROM_ENV) => lookup(PASSWORD_ENV),
        other => other.map(str::to_owned),
    }
}

fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    // a logger may already be installed when queries run more than once in a process
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::host::TestHost;
    use serde_json::Value as Json;
    use std::fs;

    const SNAPSHOT: &str = r#"{
        "objects": [
            {
                "name": "app:type=Cache",
                "attributes": [
                    { "name": "hitRate", "type": "double", "value": 0.92 },
                    { "name": "stats", "type": "javax.management.openmbean.CompositeData", "value": { "size": 100, "evictions": 3 } }
                ]
            },
            { "name": "app:type=Broken", "faulty": true }
        ]
    }"#;

    fn write_snapshot() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("snapshot.json")).unwrap();
        fs::write(&path, SNAPSHOT).unwrap();
        (dir, path)
    }

    fn args(snapshot: Option<Utf8PathBuf>, queries: &[&str]) -> QueryArgs {
        QueryArgs {
            url: None,
            snapshot,
            username: None,
            password: None,
            queries: queries.iter().map(|q| (*q).to_owned()).collect(),
            config: None,
            concurrency: None,
            pretty: false,
            log_level: LogLevel::None,
        }
    }

    #[test]
    fn test_parse_query_args_splits_and_concatenates() {
        let values = vec!["a:b=c/x;a:b=d".to_owned(), "e:f=g".to_owned()];
        let specs = parse_query_args(&values).unwrap();
        let patterns: Vec<_> = specs.iter().map(QuerySpec::object_pattern).collect();
        assert_eq!(patterns, ["a:b=c", "a:b=d", "e:f=g"]);
    }

    #[test]
    fn test_password_env_reads_environment() {
        let lookup = |name: &str| (name == "JMX_PASSWORD").then(|| "from-env".to_owned());

        assert_eq!(resolve_password(Some("ENV"), lookup).as_deref(), Some("from-env"));
        assert_eq!(resolve_password(Some("ENV"), |_| None), None);
        assert_eq!(resolve_password(Some("secret"), lookup).as_deref(), Some("secret"));
        assert_eq!(resolve_password(Some("env"), lookup).as_deref(), Some("env"));
        assert_eq!(resolve_password(None, lookup), None);
    }

    #[test]
    fn test_password_flag_accepts_env() {
        let parsed = QueryArgs::try_parse_from(["query", "-u", "monitor", "-p", "ENV", "-q", "app:*"]).unwrap();
        assert_eq!(parsed.password.as_deref(), Some("ENV"));
        assert_eq!(parsed.username.as_deref(), Some("monitor"));
    }

    #[test]
    fn test_parse_query_args_rejects_empty() {
        let _ = parse_query_args(&[";".to_owned()]).unwrap_err();
    }

    #[tokio::test]
    async fn test_snapshot_query_succeeds() {
        let (_dir, path) = write_snapshot();
        let mut host = TestHost::new();

        process_query(&mut host, &args(Some(path), &["app:type=Cache/stats/size"])).await.unwrap();

        assert_eq!(host.exit_code, None);
        let parsed: Json = serde_json::from_str(&host.output_str()).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 1);
        assert_eq!(parsed[0]["key"], "size");
        assert_eq!(parsed[0]["value"], 100);
    }

    #[tokio::test]
    async fn test_malformed_query_exits_fatal() {
        let (_dir, path) = write_snapshot();
        let mut host = TestHost::new();

        process_query(&mut host, &args(Some(path), &["/attr"])).await.unwrap();

        assert_eq!(host.exit_code, Some(EXIT_FATAL));
        let parsed: Json = serde_json::from_str(&host.output_str()).unwrap();
        assert_eq!(parsed["error"], "bad-query");
    }

    #[tokio::test]
    async fn test_bad_pattern_exits_partial() {
        let (_dir, path) = write_snapshot();
        let mut host = TestHost::new();

        process_query(&mut host, &args(Some(path), &["no-colon;app:type=Cache/hitRate"])).await.unwrap();

        assert_eq!(host.exit_code, Some(EXIT_PARTIAL));
        let parsed: Json = serde_json::from_str(&host.output_str()).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 1);

        let error: Json = serde_json::from_str(host.error_str().trim()).unwrap();
        assert_eq!(error["error"], "bad-pattern");
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_general_exception() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("missing.json")).unwrap();
        let mut host = TestHost::new();

        process_query(&mut host, &args(Some(path), &["app:*"])).await.unwrap();

        assert_eq!(host.exit_code, Some(EXIT_FATAL));
        let parsed: Json = serde_json::from_str(&host.output_str()).unwrap();
        assert_eq!(parsed["error"], "general-exception");
    }

    #[tokio::test]
    async fn test_unreachable_agent_is_connection_error() {
        let mut host = TestHost::new();
        let mut query_args = args(None, &["app:*"]);
        query_args.url = Some("http://127.0.0.1:1/jolokia".into());

        process_query(&mut host, &query_args).await.unwrap();

        assert_eq!(host.exit_code, Some(EXIT_FATAL));
        let parsed: Json = serde_json::from_str(&host.output_str()).unwrap();
        assert_eq!(parsed["error"], "connection-error");
    }
}
