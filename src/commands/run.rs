//! Command dispatch logic for jmx-query

use super::{QueryArgs, process_query};
use crate::{Host, Result};
use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "jmx-query", author, version, long_about = None)]
#[command(about = "Query JMX attributes and flatten them into metric readings")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(flatten)]
    query: QueryArgs,
}

/// Parse command-line arguments and run the queries
///
/// # Arguments
///
/// * `args` - An iterator of command-line arguments (typically from `std::env::args()`)
///
/// # Errors
///
/// Returns an error if the output cannot be written
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let cli = Cli::parse_from(args);
    process_query(host, &cli.query).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_repeated_queries() {
        let cli = Cli::try_parse_from(["jmx-query", "--snapshot", "s.json", "-q", "a:b=c", "-q", "d:e=f/x", "--pretty"]).unwrap();
        assert_eq!(cli.query.queries, ["a:b=c", "d:e=f/x"]);
        assert_eq!(cli.query.snapshot.as_deref().map(camino::Utf8Path::as_str), Some("s.json"));
        assert!(cli.query.pretty);
    }

    #[test]
    fn test_query_is_required() {
        let _ = Cli::try_parse_from(["jmx-query", "--snapshot", "s.json"]).unwrap_err();
    }

    #[test]
    fn test_url_conflicts_with_snapshot() {
        let _ = Cli::try_parse_from(["jmx-query", "--url", "http://h/jolokia", "--snapshot", "s.json", "-q", "a:b=c"]).unwrap_err();
    }

    #[test]
    fn test_concurrency_range() {
        let _ = Cli::try_parse_from(["jmx-query", "-q", "a:b=c", "--concurrency", "0"]).unwrap_err();
        let cli = Cli::try_parse_from(["jmx-query", "-q", "a:b=c", "--concurrency", "16"]).unwrap();
        assert_eq!(cli.query.concurrency, Some(16));
    }
}
