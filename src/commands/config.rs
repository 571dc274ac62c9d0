use crate::Result;
use crate::registry::ConnectOptions;
use crate::resolve::DEFAULT_CONCURRENCY;
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use directories::ProjectDirs;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// Name of the configuration file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "jmx-query.toml";

const MAX_CONCURRENCY: usize = 256;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// URL of the Jolokia agent used when none is given on the command line
    #[serde(default)]
    pub url: Option<String>,

    /// User name for basic authentication
    #[serde(default)]
    pub username: Option<String>,

    /// Number of objects resolved at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Time allowed to establish the connection
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Time allowed for a single request
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

const fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

const fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

const fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// An explicit path must exist. Otherwise `jmx-query.toml` in `working_dir` is used, then
    /// `config.toml` in the user's configuration directory, and finally the defaults.
    pub fn load(working_dir: &Utf8Path, config_path: Option<&Utf8Path>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading configuration file '{path}'"))?;
            (path.to_owned(), text)
        } else {
            let mut candidates = vec![working_dir.join(CONFIG_FILE_NAME)];
            candidates.extend(user_config_path());

            let mut found = None;
            for path in candidates {
                match fs::read_to_string(&path) {
                    Ok(text) => {
                        found = Some((path, text));
                        break;
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e).into_app_err_with(|| format!("reading configuration file '{path}'")),
                }
            }

            let Some(found) = found else {
                log::debug!("no configuration file found, using defaults");
                return Ok(Self::default());
            };

            found
        };

        log::debug!("loading configuration from '{final_path}'");
        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(app_err!(
                "concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
                self.concurrency
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(app_err!("connect_timeout must be greater than zero"));
        }

        if self.request_timeout.is_zero() {
            return Err(app_err!("request_timeout must be greater than zero"));
        }

        if let Some(url) = &self.url {
            let _ = url::Url::parse(url).into_app_err_with(|| format!("url '{url}' is not a valid URL"))?;
        }

        Ok(())
    }

    #[must_use]
    pub const fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}

fn user_config_path() -> Option<Utf8PathBuf> {
    let dirs = ProjectDirs::from("", "", "jmx-query")?;
    Utf8PathBuf::from_path_buf(dirs.config_dir().join("config.toml")).ok()
}
