use std::{env, fmt, path::Path, time::Duration};

use jiff::civil::Date;
use log::warn;
use thiserror::Error;

use crate::api::elia::_api_elia_core::DateFilter;

pub const DEFAULT_API_BASE: &str = "https://opendata.elia.be/api/explore/v2.1/catalog/datasets";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_POSTGRES_PORT: u16 = 5432;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid date in {var}: {value:?} ({reason})")]
    InvalidDate {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("date filter start {start} is after end {end}")]
    InvertedRange { start: Date, end: Date },
    #[error("date filter needs both a start and an end")]
    IncompleteFilter,
    #[error("invalid {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
    #[error("{0} must be set when POSTGRES_HOST is set")]
    Missing(&'static str),
}

#[derive(Clone, PartialEq, Eq)]
pub struct PostgresTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

impl PostgresTarget {
    /// Connection string in libpq keyword/value format.
    pub fn dsn(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={}",
            libpq_quote(&self.host),
            self.port,
            libpq_quote(&self.user),
            libpq_quote(&self.password),
            libpq_quote(&self.dbname),
        )
    }
}

// Keep the password out of logs.
impl fmt::Debug for PostgresTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("dbname", &self.dbname)
            .finish()
    }
}

fn libpq_quote(value: &str) -> String {
    if !value.is_empty() && !value.contains([' ', '\'', '\\']) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Where the loader writes its tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    DuckDb { path: String },
    Postgres(PostgresTarget),
}

/// Process configuration, read once at startup and passed to both jobs.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub data_dir: String,
    pub date_filter: Option<DateFilter>,
    pub db: DbTarget,
    /// Bounds one whole export request, body included.
    pub request_timeout: Duration,
    /// Pause between two export requests.
    pub pause: Duration,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_vars(|key| env::var(key).ok())
    }

    /// Build the configuration from a variable lookup.  Empty values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_base = var("ELIA_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let data_dir = var("ELIA_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

        let start = parse_date("FILTER_START", var("FILTER_START"))?;
        let end = parse_date("FILTER_END", var("FILTER_END"))?;
        let date_filter = match (start, end) {
            (Some(start), Some(end)) => Some(DateFilter::new(start, end)?),
            (None, None) => None,
            _ => {
                warn!("Only one of FILTER_START/FILTER_END is set, fetching unfiltered");
                None
            }
        };

        let request_timeout = match var("ELIA_REQUEST_TIMEOUT_SECS") {
            Some(v) => match v.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "ELIA_REQUEST_TIMEOUT_SECS",
                        value: v,
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let db = match var("POSTGRES_HOST") {
            Some(host) => {
                let port = match var("POSTGRES_PORT") {
                    Some(p) => p.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                        var: "POSTGRES_PORT",
                        value: p.clone(),
                    })?,
                    None => DEFAULT_POSTGRES_PORT,
                };
                DbTarget::Postgres(PostgresTarget {
                    host,
                    port,
                    user: var("POSTGRES_USER").ok_or(ConfigError::Missing("POSTGRES_USER"))?,
                    password: var("POSTGRES_PASSWORD").unwrap_or_default(),
                    dbname: var("POSTGRES_DB").ok_or(ConfigError::Missing("POSTGRES_DB"))?,
                })
            }
            None => DbTarget::DuckDb {
                path: var("ELIA_DUCKDB_PATH").unwrap_or_else(|| {
                    Path::new(&data_dir)
                        .join("elia.duckdb")
                        .to_string_lossy()
                        .into_owned()
                }),
            },
        };

        Ok(Config {
            api_base,
            data_dir,
            date_filter,
            db,
            request_timeout,
            pause: Duration::from_secs(1),
        })
    }

    /// Apply command line overrides to the date filter.  A single bound is combined
    /// with the other bound of the configured filter.
    pub fn with_filter_overrides(
        mut self,
        start: Option<Date>,
        end: Option<Date>,
        no_filter: bool,
    ) -> Result<Config, ConfigError> {
        if no_filter {
            self.date_filter = None;
            return Ok(self);
        }
        let current = self.date_filter;
        self.date_filter = match (start, end) {
            (None, None) => current,
            (Some(start), Some(end)) => Some(DateFilter::new(start, end)?),
            (Some(start), None) => {
                let end = current.ok_or(ConfigError::IncompleteFilter)?.end;
                Some(DateFilter::new(start, end)?)
            }
            (None, Some(end)) => {
                let start = current.ok_or(ConfigError::IncompleteFilter)?.start;
                Some(DateFilter::new(start, end)?)
            }
        };
        Ok(self)
    }
}

fn parse_date(var: &'static str, value: Option<String>) -> Result<Option<Date>, ConfigError> {
    match value {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse::<Date>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidDate {
                var,
                value: v.clone(),
                reason: e.to_string(),
            }),
    }
}
