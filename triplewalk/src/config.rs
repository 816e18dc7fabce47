//! Process configuration.
//!
//! Everything is read from environment variables; unset variables take the
//! defaults below.
//!
//! # Environment Variables
//!
//! - `TRIPLEWALK_DATA_DIRECTORY`: store directory (default: `./data`)
//! - `TRIPLEWALK_LISTEN_PORT`: HTTP port (default: `8080`)
//! - `TRIPLEWALK_SERVE`: start the HTTP endpoint (default: `false`)
//! - `TRIPLEWALK_LOAD`: comma-separated triple files to load at startup
//! - `TRIPLEWALK_BATCH_SIZE`: triples per load batch (default: `1000`)
//! - `TRIPLEWALK_REPORT_INTERVAL`: triples between load reports (default: `100000`)
//! - `TRIPLEWALK_LANGUAGE`: accepted literal language tag (default: `en`)
//! - `TRIPLEWALK_WALK_BUFFER`: walk result channel capacity (default: `16`)
//! - `TRIPLEWALK_SYNC_WRITES`: sync the log after every write (default: `false`)
//! - `TRIPLEWALK_READ_ONLY`: open the store read-only (default: `false`)
//! - `TRIPLEWALK_INITIAL_COMPACTION`: compact the log at startup (default: `false`)
//! - `TRIPLEWALK_STATS`: include engine stats in load reports (default: `false`)
//!
//! # Invariants
//!
//! - `listen_port` is in 1-65535
//! - `batch_size`, `report_interval` and `walk_buffer` are at least 1

use std::path::PathBuf;

use crate::ingest::{LoadOptions, ParseOptions};
use crate::storage::EngineOptions;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Directory holding the store's log.
    pub data_directory: PathBuf,
    pub listen_port: u16,
    /// Serve HTTP queries after loading.
    pub serve: bool,
    /// Files loaded at startup, in order.
    pub load_files: Vec<PathBuf>,
    pub batch_size: usize,
    pub report_interval: u64,
    pub language: String,
    pub walk_buffer: usize,
    pub sync_writes: bool,
    pub read_only: bool,
    pub initial_compaction: bool,
    /// Log engine stats with each load report.
    pub engine_stats: bool,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self::InvalidValue { name, message } = self;
        write!(f, "invalid value for {name}: {message}")
    }
}

impl std::error::Error for ConfigError {}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_directory: PathBuf::from(Self::DEFAULT_DATA_DIRECTORY),
            listen_port: Self::DEFAULT_PORT,
            serve: false,
            load_files: Vec::new(),
            batch_size: crate::ingest::DEFAULT_BATCH_SIZE,
            report_interval: crate::ingest::DEFAULT_REPORT_INTERVAL,
            language: ParseOptions::default().language,
            walk_buffer: crate::storage::DEFAULT_WALK_BUFFER,
            sync_writes: false,
            read_only: false,
            initial_compaction: false,
            engine_stats: false,
        }
    }
}

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 8080;
    /// Default store directory.
    pub const DEFAULT_DATA_DIRECTORY: &'static str = "./data";

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value that does not parse
    /// or is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars { lookup };
        let defaults = Self::default();

        let listen_port = vars.parsed("TRIPLEWALK_LISTEN_PORT", defaults.listen_port)?;
        if listen_port == 0 {
            return Err(ConfigError::InvalidValue {
                name: "TRIPLEWALK_LISTEN_PORT".to_string(),
                message: "'0' is not a valid port number (must be 1-65535)".to_string(),
            });
        }

        let language = vars
            .get("TRIPLEWALK_LANGUAGE")
            .unwrap_or(defaults.language);

        Ok(Self {
            data_directory: vars
                .get("TRIPLEWALK_DATA_DIRECTORY")
                .map_or(defaults.data_directory, PathBuf::from),
            listen_port,
            serve: vars.flag("TRIPLEWALK_SERVE")?,
            load_files: vars
                .get("TRIPLEWALK_LOAD")
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(PathBuf::from)
                        .collect()
                })
                .unwrap_or_default(),
            batch_size: vars.positive("TRIPLEWALK_BATCH_SIZE", defaults.batch_size)?,
            report_interval: vars.positive("TRIPLEWALK_REPORT_INTERVAL", defaults.report_interval)?,
            language,
            walk_buffer: vars.positive("TRIPLEWALK_WALK_BUFFER", defaults.walk_buffer)?,
            sync_writes: vars.flag("TRIPLEWALK_SYNC_WRITES")?,
            read_only: vars.flag("TRIPLEWALK_READ_ONLY")?,
            initial_compaction: vars.flag("TRIPLEWALK_INITIAL_COMPACTION")?,
            engine_stats: vars.flag("TRIPLEWALK_STATS")?,
        })
    }

    /// Options for opening the store.
    #[must_use]
    pub const fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            create_if_missing: !self.read_only,
            read_only: self.read_only,
            sync_writes: self.sync_writes,
        }
    }

    /// Options for the bulk loader.
    #[must_use]
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            batch_size: self.batch_size,
            report_interval: self.report_interval,
            engine_stats: self.engine_stats,
            parse: ParseOptions {
                language: self.language.clone(),
            },
        }
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
    }

    fn parsed<T: std::str::FromStr>(&self, name: &str, default: T) -> Result<T, ConfigError> {
        match self.get(name) {
            Some(value) => value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                message: format!("'{value}' is not a valid number"),
            }),
            None => Ok(default),
        }
    }

    fn positive<T>(&self, name: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr + PartialOrd + From<u8>,
    {
        let value = self.parsed(name, default)?;
        if value < T::from(1) {
            return Err(ConfigError::InvalidValue {
                name: name.to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(value)
    }

    fn flag(&self, name: &str) -> Result<bool, ConfigError> {
        let Some(value) = self.get(name) else {
            return Ok(false);
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "" | "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                name: name.to_string(),
                message: format!("'{value}' is not a boolean"),
            }),
        }
    }
}
