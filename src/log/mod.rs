//! Process-wide logging configuration.
//!
//! Logging is diagnostic output about a run; it is not to be confused with _reporting_, which
//! writes the daily status and patient outcome tables. This module re-exports the five `log`
//! macros so model code can `use ward_sim::log::info;` and friends.
//!
//! The default level is `Warn`, which shows boarding warnings and fatal errors. The runner
//! raises it from `--log-level` or `-v` flags. The same settings can be applied from code:
//!
//! ```rust
//! use ward_sim::log::{apply_log_spec, LogSpec};
//!
//! // Info everywhere, but keep the event loop quiet.
//! let spec: LogSpec = "info,ward_sim::context=off".parse().unwrap();
//! apply_log_spec(&spec);
//! ```
mod standard_logger;

pub use log::{debug, error, info, trace, warn, LevelFilter};
use std::collections::hash_map::Entry;
use std::str::FromStr;

use crate::error::SimError;
use crate::hashing::HashMap;
use log4rs::Handle;
use std::sync::LazyLock;
use std::sync::{Mutex, MutexGuard};

pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Warn;

/// A global instance of the logging configuration.
static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(Mutex::default);

/// A level filter for all log targets under a module path, e.g. `"ward_sim::hospital"`.
#[derive(Debug, PartialEq)]
struct ModuleLogConfiguration {
    module: String,
    level: LevelFilter,
}

impl From<(&str, LevelFilter)> for ModuleLogConfiguration {
    fn from((module, level): (&str, LevelFilter)) -> Self {
        Self {
            module: module.to_string(),
            level,
        }
    }
}

/// Tracks the global level, the per-module filters and the handle to the installed logger.
///
/// Loggers are installed globally, so only the singleton behind `LOG_CONFIGURATION` exists. The
/// public API is a set of free functions that lock it.
#[derive(Debug)]
pub(in crate::log) struct LogConfiguration {
    /// Level for targets without a module filter. `LevelFilter::Off` disables logging.
    pub(in crate::log) global_log_level: LevelFilter,
    pub(in crate::log) module_configurations: HashMap<String, ModuleLogConfiguration>,
    root_handle: Option<Handle>,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        Self {
            global_log_level: DEFAULT_LOG_LEVEL,
            module_configurations: HashMap::default(),
            root_handle: None,
        }
    }
}

impl LogConfiguration {
    pub(in crate::log) fn set_log_level(&mut self, level: LevelFilter) {
        self.global_log_level = level;
        self.set_config();
    }

    /// Adds a filter for `module`, replacing any earlier level. Takes effect on the next
    /// `set_config`.
    fn insert_module_filter(&mut self, module: &str, level: LevelFilter) {
        match self.module_configurations.entry(module.to_string()) {
            Entry::Occupied(mut entry) => entry.get_mut().level = level,
            Entry::Vacant(entry) => {
                entry.insert((module, level).into());
            }
        }
    }
}

/// A parsed `--log-level` value: an optional global level plus per-module levels.
#[derive(Debug, Default, PartialEq)]
pub struct LogSpec {
    pub level: Option<LevelFilter>,
    pub module_filters: Vec<(String, LevelFilter)>,
}

impl FromStr for LogSpec {
    type Err = SimError;

    /// Accepts `info`, `ward_sim::hospital=debug` or a comma separated mix of both.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut spec = LogSpec::default();
        for item in s.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            match item.split_once('=') {
                Some((module, level)) => {
                    let level = parse_level(level)?;
                    spec.module_filters.push((module.trim().to_string(), level));
                }
                None => spec.level = Some(parse_level(item)?),
            }
        }
        Ok(spec)
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, SimError> {
    LevelFilter::from_str(level.trim())
        .map_err(|_| SimError::InvalidParameters(format!("unknown log level: {level}")))
}

/// Sets the global log level. A global filter level of `LevelFilter::Off` disables logging.
pub fn set_log_level(level: LevelFilter) {
    let mut log_configuration = get_log_configuration();
    log_configuration.set_log_level(level);
}

/// Applies a parsed [`LogSpec`], keeping the current global level if the spec has none.
pub fn apply_log_spec(spec: &LogSpec) {
    let mut log_configuration = get_log_configuration();
    for (module, level) in &spec.module_filters {
        log_configuration.insert_module_filter(module, *level);
    }
    let level = spec.level.unwrap_or(log_configuration.global_log_level);
    log_configuration.set_log_level(level);
}

fn get_log_configuration() -> MutexGuard<'static, LogConfiguration> {
    LOG_CONFIGURATION.lock().expect("Mutex poisoned")
}
