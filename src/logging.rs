use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config as LogConfig, Root},
    encode::pattern::PatternEncoder,
};

use crate::config::Config;
use crate::error::{Error, Result};

/// Pattern used by the fallback console logger.
const CONSOLE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {h({l:<5})} {t} - {m}{n}";

/// A unique identifier for a particular engine operation, used to correlate log lines.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct OperationId(pub usize);

impl Display for OperationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OperationId {
    /// Atomically get the next ID. This wraps around back to zero if you somehow exceed a usize.
    pub fn next() -> OperationId {
        static OPERATION_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);
        OperationId(OPERATION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Set up global logging.
///
/// Uses the log4rs file named by the config if it exists, otherwise logs to
/// the console at the configured level.
pub fn init(config: &Config) -> Result<()> {
    let path = config.log_config();
    if path.exists() {
        log4rs::init_file(path, log4rs_dynamic_filters::default_deserializers())
            .map_err(|e| Error::Logging(e.to_string()))?;
        info!("Initialised logging from {}", path.display());
    } else {
        log4rs::init_config(console_config(config.log_level())?)
            .map_err(|e| Error::Logging(e.to_string()))?;
        info!("Initialised console logging at level {}", config.log_level());
    }
    Ok(())
}

/// A console-only log4rs configuration at the given level.
fn console_config(level: LevelFilter) -> Result<LogConfig> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();
    LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .map_err(|e| Error::Logging(e.to_string()))
}
