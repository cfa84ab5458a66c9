// In: src/observability.rs

//! Logging setup and diagnostics hooks for the pipeline workers.
//!
//! Workers report through the `log` facade only; nothing is printed unless the
//! host application installs a logger. `init_logging` installs the library's
//! own terse `env_logger` setup for binaries and tests that want one.
//!
//! The `stage_metric!` macro is a zero-cost abstraction: the
//! `#[cfg(debug_assertions)]` attribute compiles it out of release builds.

use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;
use std::sync::Once;

use colored::Colorize;
use log::{Level, LevelFilter};

use crate::config::MonitoringConfig;
use crate::error::{PipelineError, Result};

/// Logs a structured key-value metric record at `debug` level, only in debug builds.
///
/// # Example
/// ```
/// use stagepipe::stage_metric;
/// let processed = 4;
/// stage_metric!("event"="stage_drained", "stage"="resize", "processed"=&processed);
/// ```
#[macro_export]
macro_rules! stage_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        #[cfg(debug_assertions)]
        {
            // Collect each pair as a JSON string fragment
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+
            $crate::__log::debug!("STAGEPIPE_METRIC: {{ {} }}", parts.join(", "));
        }
    };
}

static INIT_LOGGER: Once = Once::new();

/// Installs a global `env_logger` at `level`, writing to stderr or appending to
/// `log_file`. Only the first successful call has any effect.
pub fn init_logging(level: LevelFilter, log_file: Option<&str>) -> Result<()> {
    if INIT_LOGGER.is_completed() {
        return Ok(());
    }

    let file = match log_file {
        Some(path) => Some(OpenOptions::new().append(true).create(true).open(path)?),
        None => None,
    };
    let use_color = file.is_none();

    INIT_LOGGER.call_once(move || {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(level);

        // Custom formatter: just print the level and message
        builder.format(move |buf, record| {
            if use_color {
                writeln!(buf, "[{}] {}", paint(record.level()), record.args())?;
            } else {
                writeln!(buf, "[{}] {}", record.level(), record.args())?;
            }
            buf.flush()?;
            Ok(())
        });

        if let Some(file) = file {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });
    Ok(())
}

/// Applies the `monitoring` section of a pipeline config.
pub fn init_from_config(monitoring: &MonitoringConfig) -> Result<()> {
    let level = match monitoring.log_level.as_deref() {
        Some(raw) => LevelFilter::from_str(raw)
            .map_err(|_| PipelineError::InvalidConfig(format!("unknown log level '{}'", raw)))?,
        None => LevelFilter::Info,
    };
    init_logging(level, monitoring.log_file.as_deref())
}

fn paint(level: Level) -> colored::ColoredString {
    let label = level.as_str();
    match level {
        Level::Error => label.red(),
        Level::Warn => label.yellow(),
        Level::Info => label.green(),
        Level::Debug => label.blue(),
        Level::Trace => label.dimmed(),
    }
}
