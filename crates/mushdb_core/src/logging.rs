//! Process-wide logging bootstrap.
//!
//! # Responsibility
//! - Start one rolling file logger per process behind the `log` facade.
//! - Record panics as log events before the previous hook runs.
//!
//! # Invariants
//! - Repeating initialization with the same level and directory is a no-op.
//! - Initialization with a different level or directory is rejected, never
//!   silently applied.
//! - Log lines carry metadata only: refs, durations, statuses. Passwords and
//!   attribute contents are never logged.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, LogSpecification, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::path::PathBuf;

const LOG_FILE_BASENAME: &str = "mushdb";
const ROTATE_AT_BYTES: u64 = 8 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 4;
const MAX_FIELD_CHARS: usize = 200;

static LOGGER: OnceCell<FileLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

/// Settings a file logger was started with.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogTarget {
    level: LevelFilter,
    log_dir: PathBuf,
}

impl LogTarget {
    fn parse(level: &str, log_dir: &str) -> Result<Self, String> {
        Ok(Self {
            level: parse_level(level)?,
            log_dir: parse_log_dir(log_dir)?,
        })
    }

    fn conflict(&self, requested: &Self) -> Option<String> {
        if self == requested {
            return None;
        }
        Some(format!(
            "logging already active at {} in `{}`; refusing to switch to {} in `{}`",
            self.level,
            self.log_dir.display(),
            requested.level,
            requested.log_dir.display()
        ))
    }
}

struct FileLogger {
    target: LogTarget,
    _handle: LoggerHandle,
}

/// Starts file logging at `level` under the absolute directory `log_dir`.
///
/// # Errors
/// - `level` is not a `log` level name (`warning` is accepted for `warn`).
/// - `log_dir` is blank, relative, or cannot be created.
/// - Logging is already active with another level or directory.
/// - The logger backend fails to start.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let requested = LogTarget::parse(level, log_dir)?;
    let active = LOGGER.get_or_try_init(|| FileLogger::start(requested.clone()))?;
    match active.target.conflict(&requested) {
        Some(message) => Err(message),
        None => Ok(()),
    }
}

/// Active `(level, log_dir)`, or `None` before [`init_logging`] succeeds.
pub fn logging_status() -> Option<(LevelFilter, PathBuf)> {
    LOGGER
        .get()
        .map(|logger| (logger.target.level, logger.target.log_dir.clone()))
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

impl FileLogger {
    fn start(target: LogTarget) -> Result<Self, String> {
        std::fs::create_dir_all(&target.log_dir).map_err(|err| {
            format!(
                "cannot create log directory `{}`: {err}",
                target.log_dir.display()
            )
        })?;

        let spec = LogSpecification::builder().default(target.level).build();
        let handle = Logger::with(spec)
            .log_to_file(
                FileSpec::default()
                    .directory(&target.log_dir)
                    .basename(LOG_FILE_BASENAME),
            )
            .rotate(
                Criterion::Size(ROTATE_AT_BYTES),
                Naming::Numbers,
                Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .append()
            .format_for_files(flexi_logger::detailed_format)
            .start()
            .map_err(|err| format!("cannot start file logger: {err}"))?;

        install_panic_hook();
        info!(
            "event=logging_start module=core status=ok level={} log_dir={} version={}",
            target.level,
            target.log_dir.display(),
            env!("CARGO_PKG_VERSION")
        );

        Ok(Self {
            target,
            _handle: handle,
        })
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, String> {
    let normalized = level.trim().to_ascii_lowercase();
    let name = if normalized == "warning" {
        "warn"
    } else {
        normalized.as_str()
    };
    match name.parse::<LevelFilter>() {
        Ok(LevelFilter::Off) | Err(_) => Err(format!(
            "unsupported log level `{}`; expected trace|debug|info|warn|error",
            level.trim()
        )),
        Ok(filter) => Ok(filter),
    }
}

fn parse_log_dir(log_dir: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(log_dir.trim());
    if path.as_os_str().is_empty() {
        return Err("log_dir cannot be empty".to_string());
    }
    if !path.is_absolute() {
        return Err(format!(
            "log_dir must be an absolute path, got `{}`",
            path.display()
        ));
    }
    Ok(path)
}

fn install_panic_hook() {
    PANIC_HOOK.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let location = info.location().map_or_else(
                || "unknown".to_string(),
                |location| format!("{}:{}", location.file(), location.line()),
            );
            error!(
                "event=panic module=core status=error location={} payload={}",
                location,
                log_field(panic_message(info.payload()))
            );
            previous(info);
        }));
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Escapes control characters and caps the length of a free-form value.
fn log_field(value: &str) -> String {
    let mut field = String::new();
    for (index, ch) in value.chars().enumerate() {
        if index == MAX_FIELD_CHARS {
            field.push_str("...");
            break;
        }
        if ch.is_control() {
            field.extend(ch.escape_default());
        } else {
            field.push(ch);
        }
    }
    field
}
