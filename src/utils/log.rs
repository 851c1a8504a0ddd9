//! Simple leveled logging with per-component identifiers.

use std::fmt::Display;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Log level for filtering messages.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Trace => write!(f, "TRACE"),
            Level::Debug => write!(f, "DEBUG"),
            Level::Info => write!(f, "INFO"),
            Level::Warn => write!(f, "WARN"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

/// Sets the process-wide minimum level.
pub fn init(level: Level) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

#[inline]
fn enabled(level: Level) -> bool {
    level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

fn emit(level: Level, id: &str, message: &str) {
    if enabled(level) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        eprintln!(
            "{}.{:03} [{:5}] [{}] {}",
            now.as_secs(),
            now.subsec_millis(),
            level,
            id,
            message
        );
    }
}

/// Logger instance carrying a component identifier.
///
/// Cloning is cheap; every message is prefixed with the id so interleaved
/// output from the pool and the cache stays attributable.
#[derive(Clone)]
pub struct Logger {
    id: Arc<str>,
}

impl Logger {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self { id: id.into() }
    }

    pub fn trace(&self, message: &str) {
        emit(Level::Trace, &self.id, message);
    }

    pub fn debug(&self, message: &str) {
        emit(Level::Debug, &self.id, message);
    }

    pub fn info(&self, message: &str) {
        emit(Level::Info, &self.id, message);
    }

    pub fn warn(&self, message: &str) {
        emit(Level::Warn, &self.id, message);
    }

    pub fn error(&self, message: &str) {
        emit(Level::Error, &self.id, message);
    }
}
