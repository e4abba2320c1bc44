//! Leveled diagnostic logging for the emulator workspace.
//!
//! The sink is process-global and set up once with [`init_logger`];
//! until then every log call is a no-op, which keeps unit tests quiet.
//! Messages carry the elapsed time since startup and one of four
//! severities. None of them ever aborts emulation: even `error` is just
//! a louder line on the sink.

use std::{
    fs::File,
    io::{self, Write},
    sync::Mutex,
    time::Instant,
};

use chrono::Utc;
use once_cell::sync::OnceCell;

static LOGGER: OnceCell<Logger> = OnceCell::new();

const RESET: &str = "\x1b[0m";

/// Message severity.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum Level {
    /// Ordinary progress chatter.
    Info,

    /// Worth spotting in a full trace: unimplemented hardware features
    /// that a game just asked for.
    Important,

    /// Suspicious accesses the hardware tolerates (unused memory,
    /// read-only registers).
    Warning,

    /// Emulation kept going but something is genuinely wrong.
    Error,
}

impl Level {
    const fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Important => "important",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    const fn color(self) -> &'static str {
        match self {
            Self::Info => "\x1b[37m",
            Self::Important => "\x1b[32m",
            Self::Warning => "\x1b[33m",
            Self::Error => "\x1b[31m",
        }
    }
}

struct LoggerImpl {
    pub sink: Box<dyn Write + Send>,
    pub start_instant: Instant,
    pub colored: bool,
}

impl LoggerImpl {
    fn new(kind: LogKind) -> Self {
        let start_instant = Instant::now();
        match kind {
            LogKind::STDOUT => Self {
                sink: Box::new(io::stdout()),
                start_instant,
                colored: true,
            },
            LogKind::FILE => {
                let now = Utc::now();
                let filename = format!("tangerine-{}.log", now.timestamp());
                let path = std::env::temp_dir().join(filename);
                Self {
                    sink: Box::new(File::create(path).unwrap()),
                    start_instant,
                    colored: false,
                }
            }
        }
    }

    fn log<T>(&mut self, level: Level, data: T)
    where
        T: std::fmt::Display,
    {
        let now = self.start_instant.elapsed();
        let seconds = now.as_secs();
        let hours = seconds / 3600;
        let minutes = (seconds / 60) % 60;
        let seconds = seconds % 60;
        let milliseconds = now.subsec_millis();

        let label = if self.colored {
            format!("{}{}{}", level.color(), level.label(), RESET)
        } else {
            level.label().to_string()
        };

        writeln!(
            self.sink,
            "[{hours:02}:{minutes:02}:{seconds:02}.{milliseconds:03}] [{label}] {data}"
        )
        .unwrap();
    }
}

/// `LogKind` represents the kind of logging: `stdout` or `logfile`.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum LogKind {
    /// It logs to console, the default choice.
    STDOUT,

    /// It logs on a file in /tmp/tangerine-<timestamp>.log
    FILE,
}

struct Logger {
    pub inner_impl: Mutex<LoggerImpl>,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            inner_impl: Mutex::new(LoggerImpl::new(LogKind::STDOUT)),
        }
    }
}

impl Logger {
    fn new(kind: LogKind) -> Self {
        Self {
            inner_impl: Mutex::new(LoggerImpl::new(kind)),
        }
    }

    fn log<T>(&self, level: Level, data: T)
    where
        T: std::fmt::Display,
    {
        if let Ok(ref mut inner) = self.inner_impl.lock() {
            inner.log(level, data);
        }
    }
}

pub fn init_logger(kind: LogKind) {
    LOGGER.set(Logger::new(kind)).ok();
}

fn dispatch<T>(level: Level, data: T)
where
    T: std::fmt::Display,
{
    LOGGER.get().map_or((), |logger| logger.log(level, data));
}

pub fn log<T>(data: T)
where
    T: std::fmt::Display,
{
    dispatch(Level::Info, data);
}

/// Same as [`log`] but colored so it is easy to spot in a full trace.
pub fn important<T>(data: T)
where
    T: std::fmt::Display,
{
    dispatch(Level::Important, data);
}

pub fn warning<T>(data: T)
where
    T: std::fmt::Display,
{
    dispatch(Level::Warning, data);
}

pub fn error<T>(data: T)
where
    T: std::fmt::Display,
{
    dispatch(Level::Error, data);
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::{init_logger, log, warning, LogKind};

    #[test]
    fn logger_file() {
        init_logger(LogKind::FILE);
        log("ok".to_string());
        warning("careful");
        let dir = std::env::temp_dir();
        let files = fs::read_dir(dir).unwrap();
        for f in files.flatten() {
            let p = f.path();
            if let Some(ext) = p.extension() {
                let s = p.to_str().unwrap();
                if ext == "log" && s.contains("tangerine") {
                    let s = fs::read_to_string(p.clone()).unwrap();
                    fs::remove_file(p).unwrap();
                    let mut lines = s.lines();
                    assert!(lines.next().unwrap().ends_with("[info] ok"));
                    assert!(lines.next().unwrap().ends_with("[warning] careful"));
                }
            }
        }
    }
}
