// Tue Jan 13 2026 - Alex

use colored::*;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::time::Instant;

const CRATE_PREFIX: &str = "rbx_remote::";

/// Installs the coloured stderr logger, or `env_logger` when `RUST_LOG` is set.
pub fn init(level: LevelFilter) {
    if std::env::var_os("RUST_LOG").is_some() {
        if env_logger::try_init().is_err() {
            log::debug!("logger already installed");
        }
        return;
    }
    if log::set_boxed_logger(Box::new(SessionLogger::new(level))).is_ok() {
        log::set_max_level(level);
    }
}

pub fn level_from_verbosity(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn level_from_str(s: &str) -> LevelFilter {
    match s.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

/// Coloured level tag, seconds since start and the module the record came from.
struct SessionLogger {
    level: LevelFilter,
    started: Instant,
}

impl SessionLogger {
    fn new(level: LevelFilter) -> Self {
        Self {
            level,
            started: Instant::now(),
        }
    }

    fn format_level(level: Level) -> ColoredString {
        match level {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN ".yellow().bold(),
            Level::Info => "INFO ".green().bold(),
            Level::Debug => "DEBUG".blue().bold(),
            Level::Trace => "TRACE".magenta().bold(),
        }
    }
}

fn short_target(target: &str) -> &str {
    target.strip_prefix(CRATE_PREFIX).unwrap_or(target)
}

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        eprintln!(
            "{} {} {} {}",
            format!("{:>8.3}", elapsed).dimmed(),
            Self::format_level(record.level()),
            format!("[{}]", short_target(record.target())).dimmed(),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// Logs how long a scope took at debug level.
pub struct ScopedTimer {
    name: &'static str,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        log::debug!("{} took {:.2}ms", self.name, self.start.elapsed().as_secs_f64() * 1000.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert_eq!(level_from_verbosity(0, false), LevelFilter::Info);
        assert_eq!(level_from_verbosity(2, false), LevelFilter::Trace);
        assert_eq!(level_from_verbosity(2, true), LevelFilter::Error);
        assert_eq!(level_from_str("Warning"), LevelFilter::Warn);
        assert_eq!(level_from_str("bogus"), LevelFilter::Info);
    }

    #[test]
    fn test_short_target() {
        assert_eq!(short_target("rbx_remote::sync::synchronizer"), "sync::synchronizer");
        assert_eq!(short_target("zstd"), "zstd");
    }
}
