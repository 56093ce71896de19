use std::fs::{File, OpenOptions};
use std::io::Write;

use log::LevelFilter;

use crate::runtime::{Config, Error};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogLevel(pub LevelFilter);
impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" | "warning" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            "off" | "none" => LevelFilter::Off,
            _ => return Err(format!("Invalid log level: {}", s)),
        };
        Ok(LogLevel(level))
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        level.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogMode {
    Both,
    Path,
    Terminal,
    Discard,
}
impl std::str::FromStr for LogMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = match s.to_lowercase().as_str() {
            "both" => LogMode::Both,
            "path" | "file" => LogMode::Path,
            "terminal" | "term" | "cli" => LogMode::Terminal,
            "discard" | "none" => LogMode::Discard,
            _ => return Err(format!("Invalid log mode: {}", s)),
        };
        Ok(mode)
    }
}

///////////////////////////////
/// Writes every log line both to stderr and to the run log file
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        std::io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stderr().flush()?;
        self.file.flush()
    }
}

fn open_log_file(path: &std::path::Path) -> Result<File, Error> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::configuration(path, Some(format!("cannot open log file: {}", e))))
}

///////////////////////////////
/// Install the global logger. Can only succeed once per process
pub fn setup_global_logger(config: &Config) -> Result<(), Error> {
    let mode = config.effective_mode();

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(config.log_level.0)
        .format_timestamp_secs()
        .format_target(false);

    match (mode, &config.log_path) {
        (LogMode::Discard, _) => {
            builder.filter_level(LevelFilter::Off);
        }
        (LogMode::Terminal, _) => {
            builder.target(env_logger::Target::Stderr);
        }
        (LogMode::Path, Some(path)) => {
            let file = open_log_file(path)?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        (LogMode::Both, Some(path)) => {
            let file = open_log_file(path)?;
            builder.target(env_logger::Target::Pipe(Box::new(TeeWriter { file })));
        }
        (_, None) => {
            builder.target(env_logger::Target::Stderr);
        }
    }

    builder
        .try_init()
        .map_err(|e| Error::parse_error("logger setup", Some(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel(LevelFilter::Debug)));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel(LevelFilter::Warn)));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_mode_without_path_falls_back_to_terminal() {
        let config = Config {
            log_level: LogLevel(LevelFilter::Info),
            log_mode: LogMode::Both,
            log_path: None,
        };
        assert_eq!(config.effective_mode(), LogMode::Terminal);
    }
}
