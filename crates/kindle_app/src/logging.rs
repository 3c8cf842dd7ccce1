//! Logger initialization for the service.
//!
//! Writes to the terminal, to `./engine.log` in the current working
//! directory, or both.

use std::fs::File;
use std::path::PathBuf;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogDestination {
    /// Write to ./engine.log in current directory.
    File,
    /// Write to terminal (stdout).
    #[default]
    Terminal,
    /// Write to both file and terminal.
    Both,
}

impl LogDestination {
    /// Parses `terminal`, `file` or `both`; anything else falls back to the terminal.
    pub fn from_setting(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("file") => LogDestination::File,
            Some("both") => LogDestination::Both,
            _ => LogDestination::Terminal,
        }
    }
}

/// Initialize the logger with the specified destination.
///
/// For `LogDestination::File` or `Both`, creates `./engine.log` in the
/// current working directory.
pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::File => match create_file_logger(level, config.clone()) {
            Some(file_logger) => vec![file_logger],
            // Keep the service observable when the log file cannot be created.
            None => vec![terminal_logger(level, config)],
        },
        LogDestination::Terminal => vec![terminal_logger(level, config)],
        LogDestination::Both => {
            let mut loggers: Vec<Box<dyn SharedLogger>> =
                vec![terminal_logger(level, config.clone())];
            if let Some(file_logger) = create_file_logger(level, config) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);
}

/// Level from a `LOG_LEVEL`-style value; `info` when absent or unknown.
pub fn level_from_setting(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn terminal_logger(level: LevelFilter, config: Config) -> Box<TermLogger> {
    TermLogger::new(level, config, TerminalMode::Mixed, ColorChoice::Auto)
}

fn create_file_logger(level: LevelFilter, config: Config) -> Option<Box<WriteLogger<File>>> {
    let log_path = PathBuf::from("./engine.log");
    match File::create(&log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{level_from_setting, LogDestination};
    use log::LevelFilter;

    #[test]
    fn destination_parsing_falls_back_to_terminal() {
        assert_eq!(LogDestination::from_setting(Some("Both")), LogDestination::Both);
        assert_eq!(LogDestination::from_setting(Some(" file ")), LogDestination::File);
        assert_eq!(LogDestination::from_setting(Some("syslog")), LogDestination::Terminal);
        assert_eq!(LogDestination::from_setting(None), LogDestination::Terminal);
    }

    #[test]
    fn level_parsing_defaults_to_info() {
        assert_eq!(level_from_setting(Some("debug")), LevelFilter::Debug);
        assert_eq!(level_from_setting(Some("loud")), LevelFilter::Info);
        assert_eq!(level_from_setting(None), LevelFilter::Info);
    }
}
