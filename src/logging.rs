//! Process-wide tracing subscriber.
//!
//! Logs go to `<log_dir>/deepseek-redis.log`. `RUST_LOG` takes precedence
//! over the configured level when it is set.
use crate::config::Settings;
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "deepseek-redis.log";

#[derive(Debug, Diagnostic, Error)]
pub enum LoggingError {
  #[error("invalid log level {0:?}")]
  #[diagnostic(help("valid levels are trace, debug, info, warn and error"))]
  InvalidLevel(String),
  #[error("failed to create log directory {}", path.display())]
  #[diagnostic()]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("failed to open log file in {}", path.display())]
  #[diagnostic()]
  OpenFile {
    path: PathBuf,
    #[source]
    source: InitError,
  },
  #[error("a global tracing subscriber is already installed")]
  #[diagnostic()]
  AlreadyInitialized,
}

pub fn parse_level(level: &str) -> Result<Level, LoggingError> {
  match level.to_lowercase().as_str() {
    "trace" => Ok(Level::TRACE),
    "debug" => Ok(Level::DEBUG),
    "info" => Ok(Level::INFO),
    "warn" => Ok(Level::WARN),
    "error" => Ok(Level::ERROR),
    _ => Err(LoggingError::InvalidLevel(level.to_string())),
  }
}

/// `RUST_LOG` directives when present and valid, otherwise the configured level.
fn build_filter(level: Level, rust_log: Option<&str>) -> EnvFilter {
  rust_log
    .filter(|directives| !directives.trim().is_empty())
    .and_then(|directives| EnvFilter::try_new(directives).ok())
    .unwrap_or_else(|| EnvFilter::default().add_directive(LevelFilter::from_level(level).into()))
}

/// Installs the global subscriber.
///
/// The returned guard flushes buffered lines when dropped, keep it alive
/// for as long as the process should log.
pub fn init(settings: &Settings) -> Result<WorkerGuard, LoggingError> {
  let level = parse_level(&settings.log_level)?;

  std::fs::create_dir_all(&settings.log_dir).map_err(|source| LoggingError::CreateDir {
    path: settings.log_dir.clone(),
    source,
  })?;

  let appender = RollingFileAppender::builder()
    .rotation(Rotation::NEVER)
    .filename_prefix(LOG_FILE_NAME)
    .build(&settings.log_dir)
    .map_err(|source| LoggingError::OpenFile {
      path: settings.log_dir.clone(),
      source,
    })?;

  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = build_filter(level, std::env::var("RUST_LOG").ok().as_deref());

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .with_target(false)
    .try_init()
    .map_err(|_| LoggingError::AlreadyInitialized)?;

  Ok(guard)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn levels() {
    let tests = vec![
      ("trace", Level::TRACE),
      ("debug", Level::DEBUG),
      ("info", Level::INFO),
      ("INFO", Level::INFO),
      ("Warn", Level::WARN),
      ("error", Level::ERROR),
    ];

    for (input, expected) in tests {
      assert_eq!(expected, parse_level(input).unwrap());
    }
  }

  #[test]
  fn invalid_levels() {
    for input in ["", "warning", "critical", "verbose"] {
      assert!(matches!(
        parse_level(input),
        Err(LoggingError::InvalidLevel(level)) if level == input
      ));
    }
  }

  #[test]
  fn rust_log_overrides_configured_level() {
    let tests = vec![
      (Level::DEBUG, None, LevelFilter::DEBUG),
      (Level::DEBUG, Some(""), LevelFilter::DEBUG),
      (Level::DEBUG, Some("warn"), LevelFilter::WARN),
      (Level::INFO, Some("deepseek_redis=trace"), LevelFilter::TRACE),
      (Level::ERROR, Some("error"), LevelFilter::ERROR),
    ];

    for (level, rust_log, expected) in tests {
      assert_eq!(
        Some(expected),
        build_filter(level, rust_log).max_level_hint(),
        "{:?}",
        rust_log
      );
    }
  }

  #[test]
  fn init_errors() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("not-a-directory");
    std::fs::write(&file, b"").unwrap();

    let tests = vec![
      (dir.path().join("logs"), "loud", "InvalidLevel"),
      (file.join("logs"), "info", "CreateDir"),
    ];

    for (log_dir, log_level, expected) in tests {
      let settings = Settings {
        log_dir: log_dir.clone(),
        log_level: String::from(log_level),
        ..Settings::default()
      };

      let actual = match init(&settings) {
        Err(LoggingError::InvalidLevel(_)) => "InvalidLevel",
        Err(LoggingError::CreateDir { path, .. }) => {
          assert_eq!(log_dir, path);
          "CreateDir"
        }
        other => panic!("unexpected result for {:?}: {:?}", log_dir, other.map(|_| ())),
      };

      assert_eq!(expected, actual);
      assert!(!log_dir.exists());
    }
  }

  #[test]
  fn init_creates_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let log_dir = dir.path().join("nested").join("logs");

    let settings = Settings {
      log_dir: log_dir.clone(),
      ..Settings::default()
    };

    // Another test in this binary may have installed a subscriber already.
    match init(&settings) {
      Ok(_guard) => {}
      Err(LoggingError::AlreadyInitialized) => {}
      Err(error) => panic!("unexpected error: {:?}", error),
    }

    assert!(log_dir.join(LOG_FILE_NAME).exists());
  }
}
