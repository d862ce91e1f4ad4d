//! Settings consumed at process start.
//!
//! Values come from three places, later ones win: the built-in defaults,
//! the config file and the command-line flags that were given explicitly.
//!
//! The config file is line oriented:
//!
//! ```terminal
//! # comments start with a hash
//! model deepseek-reasoner
//! shardnum 256
//! ```
use clap::Parser;
use miette::{Diagnostic, SourceSpan};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_CONF_FILE: &str = "./deepseek.conf";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_LOG_DIR: &str = "./";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_SHARD_NUM: usize = 1024;
pub const DEFAULT_CHAN_BUFFER_SIZE: usize = 10;

#[derive(Debug, Diagnostic, Error)]
pub enum ConfigError {
  #[error("failed to read config file {}", path.display())]
  #[diagnostic()]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("invalid value {value:?} for {key}")]
  #[diagnostic()]
  InvalidValue {
    key: String,
    value: String,
    #[source_code]
    src: String,
    #[label("{}", reason)]
    span: SourceSpan,
    reason: String,
  },
  #[error("invalid value {value:?} for --{flag}: {reason}")]
  #[diagnostic()]
  InvalidFlag {
    flag: &'static str,
    value: String,
    reason: String,
  },
}

/// Command-line flags. Every flag is optional so that an absent flag
/// never overrides the config file.
#[derive(Parser, Debug, Default)]
#[command(name = "deepseek-redis")]
#[command(version)]
#[command(about = "RESP front end for the DeepSeek chat API", long_about = None)]
pub struct CliArgs {
  /// Config file, such as /etc/deepseek.conf
  #[arg(long)]
  pub config: Option<PathBuf>,

  /// Model type: deepseek-chat or deepseek-reasoner
  #[arg(long)]
  pub model: Option<String>,

  /// DeepSeek API url
  #[arg(long)]
  pub url: Option<String>,

  /// API key used to authenticate against the API
  #[arg(long)]
  pub api_key: Option<String>,

  /// Directory the log file is written to
  #[arg(long)]
  pub logdir: Option<String>,

  /// Log level (trace, debug, info, warn, error)
  #[arg(long)]
  pub loglevel: Option<String>,

  /// Number of key-space shards
  #[arg(long)]
  pub shard_num: Option<String>,

  /// Buffer size of the channels used by PUB/SUB commands
  #[arg(long)]
  pub chan_buf_size: Option<String>,
}

impl CliArgs {
  /// Pairs of (flag, config file key, value) for every flag that was given.
  fn overrides(&self) -> Vec<(&'static str, &'static str, &str)> {
    [
      ("model", "model", &self.model),
      ("url", "url", &self.url),
      ("api-key", "apikey", &self.api_key),
      ("logdir", "logdir", &self.logdir),
      ("loglevel", "loglevel", &self.loglevel),
      ("shard-num", "shardnum", &self.shard_num),
      ("chan-buf-size", "chanbuffersize", &self.chan_buf_size),
    ]
    .into_iter()
    .filter_map(|(flag, key, value)| value.as_deref().map(|value| (flag, key, value)))
    .collect()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
  pub conf_file: PathBuf,
  /// False when the default config file did not exist and only defaults and flags apply.
  pub conf_file_loaded: bool,
  pub model: String,
  pub url: String,
  pub api_key: String,
  pub log_dir: PathBuf,
  pub log_level: String,
  pub shard_num: usize,
  pub chan_buffer_size: usize,
  /// Keys the server does not know about, lower-cased.
  pub others: HashMap<String, String>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      conf_file: PathBuf::from(DEFAULT_CONF_FILE),
      conf_file_loaded: false,
      model: String::from(DEFAULT_MODEL),
      url: String::from(DEFAULT_URL),
      api_key: String::new(),
      log_dir: PathBuf::from(DEFAULT_LOG_DIR),
      log_level: String::from(DEFAULT_LOG_LEVEL),
      shard_num: DEFAULT_SHARD_NUM,
      chan_buffer_size: DEFAULT_CHAN_BUFFER_SIZE,
      others: HashMap::new(),
    }
  }
}

impl Settings {
  /// Parses the process arguments and loads the config file they point at.
  pub fn load() -> Result<Self, ConfigError> {
    Self::from_args(CliArgs::parse())
  }

  pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
    let mut settings = Settings::default();

    let explicit = args.config.is_some();
    if let Some(path) = &args.config {
      settings.conf_file = path.clone();
    }

    match std::fs::read_to_string(&settings.conf_file) {
      Ok(contents) => {
        settings.apply_file(&contents)?;
        settings.conf_file_loaded = true;
      }
      // Only a file somebody asked for has to exist.
      Err(error) if !explicit && error.kind() == std::io::ErrorKind::NotFound => {}
      Err(source) => {
        return Err(ConfigError::Read {
          path: settings.conf_file,
          source,
        })
      }
    }

    for (flag, key, value) in args.overrides() {
      settings
        .set(key, value)
        .map_err(|reason| ConfigError::InvalidFlag {
          flag,
          value: value.to_string(),
          reason,
        })?;
    }

    Ok(settings)
  }

  /// Applies every `key value` line of a config file.
  pub fn apply_file(&mut self, contents: &str) -> Result<(), ConfigError> {
    for line in contents.lines() {
      if line.starts_with('#') {
        continue;
      }

      let mut fields = line.split_whitespace();

      let (key, value) = match (fields.next(), fields.next()) {
        (Some(key), Some(value)) => (key, value),
        _ => continue,
      };

      if let Err(reason) = self.set(&key.to_lowercase(), value) {
        // `value` borrows from `contents`, so its address gives the offset.
        let offset = value.as_ptr() as usize - contents.as_ptr() as usize;

        return Err(ConfigError::InvalidValue {
          key: key.to_string(),
          value: value.to_string(),
          src: contents.to_string(),
          span: (offset, value.len()).into(),
          reason,
        });
      }
    }

    Ok(())
  }

  /// Sets a single setting by its lower-case config file key.
  ///
  /// Returns the reason the value was rejected.
  fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
    match key {
      "model" => self.model = value.to_string(),
      "url" => {
        url::Url::parse(value).map_err(|error| format!("expected an absolute url, {}", error))?;
        self.url = value.to_string();
      }
      "apikey" => self.api_key = value.to_string(),
      "logdir" => self.log_dir = PathBuf::from(value),
      "loglevel" => self.log_level = value.to_lowercase(),
      "shardnum" => self.shard_num = positive(value)?,
      "chanbuffersize" => self.chan_buffer_size = positive(value)?,
      _ => {
        self.others.insert(key.to_string(), value.to_string());
      }
    }

    Ok(())
  }

  /// The API key with everything but its first four characters masked, for logs.
  pub fn redacted_api_key(&self) -> String {
    match self.api_key.char_indices().nth(4) {
      _ if self.api_key.is_empty() => String::new(),
      None => String::from("****"),
      Some((end, _)) => format!("{}****", &self.api_key[..end]),
    }
  }
}

fn positive(value: &str) -> Result<usize, String> {
  match value.parse::<usize>() {
    Ok(n) if n > 0 => Ok(n),
    _ => Err(String::from("expected a positive integer")),
  }
}
