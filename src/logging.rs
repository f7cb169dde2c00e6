//! Log configuration and subscriber setup.
//!
//! Two loggers are configured: the `core` one covers this crate (including
//! the `"<type> Initialize"` notices) and the `client` one covers everything
//! else. A configuration file looks like:
//!
//! ```json
//! {
//!    "core": { "log_level": "debug" },
//!    "client": { "log_level": "warn" },
//!    "with_file": true,
//!    "with_line_number": true
//! }
//! ```
//!
//! Every field is optional.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Tracing target used for the core logger.
pub const CORE_TARGET: &str = env!("CARGO_CRATE_NAME");

#[derive(Debug, Error)]
pub enum LogConfigError {
   #[error("could not read log config {path}: {source}")]
   Io {
      path: String,
      #[source]
      source: std::io::Error,
   },
   #[error("invalid log config: {0}")]
   Parse(#[from] serde_json::Error),
}

/// Verbosity of one logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
   Trace,
   Debug,
   #[default]
   Info,
   Warn,
   Error,
}

impl LogLevel {
   /// Parses a level name, falling back to `Info` (with a warning) for
   /// names it does not know.
   pub fn parse_or_default(name: &str) -> Self {
      name.parse().unwrap_or_else(|_| {
         tracing::warn!("Unknown log level: {name}, using default 'info'");
         Self::Info
      })
   }

   fn as_directive(self) -> &'static str {
      match self {
         Self::Trace => "trace",
         Self::Debug => "debug",
         Self::Info => "info",
         Self::Warn => "warn",
         Self::Error => "error",
      }
   }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level: {0}")]
pub struct UnknownLevel(pub String);

impl FromStr for LogLevel {
   type Err = UnknownLevel;

   fn from_str(s: &str) -> Result<Self, Self::Err> {
      match s.trim().to_ascii_lowercase().as_str() {
         "trace" => Ok(Self::Trace),
         "debug" => Ok(Self::Debug),
         "info" => Ok(Self::Info),
         "warn" | "warning" => Ok(Self::Warn),
         // tracing has nothing above error
         "error" | "critical" => Ok(Self::Error),
         _ => Err(UnknownLevel(s.to_owned())),
      }
   }
}

impl fmt::Display for LogLevel {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_directive())
   }
}

/// Settings of one logger.
///
/// Only `log_level` is used. The `log_pattern`, `log_file`, `log_file_size`
/// and `log_file_count` keys of existing config files are accepted and
/// ignored: output always goes to stdout in the fmt subscriber's format.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
   #[serde(rename = "log_level")]
   pub level: String,
}

impl Default for LoggerConfig {
   fn default() -> Self {
      Self {
         level: LogLevel::Info.to_string(),
      }
   }
}

impl LoggerConfig {
   /// The configured level, `Info` if the name is unknown. Does not log;
   /// [`setup_log`] reports unknown names once a subscriber exists.
   pub fn level(&self) -> LogLevel {
      self.level.parse().unwrap_or_default()
   }

   fn is_known(&self) -> bool {
      self.level.parse::<LogLevel>().is_ok()
   }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
   pub core: LoggerConfig,
   pub client: LoggerConfig,
   pub with_file: bool,
   pub with_line_number: bool,
}

impl LogConfig {
   pub fn from_json_str(json: &str) -> Result<Self, LogConfigError> {
      Ok(serde_json::from_str(json)?)
   }

   pub fn load(path: impl AsRef<Path>) -> Result<Self, LogConfigError> {
      let path = path.as_ref();
      let json = std::fs::read_to_string(path).map_err(|source| LogConfigError::Io {
         path: path.display().to_string(),
         source,
      })?;
      Self::from_json_str(&json)
   }

   /// `EnvFilter` directives: the client level as the default, the core
   /// level for this crate.
   pub fn filter_directives(&self) -> String {
      format!(
         "{},{CORE_TARGET}={}",
         self.client.level(),
         self.core.level()
      )
   }

   /// Level names that [`filter_directives`](Self::filter_directives)
   /// replaced with `info`, core first.
   pub fn unknown_levels(&self) -> Vec<&str> {
      [&self.core, &self.client]
         .into_iter()
         .filter(|logger| !logger.is_known())
         .map(|logger| logger.level.as_str())
         .collect()
   }
}

/// Installs a global fmt subscriber for `config`.
///
/// `RUST_LOG` takes precedence over the configured levels when set. Calling
/// this again after a subscriber is installed does nothing. Unknown level
/// names are warned about through the new subscriber.
pub fn setup_log(config: &LogConfig) {
   let filter = EnvFilter::try_from_default_env()
      .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

   let _ = SubscriberBuilder::default()
      .with_file(config.with_file)
      .with_line_number(config.with_line_number)
      .with_span_events(FmtSpan::NONE)
      .with_env_filter(filter)
      .finish()
      .try_init();

   warn_unknown_levels(config);
}

fn warn_unknown_levels(config: &LogConfig) {
   for name in config.unknown_levels() {
      tracing::warn!("Unknown log level: {name}, using default 'info'");
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_defaults() {
      let config = LogConfig::from_json_str("{}").unwrap();
      assert_eq!(config, LogConfig::default());
      assert_eq!(config.core.level(), LogLevel::Info);
      assert!(!config.with_file);
   }

   #[test]
   fn test_levels_from_json() {
      let config = LogConfig::from_json_str(
         r#"{ "core": { "log_level": "debug" }, "client": { "log_level": "critical" }, "with_line_number": true }"#,
      )
      .unwrap();
      assert_eq!(config.core.level(), LogLevel::Debug);
      assert_eq!(config.client.level(), LogLevel::Error);
      assert!(config.with_line_number);
      assert_eq!(
         config.filter_directives(),
         format!("error,{CORE_TARGET}=debug")
      );
   }

   #[test]
   fn test_unknown_level_falls_back_to_info() {
      assert_eq!("verbose".parse::<LogLevel>(), Err(UnknownLevel("verbose".into())));
      assert_eq!(LogLevel::parse_or_default("verbose"), LogLevel::Info);
      assert_eq!(LogLevel::parse_or_default(" WARN "), LogLevel::Warn);
   }

   #[derive(Clone, Default)]
   struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

   impl std::io::Write for Captured {
      fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
         self.0.lock().unwrap().extend_from_slice(buf);
         Ok(buf.len())
      }

      fn flush(&mut self) -> std::io::Result<()> {
         Ok(())
      }
   }

   impl Captured {
      fn text(&self) -> String {
         String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
      }
   }

   #[test]
   fn test_unknown_levels_are_reported_to_the_subscriber() {
      let config = LogConfig::from_json_str(
         r#"{ "core": { "log_level": "verbose" }, "client": { "log_level": "loud" } }"#,
      )
      .unwrap();
      assert_eq!(config.unknown_levels(), vec!["verbose", "loud"]);
      assert!(LogConfig::default().unknown_levels().is_empty());

      let captured = Captured::default();
      let writer = captured.clone();
      let subscriber = SubscriberBuilder::default()
         .with_writer(move || writer.clone())
         .with_ansi(false)
         .finish();

      tracing::subscriber::with_default(subscriber, || {
         // Resolving levels is silent; only the report after install warns.
         assert_eq!(
            config.filter_directives(),
            format!("info,{CORE_TARGET}=info")
         );
         assert!(captured.text().is_empty());

         warn_unknown_levels(&config);
      });

      let text = captured.text();
      assert!(text.contains("Unknown log level: verbose, using default 'info'"), "{text}");
      assert!(text.contains("Unknown log level: loud, using default 'info'"), "{text}");
      assert_eq!(text.matches("WARN").count(), 2, "{text}");
   }

   #[test]
   fn test_ignored_logger_keys_are_accepted() {
      let config = LogConfig::from_json_str(
         r#"{
            "core": {
               "log_level": "warn",
               "log_pattern": "%^[%T] %n: %v%$",
               "log_file": "logs/core.log",
               "log_file_size": 5242880,
               "log_file_count": 3
            },
            "client": { "log_level": "debug", "log_file": "logs/client.log" }
         }"#,
      )
      .unwrap();
      assert_eq!(config.core.level(), LogLevel::Warn);
      assert_eq!(config.client.level(), LogLevel::Debug);
      assert!(config.unknown_levels().is_empty());
   }

   #[test]
   fn test_malformed_json() {
      let err = LogConfig::from_json_str("{ core: }").unwrap_err();
      assert!(matches!(err, LogConfigError::Parse(_)));
   }

   #[test]
   fn test_load_from_file() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("log.json");
      std::fs::write(&path, r#"{ "client": { "log_level": "trace" } }"#).unwrap();

      let config = LogConfig::load(&path).unwrap();
      assert_eq!(config.client.level(), LogLevel::Trace);
      assert_eq!(config.core.level(), LogLevel::Info);

      let missing = LogConfig::load(dir.path().join("absent.json")).unwrap_err();
      assert!(matches!(missing, LogConfigError::Io { .. }));
   }
}
