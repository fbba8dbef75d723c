use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::config::{env_value, parse_bool};

static INIT: OnceCell<()> = OnceCell::new();

/// Where log lines go.
#[derive(Clone, Debug, PartialEq, Eq)]
enum LogSink {
    /// Compact lines on stderr; stdout carries the revealed chapter in the demo.
    Stderr,
    /// JSON lines appended to a file.
    JsonFile(PathBuf),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct LogSettings {
    enabled: bool,
    directive: Option<String>,
    sink: LogSink,
}

impl LogSettings {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            enabled: lookup("CHAPTER_STREAM_OBSERVABILITY")
                .and_then(|value| parse_bool(&value))
                .unwrap_or(true),
            directive: lookup("CHAPTER_STREAM_LOG_LEVEL"),
            sink: lookup("CHAPTER_STREAM_JSON_LOG_PATH")
                .map(|path| LogSink::JsonFile(PathBuf::from(path)))
                .unwrap_or(LogSink::Stderr),
        }
    }

    fn filter(&self) -> EnvFilter {
        self.directive
            .as_deref()
            .and_then(|directive| EnvFilter::try_new(directive).ok())
            .or_else(|| EnvFilter::try_from_default_env().ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    }
}

/// Installs the global tracing subscriber once per process.
///
/// Environment variables:
/// - `CHAPTER_STREAM_OBSERVABILITY`: `0`/`off` leaves tracing uninstalled.
/// - `CHAPTER_STREAM_LOG_LEVEL`: filter directive, takes precedence over `RUST_LOG`.
/// - `CHAPTER_STREAM_JSON_LOG_PATH`: write JSON lines to this file instead of stderr.
pub fn init_observability() {
    INIT.get_or_init(|| {
        let settings = LogSettings::from_lookup(env_value);
        if !settings.enabled {
            return;
        }
        let registry = tracing_subscriber::registry().with(settings.filter());
        let _ = match &settings.sink {
            LogSink::Stderr => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogSink::JsonFile(path) => {
                let dir = path
                    .parent()
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("."));
                let _ = std::fs::create_dir_all(&dir);
                let file_name = path
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("chapter-stream.jsonl"));
                registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_target(false)
                            .with_writer(tracing_appender::rolling::never(dir, file_name)),
                    )
                    .try_init()
            }
        };
    });
}
