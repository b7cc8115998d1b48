use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{env_bool, env_string};

const LOG_FILE_PREFIX: &str = "langfeed.log";

/// Crates that stay quiet unless `RUST_LOG` names them explicitly
const NOISY_TARGETS: &[(&str, &str)] = &[
    ("tower_http", "info"),
    ("sqlx", "warn"),
    ("hyper", "warn"),
    ("redis", "warn"),
    ("reqwest", "warn"),
];

/// Keeps the non-blocking file writer flushing; hold it until shutdown.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    /// `RUST_LOG` value: a bare level or a full directive list
    pub level: String,
    /// Daily rolling file under this directory, when set
    pub file_dir: Option<PathBuf>,
    pub ansi: bool,
}

impl LogSettings {
    pub fn from_env(level: &str) -> Self {
        let file_dir = env_bool("ENABLE_FILE_LOGS")
            .unwrap_or(false)
            .then(|| PathBuf::from(env_string("LOG_DIR").unwrap_or_else(|| "./logs".to_string())));
        Self {
            level: level.to_string(),
            file_dir,
            ansi: !env_bool("NO_COLOR").unwrap_or(false),
        }
    }

    /// A bare level applies to this service's crates and leaves the
    /// dependency defaults in place; a directive list is used verbatim.
    pub fn filter_directives(&self) -> String {
        let level = self.level.trim();
        if level.is_empty() {
            return Self::service_directives("info");
        }
        if level.contains('=') || level.contains(',') {
            return level.to_string();
        }
        Self::service_directives(level)
    }

    fn service_directives(level: &str) -> String {
        let mut directives = vec![
            level.to_string(),
            format!("langfeed_backend={level}"),
            format!("langfeed_algo={level}"),
        ];
        directives.extend(
            NOISY_TARGETS
                .iter()
                .map(|(target, floor)| format!("{target}={floor}")),
        );
        directives.join(",")
    }
}

pub fn init_tracing(settings: &LogSettings) -> Option<FileLogGuard> {
    let directives = settings.filter_directives();
    let env_filter = EnvFilter::try_new(&directives).unwrap_or_else(|err| {
        eprintln!("invalid log filter {directives:?}: {err}, falling back to info");
        EnvFilter::new(LogSettings::service_directives("info"))
    });
    let stdout_layer = fmt::layer().with_target(true).with_ansi(settings.ansi);

    let (file_layer, guard) = match settings.file_dir.as_deref().map(open_log_dir) {
        Some(Ok(appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(FileLogGuard { _guard: guard }))
        }
        Some(Err(err)) => {
            eprintln!("file logging disabled: {err}");
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    tracing::info!(
        filter = %directives,
        file_dir = ?settings.file_dir,
        "logging initialized"
    );
    guard
}

fn open_log_dir(dir: &std::path::Path) -> std::io::Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)?;
    Ok(RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(level: &str) -> LogSettings {
        LogSettings {
            level: level.to_string(),
            file_dir: None,
            ansi: false,
        }
    }

    #[test]
    fn test_bare_level_scopes_service_crates() {
        let directives = settings("debug").filter_directives();
        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("langfeed_backend=debug"));
        assert!(directives.contains("langfeed_algo=debug"));
        assert!(directives.contains("sqlx=warn"));
        assert!(directives.contains("tower_http=info"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_directive_list_used_verbatim() {
        assert_eq!(
            settings("warn,langfeed_backend=trace").filter_directives(),
            "warn,langfeed_backend=trace"
        );
        assert_eq!(settings("sqlx=debug").filter_directives(), "sqlx=debug");
    }

    #[test]
    fn test_blank_level_defaults_to_info() {
        let directives = settings("  ").filter_directives();
        assert!(directives.starts_with("info,"));
        assert!(directives.contains("langfeed_backend=info"));
    }
}
