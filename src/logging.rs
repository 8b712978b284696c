//! Tracing configuration and log routing.
//!
//! Logs go to stdout through a compact formatter and to a file. When `LEXSUM_LOG_FILE` is set,
//! logs are appended to that path; otherwise they land in `logs/lexsum.log`. The file writer is
//! non-blocking so request handlers never wait on disk.
use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_ENV: &str = "LEXSUM_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "lexsum.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Configure tracing subscribers for stdout and file logging.
///
/// - Respects `RUST_LOG` for filtering (defaults to `info`).
/// - Installs a compact stdout layer and, when the file can be opened, a file layer.
/// - Keeps the non-blocking writer's guard alive for the process lifetime.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let target = log_file_target();
    if let Some(writer) = configure_file_writer(target.as_deref()) {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

fn log_file_target() -> Option<String> {
    std::env::var(LOG_FILE_ENV).ok()
}

/// Build a non-blocking writer for `explicit_path`, or the default log file when `None`.
///
/// Returns `None` when the directory cannot be created or the file cannot be opened.
fn configure_file_writer(explicit_path: Option<&str>) -> Option<NonBlocking> {
    let file = match explicit_path {
        Some(path) => open_append(Path::new(path)),
        None => open_append(&Path::new(DEFAULT_LOG_DIR).join(DEFAULT_LOG_FILE)),
    }?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let _ = LOG_GUARD.set(guard);
    Some(non_blocking)
}

fn open_append(path: &Path) -> Option<std::fs::File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        if let Err(err) = std::fs::create_dir_all(parent) {
            eprintln!("Failed to create log directory {}: {err}", parent.display());
            return None;
        }
    }
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
    {
        Ok(file) => Some(file),
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/run.log");
        assert!(open_append(&path).is_some());
        assert!(path.exists());
    }

    #[test]
    fn log_target_from_env_file_is_visible_to_tracing_setup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_path = dir.path().join("from-env-file.log");
        let env_path = dir.path().join(".env");
        std::fs::write(&env_path, format!("{LOG_FILE_ENV}={}\n", log_path.display()))
            .expect("env file");

        dotenvy::from_path(&env_path).expect("load env file");

        assert_eq!(log_file_target(), Some(log_path.display().to_string()));
    }

    #[test]
    fn unopenable_path_disables_file_logging() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A directory cannot be opened for appending.
        assert!(open_append(dir.path()).is_none());
    }
}
