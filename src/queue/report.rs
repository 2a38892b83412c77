use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, error, Subscriber};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{filter::filter_fn, registry::LookupSpan, Layer};

/// Tracing target failure records are emitted under.
pub const FAILURE_TARGET: &str = "vidqueue::failures";

/// Receives progress while the queue is draining.
pub trait ProgressReporter: Send + Sync {
    /// `current` is 1-based within the running drain.
    fn report(&self, current: usize, total: usize, status: &str);
}

/// Receives one message per failed item.
pub trait FailureLog: Send + Sync {
    fn error(&self, message: &str);
}

pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn report(&self, current: usize, total: usize, status: &str) {
        debug!("[{}/{}] {}", current, total, status);
    }
}

/// Emits failures as events on [`FAILURE_TARGET`]. Pair it with
/// [`failure_file_layer`] to get them into a file.
pub struct TracingFailureLog;

impl FailureLog for TracingFailureLog {
    fn error(&self, message: &str) {
        error!(target: FAILURE_TARGET, "{}", message);
    }
}

/// Builds a layer that appends [`FAILURE_TARGET`] events to `path` and
/// ignores everything else. Writes go through a background worker that
/// stops once the returned guard is dropped.
pub fn failure_file_layer<S>(path: &Path) -> Result<(impl Layer<S>, WorkerGuard)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let file_name = path
        .file_name()
        .with_context(|| format!("Invalid failure log path {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .with_context(|| format!("Failed to open failure log {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_filter(filter_fn(|metadata| metadata.target() == FAILURE_TARGET));

    Ok((layer, guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::info;
    use tracing_subscriber::{layer::SubscriberExt, Registry};

    #[test]
    fn test_failure_file_layer_writes_only_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failures.log");
        let (layer, guard) = failure_file_layer::<Registry>(&path).unwrap();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            TracingFailureLog.error("Failed to download a: boom");
            info!("Processing download queue");
            TracingFailureLog.error("Failed to download b: bang");
        });
        drop(guard);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2, "{contents}");
        assert!(lines[0].ends_with("Failed to download a: boom"));
        assert!(lines[1].ends_with("Failed to download b: bang"));
        assert!(!contents.contains("Processing download queue"));
    }

    #[test]
    fn test_failure_file_layer_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("failures.log");
        let (layer, guard) = failure_file_layer::<Registry>(&path).unwrap();

        tracing::subscriber::with_default(tracing_subscriber::registry().with(layer), || {
            TracingFailureLog.error("Failed to download c: gone");
        });
        drop(guard);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Failed to download c: gone"));
    }

    #[test]
    fn test_failure_file_layer_rejects_directory_path() {
        assert!(failure_file_layer::<Registry>(Path::new("/")).is_err());
    }
}
