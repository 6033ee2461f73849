use crate::config::LoggingConfig;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_rolling_file::{RollingConditionBase, RollingFileAppender};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

const DEFAULT_LOG_SIZE_MB: u64 = 10;
const DEFAULT_MAX_FILES: usize = 5;

/// Guard wrapper that ensures logs are flushed on drop
pub struct LogGuard(Option<WorkerGuard>);

impl Drop for LogGuard {
    fn drop(&mut self) {
        if let Some(guard) = self.0.take() {
            // Dropping the worker guard flushes pending lines
            drop(guard);
            std::thread::sleep(std::time::Duration::from_millis(200));
        }
    }
}

fn parse_level(level: Option<&str>) -> Level {
    match level.map(str::to_lowercase).as_deref() {
        Some("trace") => Level::TRACE,
        Some("debug") => Level::DEBUG,
        Some("warn") | Some("warning") => Level::WARN,
        Some("error") => Level::ERROR,
        // INFO for missing or unknown levels
        _ => Level::INFO,
    }
}

/// Initialize logging to console and, when a log path is configured, to a size-rolled file
///
/// `verbose` raises the console level to DEBUG regardless of the configured level.
/// Returns a LogGuard that must be kept alive for the duration of the program.
pub fn init_logging(
    config: Option<&LoggingConfig>,
    verbose: bool,
) -> Result<LogGuard, anyhow::Error> {
    let level = parse_level(config.and_then(|c| c.level.as_deref()));
    let console_level = if verbose { Level::DEBUG } else { level };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_filter(LevelFilter::from_level(console_level));

    let file_path = config.and_then(|c| c.path.as_deref().map(|path| (c, path)));
    let Some((config, path)) = file_path else {
        tracing_subscriber::registry().with(console_layer).init();
        return Ok(LogGuard(None));
    };

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let size_mb = config.size.unwrap_or(DEFAULT_LOG_SIZE_MB);
    let file_appender = RollingFileAppender::new(
        path,
        RollingConditionBase::new().max_size(size_mb * 1024 * 1024),
        config.max_files.unwrap_or(DEFAULT_MAX_FILES),
    )
    .map_err(|e| anyhow::anyhow!("Failed to create rolling file appender: {}", e))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(LevelFilter::from_level(level)),
        )
        .init();

    Ok(LogGuard(Some(guard)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_levels_fall_back_to_info() {
        assert_eq!(parse_level(None), Level::INFO);
        assert_eq!(parse_level(Some("loud")), Level::INFO);
        assert_eq!(parse_level(Some("DEBUG")), Level::DEBUG);
        assert_eq!(parse_level(Some("warning")), Level::WARN);
    }
}
