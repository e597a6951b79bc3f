use std::path::PathBuf;

use logpipe_core::config::{LoggingConfig, WrapperPaths};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

/// Installs the diagnostics subscriber. The transcript does not go through it.
///
/// Nothing is installed unless a console or file sink is switched on, so a
/// plain wrapped run leaves no files behind besides its transcript.
pub fn init_tracing(logging: &LoggingConfig, paths: &WrapperPaths) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    if !logging.console && !logging.file {
        return Ok(());
    }

    let file_layer = if logging.file {
        let path = trace_file(logging, paths);
        let (dir, name) = match (path.parent(), path.file_name()) {
            (Some(dir), Some(name)) => (dir.to_path_buf(), name.to_os_string()),
            _ => return Err(format!("invalid trace file path: {}", path.display())),
        };
        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        // one file per wrapper, appended across runs
        let appender = tracing_appender::rolling::never(dir, name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
    } else {
        None
    };

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| e.to_string())
}

/// `<stem>.trace.log`, beside the transcript unless `directory` is set.
pub fn trace_file(logging: &LoggingConfig, paths: &WrapperPaths) -> PathBuf {
    let beside = paths.transcript.with_extension("trace.log");
    match logging
        .directory
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        Some(d) => match beside.file_name() {
            Some(name) => PathBuf::from(d).join(name),
            None => beside,
        },
        None => beside,
    }
}
