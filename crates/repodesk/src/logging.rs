//! Tracing setup for the command line.
//!
//! Events go to stderr, filtered by `REPODESK_LOG` or, when that is unset, by
//! the `-q`/`-v` flags. With `debug = true` in the settings, everything at
//! debug level and above is also written to a daily-rotated log file.

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;

use crate::args::GlobalArgs;

const LOG_ENV: &str = "REPODESK_LOG";

/// Install the global subscriber. The returned guard flushes the log file on
/// drop and must live until the process exits.
pub fn init_tracing(args: &GlobalArgs, debug: bool) -> Option<WorkerGuard> {
    let stderr_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level(args)));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(stderr_filter);

    let (file_layer, guard) = if debug {
        let dir = log_dir();
        let file_appender = tracing_appender::rolling::daily(&dir, "repodesk.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(EnvFilter::new("debug"));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    Registry::default()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

fn default_level(args: &GlobalArgs) -> &'static str {
    if args.quiet {
        return "off";
    }
    match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn log_dir() -> Utf8PathBuf {
    ProjectDirs::from("dev", "repodesk", "repodesk")
        .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.cache_dir().to_path_buf()).ok())
        .or_else(|| Utf8PathBuf::from_path_buf(std::env::temp_dir()).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("."))
}
