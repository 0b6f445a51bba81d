use std::fs::create_dir_all;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Where console logs go, if anywhere besides the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Console {
    Stdout,
    Stderr,
}

impl Console {
    /// `LOG_TO_STDOUT` for command-line tools, whose stdout is their output.
    pub fn for_cli(log_to_stdout: bool) -> Option<Self> {
        log_to_stdout.then_some(Console::Stderr)
    }

    fn writer(self) -> BoxMakeWriter {
        match self {
            Console::Stdout => BoxMakeWriter::new(std::io::stdout),
            Console::Stderr => BoxMakeWriter::new(std::io::stderr),
        }
    }
}

/// Installs the global tracing subscriber.
///
/// Writes to a daily rolling file under `logs/` and, when `console` is set, to
/// that stream as well. `log_level` is an `EnvFilter` directive such as `info`
/// or `grader=debug,services=info`. Keep the returned guard alive for as long
/// as logs should be flushed.
pub fn init_logging(log_file: &str, log_level: &str, console: Option<Console>) -> WorkerGuard {
    let dir = Path::new("logs");
    if !dir.exists() {
        create_dir_all(dir).ok();
    }

    let file_appender = rolling::daily(dir, log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true);

    let console_layer = console.map(|target| {
        fmt::layer()
            .with_writer(target.writer())
            .with_ansi(true)
            .with_target(true)
    });

    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    // `try_init` so a second call (e.g. from tests) keeps the first subscriber.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .ok();

    guard
}
