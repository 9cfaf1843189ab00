//! Tracing setup for report runs.
//!
//! Report tables go to stdout; diagnostics go to a daily-rolled file under
//! the XDG state directory (`~/.local/state/cohortscope/`) so scheduled runs
//! leave an inspectable trail without polluting the output.

use crate::config::{Config, LoggingConfig};
use crate::report::PeriodScope;
use chrono::NaiveDate;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Flushes buffered log writes when dropped; hold it for the life of the run.
pub struct LoggingGuard {
    _worker: WorkerGuard,
}

/// Install the global subscriber for a report run.
///
/// The configured level applies unless `RUST_LOG` overrides it.
pub fn init(config: &LoggingConfig) -> crate::error::Result<LoggingGuard> {
    let state_dir = Config::state_dir();
    std::fs::create_dir_all(&state_dir)?;

    let (writer, worker) =
        tracing_appender::non_blocking(rolling::daily(&state_dir, "cohortscope.log"));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .init();

    tracing::debug!(log_dir = %state_dir.display(), "logging ready");
    Ok(LoggingGuard { _worker: worker })
}

/// Span wrapping one report run; pipeline stages log under it, so one file
/// can hold interleaved daily and weekly runs and stay attributable.
pub fn report_span(scope: PeriodScope, report_date: NaiveDate) -> tracing::Span {
    tracing::info_span!("report_run", scope = scope.as_str(), date = %report_date)
}

/// Capture logs in the test harness output instead of a file.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
