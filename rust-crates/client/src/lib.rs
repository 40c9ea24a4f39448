//! Client application for the MXI platform: payment status polling,
//! balance chart data, the arena mini-game session and the web build's
//! cache policy. All authoritative state lives behind the gateway.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub mod balance;
pub mod cache;
pub mod chart;
pub mod poller;
pub mod reconcile;
pub mod session;
pub mod vesting;

/// Installs the tracing subscriber: `RUST_LOG`-filtered console output
/// plus a daily-rolled file under `logs/`. The returned guard must stay
/// alive for the file writer to flush.
pub fn init_tracing() -> WorkerGuard {
    let (file_writer, guard) = tracing_appender::non_blocking(
        tracing_appender::rolling::daily("logs", "mxi-client.log"),
    );
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .try_init();
    guard
}
