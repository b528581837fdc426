use clap::Parser;
use std::time::Duration;
use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};

use ringfence_daemon::cli::Args;

#[tokio::main]
async fn main() -> miette::Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    log::info!("ringfence-daemon {} starting", env!("CARGO_PKG_VERSION"));

    Toplevel::new(move |s| async move {
        s.start(SubsystemBuilder::new("ringfence", |s| {
            ringfence_daemon::run(s, args)
        }));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_millis(1000))
    .await
    .map_err(Into::into)
}
