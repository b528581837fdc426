//! Ringfence Daemon
//!
//! The async runtime around [`ringfence_core`]. Four subsystems wired
//! together by channels:
//!
//! - [`input::IntentReader`] parses zone intents and location fixes
//!   from a file or stdin
//! - [`coordinator::GeofenceCoordinator`] owns the zone registry,
//!   keeps the platform registration in sync with it, and forwards
//!   fixes behind the registrations that precede them
//! - [`platform::monitor::LocalMonitor`] implements the platform seam
//!   in-process and reports zone transitions
//! - [`dispatcher::TransitionDispatcher`] turns transition reports
//!   into notifications
//!
//! ```rust,ignore
//! let args = cli::Args::parse();
//! Toplevel::new(move |s| async move {
//!     s.start(SubsystemBuilder::new("ringfence", |s| ringfence_daemon::run(s, args)));
//! })
//! .catch_signals()
//! .handle_shutdown_requests(Duration::from_millis(1000))
//! .await?;
//! ```

pub mod cli;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod input;
pub mod notifier;
pub mod platform;

use tokio::sync::mpsc;
use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle};

use crate::coordinator::GeofenceCoordinator;
use crate::dispatcher::TransitionDispatcher;
use crate::input::IntentReader;
use crate::notifier::{JsonNotifier, Notifier};
use crate::platform::monitor::LocalMonitor;

pub use error::DaemonError;

/// Transition reports buffered between the platform and the dispatcher
const TRANSITION_QUEUE: usize = 64;

/// Wire up and start all daemon subsystems, notifying on stdout
pub async fn run(subsys: SubsystemHandle, args: cli::Args) -> Result<(), DaemonError> {
    run_with_notifier(subsys, args, Box::new(JsonNotifier::stdout())).await
}

/// Same wiring with a caller-chosen notification backend
pub async fn run_with_notifier(
    subsys: SubsystemHandle,
    args: cli::Args,
    notifier: Box<dyn Notifier>,
) -> Result<(), DaemonError> {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (transitions_tx, transitions_rx) = mpsc::channel(TRANSITION_QUEUE);

    let (monitor, client) = LocalMonitor::new(events_tx, !args.deny_location);
    let (coordinator, handle) =
        GeofenceCoordinator::new(Box::new(client), events_rx, transitions_tx);
    let dispatcher = TransitionDispatcher::new(transitions_rx, notifier);
    // The reader takes the only coordinator handle; once the input
    // ends and the reader stops, the coordinator winds the daemon down
    let reader = IntentReader::new(args.input, args.radius, handle);

    subsys.start(SubsystemBuilder::new("monitor", |s| monitor.run(s)));
    subsys.start(SubsystemBuilder::new("coordinator", |s| coordinator.run(s)));
    subsys.start(SubsystemBuilder::new("dispatcher", |s| dispatcher.run(s)));
    subsys.start(SubsystemBuilder::new("intents", |s| reader.run(s)));

    subsys.on_shutdown_requested().await;
    Ok(())
}
