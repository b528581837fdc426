//! Transition Dispatcher
//!
//! Consumes transition reports delivered to the registered target and
//! turns them into user notifications. Failed reports are logged and
//! dropped, transitions the daemon does not watch are ignored.

use tokio::sync::mpsc;
use tokio_graceful_shutdown::SubsystemHandle;

use ringfence_core::transition::{notification_for, TransitionEvent};

use crate::error::DaemonError;
use crate::notifier::Notifier;

pub struct TransitionDispatcher {
    transitions_rx: mpsc::Receiver<TransitionEvent>,
    notifier: Box<dyn Notifier>,
}

impl TransitionDispatcher {
    pub fn new(
        transitions_rx: mpsc::Receiver<TransitionEvent>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        TransitionDispatcher {
            transitions_rx,
            notifier,
        }
    }

    pub async fn run(mut self, subsys: SubsystemHandle) -> Result<(), DaemonError> {
        log::debug!("dispatcher: running");
        loop {
            tokio::select! {
                _ = subsys.on_shutdown_requested() => {
                    break;
                },

                event = self.transitions_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            log::debug!("dispatcher: transition stream ended");
                            return Ok(());
                        }
                    }
                },
            }
        }
        // Reports delivered while the rest of the daemon winds down
        // are still dispatched; the stream closes once the monitor and
        // coordinator have stopped.
        while let Some(event) = self.transitions_rx.recv().await {
            self.handle_event(event);
        }
        log::debug!("dispatcher: shutdown");
        Ok(())
    }

    fn handle_event(&mut self, event: TransitionEvent) {
        if let Some(code) = event.error {
            log::error!("dispatcher: transition report failed, code {}", code);
            return;
        }
        let Some(notification) = notification_for(&event) else {
            log::trace!("dispatcher: ignoring transition kind {}", event.kind);
            return;
        };
        log::info!("dispatcher: {} at {}", notification.title, event.location);
        if let Err(e) = self.notifier.notify(&notification) {
            log::error!("dispatcher: failed to post notification: {}", e);
        }
    }
}
