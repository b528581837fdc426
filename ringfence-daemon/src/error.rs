//! Daemon-level errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("coordinator is no longer running")]
    CoordinatorClosed,
}
