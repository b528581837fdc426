//! Notification Output
//!
//! A [`Notifier`] is the backend the dispatcher posts notifications
//! to. The daemon ships [`JsonNotifier`], which writes one JSON object
//! per line so a supervising process can present them however it
//! likes, and [`RecordingNotifier`], which captures notifications in
//! memory for tests and embedding callers.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use ringfence_core::notification::Notification;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait Notifier: Send {
    fn notify(&mut self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications as newline-delimited JSON
pub struct JsonNotifier<W: Write + Send> {
    out: W,
}

impl JsonNotifier<io::Stdout> {
    pub fn stdout() -> Self {
        JsonNotifier { out: io::stdout() }
    }
}

impl<W: Write + Send> JsonNotifier<W> {
    pub fn new(out: W) -> Self {
        JsonNotifier { out }
    }
}

impl<W: Write + Send> Notifier for JsonNotifier<W> {
    fn notify(&mut self, notification: &Notification) -> Result<(), NotifyError> {
        serde_json::to_writer(&mut self.out, notification)?;
        self.out.write_all(b"\n")?;
        // Each notification must be visible as soon as it is posted
        self.out.flush()?;
        Ok(())
    }
}

/// Captures notifications in memory
///
/// Clones share the same buffer, so one clone can go to the dispatcher
/// while another stays behind to inspect what was posted.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        RecordingNotifier::default()
    }

    /// Everything posted so far, in posting order
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
