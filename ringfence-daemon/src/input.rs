//! Intent Input
//!
//! Reads line-delimited JSON from a file or stdin and turns each line
//! into a coordinator command. Fixes go through the coordinator too,
//! so zones and the fixes that follow them reach the platform in input
//! order. Blank lines and lines starting with `#` are skipped,
//! malformed lines are logged and skipped. The daemon shuts down once
//! the input ends.
//!
//! ```json
//! {"event": "add", "lat": 52.52, "lng": 13.405, "radius": 250.0}
//! {"event": "remove", "lat": 52.52, "lng": 13.405}
//! {"event": "fix", "lat": 52.521, "lng": 13.405, "accuracy": 12.0}
//! ```

use serde::Deserialize;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_graceful_shutdown::SubsystemHandle;

use ringfence_core::geo::{Fix, LatLng};

use crate::coordinator::CoordinatorHandle;
use crate::error::DaemonError;

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum InputEvent {
    Add {
        lat: f64,
        lng: f64,
        radius: Option<f32>,
    },
    Remove {
        lat: f64,
        lng: f64,
    },
    Fix {
        lat: f64,
        lng: f64,
        accuracy: Option<f32>,
    },
}

pub struct IntentReader {
    input: Option<PathBuf>,
    default_radius: f32,
    coordinator: CoordinatorHandle,
}

impl IntentReader {
    pub fn new(input: Option<PathBuf>, default_radius: f32, coordinator: CoordinatorHandle) -> Self {
        IntentReader {
            input,
            default_radius,
            coordinator,
        }
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), DaemonError> {
        let reader: Box<dyn AsyncBufRead + Send + Unpin> = match &self.input {
            Some(path) => {
                log::info!("intents: reading from {}", path.display());
                Box::new(BufReader::new(File::open(path).await?))
            }
            None => {
                log::info!("intents: reading from stdin");
                Box::new(BufReader::new(tokio::io::stdin()))
            }
        };
        let mut lines = reader.lines();
        loop {
            tokio::select! {
                _ = subsys.on_shutdown_requested() => {
                    log::debug!("intents: shutdown");
                    return Ok(());
                },

                line = lines.next_line() => {
                    match line? {
                        Some(line) => self.process_line(&line).await?,
                        None => {
                            log::info!("intents: input ended");
                            return Ok(());
                        }
                    }
                },
            }
        }
    }

    async fn process_line(&self, line: &str) -> Result<(), DaemonError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }
        match serde_json::from_str(line) {
            Ok(event) => self.dispatch(event).await,
            Err(e) => {
                log::warn!("intents: skipping malformed line: {}", e);
                Ok(())
            }
        }
    }

    async fn dispatch(&self, event: InputEvent) -> Result<(), DaemonError> {
        match event {
            InputEvent::Add { lat, lng, radius } => {
                let radius = radius.unwrap_or(self.default_radius);
                self.coordinator.add_zone(LatLng::new(lat, lng), radius).await
            }
            InputEvent::Remove { lat, lng } => {
                self.coordinator.remove_zones_at(LatLng::new(lat, lng)).await
            }
            InputEvent::Fix { lat, lng, accuracy } => {
                let position = LatLng::new(lat, lng);
                let fix = match accuracy {
                    Some(accuracy) => Fix::with_accuracy(position, accuracy),
                    None => Fix::new(position),
                };
                self.coordinator.report_fix(fix).await
            }
        }
    }
}
