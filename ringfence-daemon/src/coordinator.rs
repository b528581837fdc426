//! Zone Coordinator
//!
//! [`GeofenceCoordinator`] owns the [`ZoneRegistry`] and keeps the
//! platform in sync with it. Every zone command connects the platform
//! client if needed, mutates the registry, and then pushes the full
//! registry state: a non-empty registry is registered as one request
//! with the enter initial trigger, an empty one deregisters the
//! transition target. The registry is never rolled back when the
//! platform rejects a push, so a later reconnect can heal the
//! platform-side state.
//!
//! Location fixes share the command channel and are forwarded to the
//! platform in command order. While a registration push is waiting on
//! an in-flight connect they are held back and released right after
//! the push, so a fix never reaches the platform ahead of the zones
//! added before it.

use tokio::sync::mpsc;
use tokio_graceful_shutdown::SubsystemHandle;

use ringfence_core::geo::{Fix, LatLng};
use ringfence_core::registry::ZoneRegistry;
use ringfence_core::transition::TransitionEvent;

use crate::error::DaemonError;
use crate::platform::{
    InitialTrigger, MonitorRequest, PlatformClient, PlatformEvent, TransitionTarget,
};

/// Platform client connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and no attempt in flight
    Disconnected,
    /// Connect requested, waiting for the platform callback
    Connecting,
    /// Ready, registry pushes go straight to the platform
    Connected,
    /// Transiently lost; a reconnect is issued at once
    Suspended,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    AddZone { center: LatLng, radius: f32 },
    RemoveZonesAt { position: LatLng },
    Fix(Fix),
}

/// Cheap cloneable handle for submitting zone commands and fixes
#[derive(Clone)]
pub struct CoordinatorHandle {
    cmd_tx: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    #[cfg(test)]
    pub(crate) fn new(cmd_tx: mpsc::Sender<Command>) -> Self {
        CoordinatorHandle { cmd_tx }
    }

    pub async fn add_zone(&self, center: LatLng, radius: f32) -> Result<(), DaemonError> {
        self.cmd_tx
            .send(Command::AddZone { center, radius })
            .await
            .map_err(|_| DaemonError::CoordinatorClosed)
    }

    pub async fn remove_zones_at(&self, position: LatLng) -> Result<(), DaemonError> {
        self.cmd_tx
            .send(Command::RemoveZonesAt { position })
            .await
            .map_err(|_| DaemonError::CoordinatorClosed)
    }

    pub async fn report_fix(&self, fix: Fix) -> Result<(), DaemonError> {
        self.cmd_tx
            .send(Command::Fix(fix))
            .await
            .map_err(|_| DaemonError::CoordinatorClosed)
    }
}

pub struct GeofenceCoordinator {
    cmd_rx: mpsc::Receiver<Command>,
    events_rx: mpsc::UnboundedReceiver<PlatformEvent>,
    events_done: bool,
    platform: Box<dyn PlatformClient>,
    transitions_tx: mpsc::Sender<TransitionEvent>,
    registry: ZoneRegistry,
    state: ConnectionState,
    // Created on first registration, then reused for its lifetime so
    // deregistration matches by identity
    target: Option<TransitionTarget>,
    // Fixes held while a registration push waits on the connection
    pending_fixes: Vec<Fix>,
}

impl GeofenceCoordinator {
    pub fn new(
        platform: Box<dyn PlatformClient>,
        events_rx: mpsc::UnboundedReceiver<PlatformEvent>,
        transitions_tx: mpsc::Sender<TransitionEvent>,
    ) -> (GeofenceCoordinator, CoordinatorHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let coordinator = GeofenceCoordinator {
            cmd_rx,
            events_rx,
            events_done: false,
            platform,
            transitions_tx,
            registry: ZoneRegistry::new(),
            state: ConnectionState::Disconnected,
            target: None,
            pending_fixes: Vec::new(),
        };
        (coordinator, CoordinatorHandle { cmd_tx })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub async fn run(mut self, subsys: SubsystemHandle) -> Result<(), DaemonError> {
        log::debug!("coordinator: running");
        let mut commands_done = false;
        loop {
            tokio::select! {
                _ = subsys.on_shutdown_requested() => {
                    // Commands and callbacks queued before the
                    // shutdown still count
                    while let Ok(cmd) = self.cmd_rx.try_recv() {
                        self.handle_command(cmd);
                    }
                    while let Ok(event) = self.events_rx.try_recv() {
                        self.handle_event(event);
                    }
                    // Held fixes go out even when the connect callback
                    // never arrived
                    self.flush_fixes();
                    log::debug!("coordinator: shutdown");
                    return Ok(());
                },

                cmd = self.cmd_rx.recv(), if !commands_done => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd),
                        None => {
                            log::debug!("coordinator: command stream ended");
                            commands_done = true;
                        }
                    }
                },

                event = self.events_rx.recv(), if !self.events_done => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            log::debug!("coordinator: platform event stream ended");
                            self.events_done = true;
                        }
                    }
                },
            }
            // The daemon is done once the intent source is finished and
            // no registration push is still waiting on the connection
            if commands_done && self.settled() {
                // Fixes can still be held when the connection failed
                self.flush_fixes();
                log::debug!("coordinator: settled, requesting shutdown");
                subsys.request_shutdown();
                return Ok(());
            }
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        self.ensure_connecting();
        match cmd {
            Command::AddZone { center, radius } => match self.registry.add(center, radius) {
                Ok(id) => {
                    log::info!(
                        "coordinator: added zone {} at {} with radius {} m",
                        id,
                        center,
                        radius
                    );
                }
                Err(e) => {
                    log::error!("coordinator: {}", e);
                    return;
                }
            },
            Command::RemoveZonesAt { position } => {
                let removed = self.registry.delete_containing(position);
                log::info!("coordinator: removed {} zones containing {}", removed, position);
            }
            Command::Fix(fix) => {
                // A fix must not reach the platform ahead of the
                // registration for zones added before it
                if self.state == ConnectionState::Connected {
                    self.platform.report_fix(fix);
                } else {
                    self.pending_fixes.push(fix);
                }
                return;
            }
        }
        self.reconcile();
    }

    fn handle_event(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::Connected => {
                log::info!("coordinator: platform connected");
                self.state = ConnectionState::Connected;
                // Re-push pending intent, or clear a registration left
                // on the platform from before the connection was lost
                if !self.registry.is_empty() || self.target.is_some() {
                    self.reconcile();
                }
                // Zones first, then the fixes that arrived behind them
                self.flush_fixes();
            }
            PlatformEvent::Suspended { cause } => {
                log::warn!("coordinator: platform connection suspended, cause {}", cause);
                self.state = ConnectionState::Suspended;
                self.ensure_connecting();
            }
            PlatformEvent::ConnectionFailed { code } => {
                log::error!("coordinator: platform connection failed, code {}", code);
                self.state = ConnectionState::Disconnected;
            }
            PlatformEvent::OperationResult(status) => {
                if status.is_success() {
                    log::debug!("coordinator: platform operation completed");
                } else {
                    log::error!("coordinator: platform operation failed, {}", status);
                }
            }
        }
    }

    /// True when no registration push can still be outstanding
    ///
    /// Connecting means a Connected callback is on its way and will
    /// push the registry; Disconnected means the connection failed and
    /// nothing further will happen.
    fn settled(&self) -> bool {
        self.registry.is_empty()
            || matches!(
                self.state,
                ConnectionState::Connected | ConnectionState::Disconnected
            )
    }

    fn ensure_connecting(&mut self) {
        if matches!(
            self.state,
            ConnectionState::Disconnected | ConnectionState::Suspended
        ) {
            log::debug!("coordinator: connecting platform client");
            self.state = ConnectionState::Connecting;
            self.platform.connect();
        }
    }

    /// Forward fixes held back while a registration push was pending
    fn flush_fixes(&mut self) {
        for fix in std::mem::take(&mut self.pending_fixes) {
            self.platform.report_fix(fix);
        }
    }

    /// Push the registry state to the platform
    fn reconcile(&mut self) {
        if self.state != ConnectionState::Connected {
            log::error!("coordinator: platform client is not connected");
            return;
        }
        if self.registry.is_empty() {
            if let Some(target) = &self.target {
                log::debug!("coordinator: registry empty, deregistering target {}", target.id());
                if let Err(e) = self.platform.deregister(target) {
                    log::error!("coordinator: deregister failed: {}", e);
                }
            }
            return;
        }
        let target = self
            .target
            .get_or_insert_with(|| TransitionTarget::new(self.transitions_tx.clone()))
            .clone();
        let request = MonitorRequest {
            zones: self.registry.snapshot(),
            initial_trigger: InitialTrigger::Enter,
        };
        log::debug!("coordinator: registering {} zones", request.zones.len());
        if let Err(e) = self.platform.register(request, &target) {
            log::error!("coordinator: register failed: {}", e);
        }
    }
}
