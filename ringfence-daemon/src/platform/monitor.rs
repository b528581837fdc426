//! In-Process Geofencing Facility
//!
//! [`LocalMonitor`] implements the platform seam without an external
//! service: it consumes location fixes injected through its client,
//! tracks which registered zones currently contain the device, and
//! delivers enter and exit transitions to the registered target. It
//! follows the platform contract: registration replaces the whole zone
//! set, an empty set cannot be registered, and the enter initial
//! trigger reports zones the device is already inside. Fixes share the
//! control channel with registrations, so a fix is evaluated against
//! the zone set in effect when it was injected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_graceful_shutdown::SubsystemHandle;

use ringfence_core::geo::Fix;
use ringfence_core::transition::{TransitionEvent, TransitionKind};
use ringfence_core::zone::{TransitionMask, Zone};

use crate::error::DaemonError;

use super::{
    InitialTrigger, MonitorRequest, PlatformClient, PlatformError, PlatformEvent, Status,
    TransitionTarget,
};

enum MonitorCtrl {
    Connect,
    Suspend { cause: i32 },
    Register {
        request: MonitorRequest,
        target: TransitionTarget,
    },
    Deregister { target_id: u64 },
    Fix(Fix),
}

/// Client half: implements [`PlatformClient`] for the coordinator
pub struct MonitorClient {
    ctrl_tx: mpsc::UnboundedSender<MonitorCtrl>,
    connected: Arc<AtomicBool>,
    permission_granted: bool,
}

impl MonitorClient {
    /// Simulate a platform-side connection suspension
    pub fn suspend(&self, cause: i32) {
        let _ = self.ctrl_tx.send(MonitorCtrl::Suspend { cause });
    }
}

impl PlatformClient for MonitorClient {
    fn connect(&mut self) {
        let _ = self.ctrl_tx.send(MonitorCtrl::Connect);
    }

    fn register(
        &mut self,
        request: MonitorRequest,
        target: &TransitionTarget,
    ) -> Result<(), PlatformError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(PlatformError::NotConnected);
        }
        if request.zones.is_empty() {
            return Err(PlatformError::EmptyRegistration);
        }
        if !self.permission_granted {
            return Err(PlatformError::PermissionDenied);
        }
        self.ctrl_tx
            .send(MonitorCtrl::Register {
                request,
                target: target.clone(),
            })
            .map_err(|_| PlatformError::NotConnected)
    }

    fn deregister(&mut self, target: &TransitionTarget) -> Result<(), PlatformError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(PlatformError::NotConnected);
        }
        self.ctrl_tx
            .send(MonitorCtrl::Deregister {
                target_id: target.id(),
            })
            .map_err(|_| PlatformError::NotConnected)
    }

    fn report_fix(&mut self, fix: Fix) {
        let _ = self.ctrl_tx.send(MonitorCtrl::Fix(fix));
    }
}

struct WatchedZone {
    zone: Zone,
    // None until the first containment determination for this zone
    inside: Option<bool>,
}

struct WatchSet {
    target: TransitionTarget,
    initial_trigger: InitialTrigger,
    zones: Vec<WatchedZone>,
}

/// Task half: owns the watch state and consumes fixes
pub struct LocalMonitor {
    ctrl_rx: mpsc::UnboundedReceiver<MonitorCtrl>,
    events_tx: mpsc::UnboundedSender<PlatformEvent>,
    connected: Arc<AtomicBool>,
    watch: Option<WatchSet>,
    last_fix: Option<Fix>,
}

impl LocalMonitor {
    /// Create the monitor task and its client handle
    pub fn new(
        events_tx: mpsc::UnboundedSender<PlatformEvent>,
        permission_granted: bool,
    ) -> (LocalMonitor, MonitorClient) {
        let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));
        let monitor = LocalMonitor {
            ctrl_rx,
            events_tx,
            connected: connected.clone(),
            watch: None,
            last_fix: None,
        };
        let client = MonitorClient {
            ctrl_tx,
            connected,
            permission_granted,
        };
        (monitor, client)
    }

    pub async fn run(mut self, subsys: SubsystemHandle) -> Result<(), DaemonError> {
        log::debug!("monitor: running");
        loop {
            tokio::select! {
                _ = subsys.on_shutdown_requested() => {
                    // Control traffic queued before the shutdown still
                    // counts; the channel keeps fixes behind the
                    // registrations that precede them
                    while let Ok(ctrl) = self.ctrl_rx.try_recv() {
                        self.handle_ctrl(ctrl);
                    }
                    log::debug!("monitor: shutdown");
                    return Ok(());
                },

                ctrl = self.ctrl_rx.recv() => {
                    match ctrl {
                        Some(ctrl) => self.handle_ctrl(ctrl),
                        None => {
                            log::debug!("monitor: client gone");
                            return Ok(());
                        }
                    }
                },
            }
        }
    }

    fn handle_ctrl(&mut self, ctrl: MonitorCtrl) {
        match ctrl {
            MonitorCtrl::Connect => {
                self.connected.store(true, Ordering::Release);
                log::debug!("monitor: connected");
                self.emit(PlatformEvent::Connected);
            }
            MonitorCtrl::Suspend { cause } => {
                self.connected.store(false, Ordering::Release);
                log::debug!("monitor: suspended, cause {}", cause);
                self.emit(PlatformEvent::Suspended { cause });
            }
            MonitorCtrl::Register { request, target } => {
                log::debug!(
                    "monitor: watching {} zones for target {}",
                    request.zones.len(),
                    target.id()
                );
                let mut watch = WatchSet {
                    target,
                    initial_trigger: request.initial_trigger,
                    zones: request
                        .zones
                        .into_iter()
                        .map(|zone| WatchedZone { zone, inside: None })
                        .collect(),
                };
                // The initial trigger fires against the last known fix
                if let Some(fix) = self.last_fix {
                    Self::evaluate(&mut watch, fix);
                }
                self.watch = Some(watch);
                self.emit(PlatformEvent::OperationResult(Status::success()));
            }
            MonitorCtrl::Deregister { target_id } => {
                match &self.watch {
                    Some(watch) if watch.target.id() == target_id => {
                        log::debug!("monitor: target {} deregistered", target_id);
                        self.watch = None;
                    }
                    _ => {
                        log::debug!("monitor: deregister for unknown target {}", target_id);
                    }
                }
                self.emit(PlatformEvent::OperationResult(Status::success()));
            }
            MonitorCtrl::Fix(fix) => self.handle_fix(fix),
        }
    }

    fn handle_fix(&mut self, fix: Fix) {
        log::trace!("monitor: fix {}", fix);
        self.last_fix = Some(fix);
        if let Some(watch) = &mut self.watch {
            Self::evaluate(watch, fix);
        }
    }

    fn emit(&self, event: PlatformEvent) {
        if self.events_tx.send(event).is_err() {
            log::debug!("monitor: event listener gone");
        }
    }

    /// Update per-zone containment and deliver crossings
    ///
    /// A zone with no prior determination adopts the current state
    /// silently, except that the enter initial trigger reports zones
    /// the device is already inside.
    fn evaluate(watch: &mut WatchSet, fix: Fix) {
        for watched in &mut watch.zones {
            let now_inside = watched.zone.contains(fix.position);
            let kind = match (watched.inside, now_inside) {
                (None, true) if watch.initial_trigger == InitialTrigger::Enter => {
                    Some(TransitionKind::Enter)
                }
                (Some(false), true) => Some(TransitionKind::Enter),
                (Some(true), false) => Some(TransitionKind::Exit),
                _ => None,
            };
            watched.inside = Some(now_inside);

            let Some(kind) = kind else {
                continue;
            };
            let wanted = match kind {
                TransitionKind::Enter => TransitionMask::ENTER,
                TransitionKind::Exit => TransitionMask::EXIT,
            };
            if !watched.zone.transitions.contains(wanted) {
                continue;
            }
            log::debug!("monitor: zone {} {:?} at {}", watched.zone.id, kind, fix);
            if !watch.target.deliver(TransitionEvent::new(kind, fix)) {
                log::warn!("monitor: transition dropped, target queue full or gone");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringfence_core::geo::LatLng;
    use ringfence_core::zone::ZoneId;

    const INSIDE: LatLng = LatLng {
        lat: 50.001,
        lng: 30.0,
    };
    const OUTSIDE: LatLng = LatLng {
        lat: 50.01,
        lng: 30.0,
    };

    struct Rig {
        monitor: LocalMonitor,
        client: MonitorClient,
        transitions_rx: mpsc::Receiver<TransitionEvent>,
        events_rx: mpsc::UnboundedReceiver<PlatformEvent>,
        target: TransitionTarget,
    }

    fn rig(permission_granted: bool) -> Rig {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (monitor, client) = LocalMonitor::new(events_tx, permission_granted);
        let (transitions_tx, transitions_rx) = mpsc::channel(8);
        let target = TransitionTarget::new(transitions_tx);
        Rig {
            monitor,
            client,
            transitions_rx,
            events_rx,
            target,
        }
    }

    // Drains queued control messages into the task half, like the run
    // loop would
    fn pump(rig: &mut Rig) {
        while let Ok(ctrl) = rig.monitor.ctrl_rx.try_recv() {
            rig.monitor.handle_ctrl(ctrl);
        }
    }

    fn zone() -> Zone {
        Zone::new(ZoneId(1), LatLng::new(50.0, 30.0), 500.0)
    }

    fn request(trigger: InitialTrigger) -> MonitorRequest {
        MonitorRequest {
            zones: vec![zone()],
            initial_trigger: trigger,
        }
    }

    fn kinds(rx: &mut mpsc::Receiver<TransitionEvent>) -> Vec<Option<TransitionKind>> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(TransitionKind::from_code(event.kind));
        }
        out
    }

    #[test]
    fn test_register_requires_connection() {
        let mut rig = rig(true);
        let target = rig.target.clone();
        let err = rig
            .client
            .register(request(InitialTrigger::Enter), &target)
            .unwrap_err();
        assert_eq!(err, PlatformError::NotConnected);
    }

    #[test]
    fn test_register_rejects_empty_set() {
        let mut rig = rig(true);
        rig.client.connect();
        pump(&mut rig);
        let target = rig.target.clone();
        let err = rig
            .client
            .register(
                MonitorRequest {
                    zones: Vec::new(),
                    initial_trigger: InitialTrigger::Enter,
                },
                &target,
            )
            .unwrap_err();
        assert_eq!(err, PlatformError::EmptyRegistration);
    }

    #[test]
    fn test_register_without_permission() {
        let mut rig = rig(false);
        rig.client.connect();
        pump(&mut rig);
        let target = rig.target.clone();
        let err = rig
            .client
            .register(request(InitialTrigger::Enter), &target)
            .unwrap_err();
        assert_eq!(err, PlatformError::PermissionDenied);
    }

    #[test]
    fn test_crossings_deliver_enter_then_exit() {
        let mut rig = rig(true);
        rig.client.connect();
        pump(&mut rig);
        let target = rig.target.clone();
        rig.client
            .register(request(InitialTrigger::Enter), &target)
            .unwrap();
        pump(&mut rig);

        rig.monitor.handle_fix(Fix::new(OUTSIDE));
        rig.monitor.handle_fix(Fix::new(INSIDE));
        rig.monitor.handle_fix(Fix::new(INSIDE));
        rig.monitor.handle_fix(Fix::new(OUTSIDE));

        assert_eq!(
            kinds(&mut rig.transitions_rx),
            vec![Some(TransitionKind::Enter), Some(TransitionKind::Exit)]
        );
    }

    #[test]
    fn test_client_fixes_follow_queued_registration() {
        let mut rig = rig(true);
        rig.client.connect();
        pump(&mut rig);
        let target = rig.target.clone();

        // Registration and fixes queue up before the task half runs;
        // the shared channel keeps them in submission order
        rig.client
            .register(request(InitialTrigger::Enter), &target)
            .unwrap();
        rig.client.report_fix(Fix::new(INSIDE));
        rig.client.report_fix(Fix::new(OUTSIDE));
        pump(&mut rig);

        assert_eq!(
            kinds(&mut rig.transitions_rx),
            vec![Some(TransitionKind::Enter), Some(TransitionKind::Exit)]
        );
    }

    #[test]
    fn test_initial_trigger_reports_contained_zone() {
        let mut rig = rig(true);
        // Fix arrives before any registration
        rig.monitor.handle_fix(Fix::new(INSIDE));

        rig.client.connect();
        pump(&mut rig);
        let target = rig.target.clone();
        rig.client
            .register(request(InitialTrigger::Enter), &target)
            .unwrap();
        pump(&mut rig);

        assert_eq!(
            kinds(&mut rig.transitions_rx),
            vec![Some(TransitionKind::Enter)]
        );
    }

    #[test]
    fn test_initial_trigger_none_is_silent() {
        let mut rig = rig(true);
        rig.monitor.handle_fix(Fix::new(INSIDE));

        rig.client.connect();
        pump(&mut rig);
        let target = rig.target.clone();
        rig.client
            .register(request(InitialTrigger::None), &target)
            .unwrap();
        pump(&mut rig);

        assert!(kinds(&mut rig.transitions_rx).is_empty());
        // Still inside, so no crossing on the next fix either
        rig.monitor.handle_fix(Fix::new(INSIDE));
        assert!(kinds(&mut rig.transitions_rx).is_empty());
        // Leaving is a real crossing
        rig.monitor.handle_fix(Fix::new(OUTSIDE));
        assert_eq!(
            kinds(&mut rig.transitions_rx),
            vec![Some(TransitionKind::Exit)]
        );
    }

    #[test]
    fn test_register_replaces_previous_set() {
        let mut rig = rig(true);
        rig.client.connect();
        pump(&mut rig);
        let target = rig.target.clone();
        rig.client
            .register(request(InitialTrigger::None), &target)
            .unwrap();
        pump(&mut rig);

        // Replacement set holds one far-away zone
        let far = Zone::new(ZoneId(2), LatLng::new(51.0, 30.0), 500.0);
        rig.client
            .register(
                MonitorRequest {
                    zones: vec![far],
                    initial_trigger: InitialTrigger::None,
                },
                &target,
            )
            .unwrap();
        pump(&mut rig);

        // Crossing into the replaced-away zone stays silent
        rig.monitor.handle_fix(Fix::new(OUTSIDE));
        rig.monitor.handle_fix(Fix::new(INSIDE));
        assert!(kinds(&mut rig.transitions_rx).is_empty());
    }

    #[test]
    fn test_deregister_stops_delivery() {
        let mut rig = rig(true);
        rig.client.connect();
        pump(&mut rig);
        let target = rig.target.clone();
        rig.client
            .register(request(InitialTrigger::None), &target)
            .unwrap();
        pump(&mut rig);
        rig.monitor.handle_fix(Fix::new(OUTSIDE));

        rig.client.deregister(&target).unwrap();
        pump(&mut rig);

        rig.monitor.handle_fix(Fix::new(INSIDE));
        assert!(kinds(&mut rig.transitions_rx).is_empty());
    }

    #[test]
    fn test_suspend_disconnects_and_emits_event() {
        let mut rig = rig(true);
        rig.client.connect();
        pump(&mut rig);
        rig.client.suspend(2);
        pump(&mut rig);

        let mut events = Vec::new();
        while let Ok(event) = rig.events_rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                PlatformEvent::Connected,
                PlatformEvent::Suspended { cause: 2 }
            ]
        );

        let target = rig.target.clone();
        let err = rig
            .client
            .register(request(InitialTrigger::Enter), &target)
            .unwrap_err();
        assert_eq!(err, PlatformError::NotConnected);
    }

    #[test]
    fn test_operations_emit_results() {
        let mut rig = rig(true);
        rig.client.connect();
        pump(&mut rig);
        let target = rig.target.clone();
        rig.client
            .register(request(InitialTrigger::None), &target)
            .unwrap();
        rig.client.deregister(&target).unwrap();
        pump(&mut rig);

        let mut results = 0;
        while let Ok(event) = rig.events_rx.try_recv() {
            if let PlatformEvent::OperationResult(status) = event {
                assert!(status.is_success());
                results += 1;
            }
        }
        assert_eq!(results, 2);
    }
}
