//! Single-owner store for all live dashboard state.
//!
//! Every input (stream event, gesture, command completion, tick) is applied
//! here run-to-completion. Outbound work is returned to the caller instead
//! of being performed, so the store never blocks.

use rand::{rngs::SmallRng, Rng, SeedableRng};
use shared::{
    domain::{Formation, Pod, PodId, TransmissionState},
    protocol::PodPositionUpdate,
};
use tracing::{debug, info};

use crate::{
    dispatcher::{CommandOutcome, CommandTicket, DispatchError, FormationCommand, FormationDispatcher},
    drag::{ContainerOrigin, DragController, DragError, PointerPosition},
    event_log::{EventLog, LogEntry},
    ingress::StreamEvent,
    mesh::{self, PodLink, DEFAULT_LINK_THRESHOLD},
    registry::{PodRegistry, RemoteOutcome},
    signal::SignalSimulator,
};

pub const DEFAULT_CONFIRMATION_LOG_PROBABILITY: f64 = 0.02;

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    LogAppended(LogEntry),
    PodChanged(Pod),
    FormationChanged(Formation),
    TransmissionChanged(TransmissionState),
    DragChanged(Option<PodId>),
}

/// Read-only view handed to presentation collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    pub pods: Vec<Pod>,
    pub links: Vec<PodLink>,
    pub log: Vec<LogEntry>,
    pub signal_strength: f64,
    pub transmission: TransmissionState,
    pub formation: Formation,
    pub dragged: Option<PodId>,
}

impl DashboardSnapshot {
    pub fn is_transmitting(&self) -> bool {
        self.transmission.is_transmitting()
    }
}

#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub link_threshold: f64,
    /// Chance of a "position confirmed" log line per applied remote move.
    pub confirmation_log_probability: f64,
    pub seed: Option<u64>,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            link_threshold: DEFAULT_LINK_THRESHOLD,
            confirmation_log_probability: DEFAULT_CONFIRMATION_LOG_PROBABILITY,
            seed: None,
        }
    }
}

pub struct Dashboard {
    registry: PodRegistry,
    drag: DragController,
    dispatcher: FormationDispatcher,
    signal: SignalSimulator,
    log: EventLog,
    formation: Formation,
    rng: SmallRng,
    options: DashboardOptions,
    pending: Vec<DashboardEvent>,
}

impl Dashboard {
    pub fn new(mut options: DashboardOptions) -> Self {
        options.confirmation_log_probability =
            sanitize_probability(options.confirmation_log_probability);
        let rng = match options.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self {
            registry: PodRegistry::new(),
            drag: DragController::new(),
            dispatcher: FormationDispatcher::new(),
            signal: SignalSimulator::new(),
            log: EventLog::new(),
            formation: Formation::Random,
            rng,
            options,
            pending: Vec::new(),
        }
    }

    pub fn formation(&self) -> &Formation {
        &self.formation
    }

    pub fn transmission(&self) -> TransmissionState {
        self.dispatcher.state()
    }

    pub fn signal_strength(&self) -> f64 {
        self.signal.value()
    }

    pub fn dragged(&self) -> Option<PodId> {
        self.drag.active()
    }

    pub fn pod(&self, id: PodId) -> Option<&Pod> {
        self.registry.get(id)
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn apply_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::PodUpdate(pod) => {
                self.apply_remote_pod(pod);
            }
            StreamEvent::FormationUpdate(formation) => self.set_formation(formation),
        }
    }

    pub fn apply_remote_pod(&mut self, pod: Pod) -> RemoteOutcome {
        let outcome = self.registry.apply_remote(pod, self.drag.active());
        match outcome {
            RemoteOutcome::Suppressed => {
                debug!(pod_id = pod.id.0, "remote update suppressed during drag");
            }
            RemoteOutcome::Inserted | RemoteOutcome::Moved => {
                self.pending.push(DashboardEvent::PodChanged(pod));
                if self.rng.gen_bool(self.options.confirmation_log_probability) {
                    self.append_log(format!("POD-{} position confirmed", pod.id));
                }
            }
            RemoteOutcome::Unchanged => {}
        }
        outcome
    }

    pub fn begin_drag(&mut self, pod_id: PodId) -> Result<(), DragError> {
        if !self.registry.contains(pod_id) {
            return Err(DragError::UnknownPod(pod_id));
        }
        let was = self.drag.active();
        self.drag.begin(pod_id)?;
        if was != Some(pod_id) {
            self.pending.push(DashboardEvent::DragChanged(Some(pod_id)));
        }
        Ok(())
    }

    /// Moves the dragged pod under the pointer. Local writes bypass remote
    /// suppression.
    pub fn update_drag(&mut self, pointer: PointerPosition, origin: ContainerOrigin) -> Option<Pod> {
        let (id, x, y) = self.drag.track(pointer, origin)?;
        if !self.registry.set_local_position(id, x, y) {
            return None;
        }
        let pod = *self.registry.get(id)?;
        self.pending.push(DashboardEvent::PodChanged(pod));
        Some(pod)
    }

    /// Ends the drag session. Returns the rounded position to persist; the
    /// local fractional position is kept as is. No-op without a session.
    pub fn end_drag(&mut self) -> Option<PodPositionUpdate> {
        let id = self.drag.release()?;
        self.pending.push(DashboardEvent::DragChanged(None));

        let pod = *self.registry.get(id)?;
        let update = PodPositionUpdate::rounded_from(&pod);
        self.append_log(format!("POD-{id} relocated manually"));
        self.set_formation(Formation::Random);
        self.append_log("WARN >> MANUAL_OVERRIDE: SIGNAL_UNSTABLE");
        info!(pod_id = id.0, x = update.x, y = update.y, "manual relocation released");
        Some(update)
    }

    pub fn request_formation(
        &mut self,
        formation: Formation,
    ) -> Result<FormationCommand, DispatchError> {
        let command = self.dispatcher.request(formation)?;
        self.append_log(format!("CMD >> FORMATION_REQ: {}", command.formation));
        self.pending
            .push(DashboardEvent::TransmissionChanged(TransmissionState::Transmitting));
        Ok(command)
    }

    /// Applies a command completion. Completions for commands that are no
    /// longer in flight are ignored.
    pub fn settle_formation(&mut self, ticket: CommandTicket, outcome: CommandOutcome) -> bool {
        let Some(settled) = self.dispatcher.settle(ticket, outcome) else {
            debug!(ticket = ticket.0, "ignoring completion for unknown command");
            return false;
        };
        self.pending
            .push(DashboardEvent::TransmissionChanged(TransmissionState::Idle));
        match settled.outcome {
            CommandOutcome::Completed => {
                self.append_log(format!("TX_COMPLETE: {} uplink established", settled.formation));
                self.signal.apply_transmission_drain();
            }
            CommandOutcome::Failed(reason) => {
                self.append_log(format!("ERR >> TX_FAIL: {reason}"));
            }
        }
        true
    }

    pub fn tick(&mut self) -> f64 {
        self.signal
            .tick(&self.formation, self.dispatcher.state(), &mut self.rng)
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let pods = self.registry.to_vec();
        DashboardSnapshot {
            links: mesh::links(&pods, self.options.link_threshold),
            pods,
            log: self.log.to_vec(),
            signal_strength: self.signal.value(),
            transmission: self.dispatcher.state(),
            formation: self.formation.clone(),
            dragged: self.drag.active(),
        }
    }

    /// Notifications accumulated since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<DashboardEvent> {
        std::mem::take(&mut self.pending)
    }

    fn set_formation(&mut self, formation: Formation) {
        if self.formation != formation {
            debug!(from = %self.formation, to = %formation, "formation mode changed");
            self.formation = formation.clone();
            self.pending.push(DashboardEvent::FormationChanged(formation));
        }
    }

    fn append_log(&mut self, message: impl Into<String>) {
        let entry = self.log.append(message).clone();
        self.pending.push(DashboardEvent::LogAppended(entry));
    }
}

// NaN would make `gen_bool` panic.
fn sanitize_probability(probability: f64) -> f64 {
    if probability.is_nan() {
        0.0
    } else {
        probability.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
