//! Async owner of the [`Dashboard`].
//!
//! A single task applies every input in arrival order. Outbound requests run
//! as spawned tasks whose completions come back through the same queue, so
//! pod updates and ticks keep flowing while a command is in flight.

use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use shared::{
    domain::{Formation, PodId},
    protocol::{FormationRequest, PodPositionUpdate},
};
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use crate::{
    dashboard::{Dashboard, DashboardEvent, DashboardOptions, DashboardSnapshot},
    dispatcher::{CommandOutcome, CommandTicket, DispatchError},
    drag::{ContainerOrigin, DragError, PointerPosition},
    ingress::{decode_frame, SseFrameDecoder, StreamEvent},
    transport::MissionLink,
};

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Drag(#[from] DragError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("dashboard runtime has shut down")]
    RuntimeClosed,
}

#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub dashboard: DashboardOptions,
    pub tick_interval: Duration,
    pub reconnect_delay: Duration,
    /// Subscribe to the mission stream on start.
    pub connect_stream: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            dashboard: DashboardOptions::default(),
            tick_interval: Duration::from_millis(30),
            reconnect_delay: Duration::from_secs(1),
            connect_stream: true,
        }
    }
}

enum DashboardInput {
    Stream(StreamEvent),
    BeginDrag {
        pod_id: PodId,
        reply: oneshot::Sender<Result<(), DragError>>,
    },
    UpdateDrag {
        pointer: PointerPosition,
        origin: ContainerOrigin,
    },
    EndDrag {
        reply: oneshot::Sender<Option<PodPositionUpdate>>,
    },
    RequestFormation {
        formation: Formation,
        reply: oneshot::Sender<Result<CommandTicket, DispatchError>>,
    },
    FormationSettled {
        ticket: CommandTicket,
        outcome: CommandOutcome,
    },
    Snapshot {
        reply: oneshot::Sender<DashboardSnapshot>,
    },
    Shutdown,
}

pub struct DashboardHandle {
    inputs: mpsc::UnboundedSender<DashboardInput>,
    events: broadcast::Sender<DashboardEvent>,
    task: JoinHandle<()>,
}

pub fn spawn_dashboard(link: Arc<dyn MissionLink>, options: RuntimeOptions) -> DashboardHandle {
    let (inputs, rx) = mpsc::unbounded_channel();
    let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    let stream_task = options.connect_stream.then(|| {
        tokio::spawn(run_event_stream(
            Arc::clone(&link),
            inputs.downgrade(),
            options.reconnect_delay,
        ))
    });

    let runtime = DashboardRuntime {
        dashboard: Dashboard::new(options.dashboard),
        link,
        inputs: inputs.downgrade(),
        events: events.clone(),
    };
    // `interval` panics on a zero period.
    let tick_interval = options.tick_interval.max(MIN_TICK_INTERVAL);
    let task = tokio::spawn(runtime.run(rx, tick_interval, stream_task));

    DashboardHandle {
        inputs,
        events,
        task,
    }
}

impl DashboardHandle {
    pub async fn begin_drag(&self, pod_id: PodId) -> Result<(), DashboardError> {
        let (reply, rx) = oneshot::channel();
        self.send(DashboardInput::BeginDrag { pod_id, reply })?;
        Ok(rx.await.map_err(|_| DashboardError::RuntimeClosed)??)
    }

    pub fn update_drag(
        &self,
        pointer: PointerPosition,
        origin: ContainerOrigin,
    ) -> Result<(), DashboardError> {
        self.send(DashboardInput::UpdateDrag { pointer, origin })
    }

    /// Releases the active drag. Returns the position sent for persistence,
    /// or `None` when no drag was active.
    pub async fn end_drag(&self) -> Result<Option<PodPositionUpdate>, DashboardError> {
        let (reply, rx) = oneshot::channel();
        self.send(DashboardInput::EndDrag { reply })?;
        rx.await.map_err(|_| DashboardError::RuntimeClosed)
    }

    /// Starts a formation transmission. Returns as soon as the dashboard is
    /// transmitting; completion arrives later as a
    /// [`DashboardEvent::TransmissionChanged`].
    pub async fn request_formation(
        &self,
        formation: impl Into<Formation>,
    ) -> Result<CommandTicket, DashboardError> {
        let (reply, rx) = oneshot::channel();
        self.send(DashboardInput::RequestFormation {
            formation: formation.into(),
            reply,
        })?;
        Ok(rx.await.map_err(|_| DashboardError::RuntimeClosed)??)
    }

    /// Feeds an already decoded stream event, as if pushed by the server.
    pub fn ingest(&self, event: StreamEvent) -> Result<(), DashboardError> {
        self.send(DashboardInput::Stream(event))
    }

    pub async fn snapshot(&self) -> Result<DashboardSnapshot, DashboardError> {
        let (reply, rx) = oneshot::channel();
        self.send(DashboardInput::Snapshot { reply })?;
        rx.await.map_err(|_| DashboardError::RuntimeClosed)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    /// Stops the tick and the stream subscription. Completions of requests
    /// still in flight are dropped.
    pub async fn shutdown(self) {
        let _ = self.inputs.send(DashboardInput::Shutdown);
        drop(self.inputs);
        if let Err(err) = self.task.await {
            warn!(%err, "dashboard runtime ended abnormally");
        }
    }

    fn send(&self, input: DashboardInput) -> Result<(), DashboardError> {
        self.inputs
            .send(input)
            .map_err(|_| DashboardError::RuntimeClosed)
    }
}

struct DashboardRuntime {
    dashboard: Dashboard,
    link: Arc<dyn MissionLink>,
    inputs: mpsc::WeakUnboundedSender<DashboardInput>,
    events: broadcast::Sender<DashboardEvent>,
}

impl DashboardRuntime {
    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<DashboardInput>,
        tick_interval: Duration,
        stream_task: Option<JoinHandle<()>>,
    ) {
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                input = rx.recv() => match input {
                    Some(DashboardInput::Shutdown) | None => break,
                    Some(input) => self.handle(input),
                },
                _ = ticker.tick() => {
                    self.dashboard.tick();
                }
            }
            self.publish();
        }

        if let Some(task) = stream_task {
            task.abort();
        }
        info!("dashboard runtime stopped");
    }

    fn handle(&mut self, input: DashboardInput) {
        match input {
            DashboardInput::Stream(event) => self.dashboard.apply_stream_event(event),
            DashboardInput::BeginDrag { pod_id, reply } => {
                let _ = reply.send(self.dashboard.begin_drag(pod_id));
            }
            DashboardInput::UpdateDrag { pointer, origin } => {
                self.dashboard.update_drag(pointer, origin);
            }
            DashboardInput::EndDrag { reply } => {
                let update = self.dashboard.end_drag();
                if let Some(update) = update {
                    self.persist_position(update);
                }
                let _ = reply.send(update);
            }
            DashboardInput::RequestFormation { formation, reply } => {
                let result = self.dashboard.request_formation(formation).map(|command| {
                    self.submit_formation(command.ticket, command.formation);
                    command.ticket
                });
                let _ = reply.send(result);
            }
            DashboardInput::FormationSettled { ticket, outcome } => {
                self.dashboard.settle_formation(ticket, outcome);
            }
            DashboardInput::Snapshot { reply } => {
                let _ = reply.send(self.dashboard.snapshot());
            }
            DashboardInput::Shutdown => {}
        }
    }

    fn publish(&mut self) {
        for event in self.dashboard.drain_events() {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }

    fn submit_formation(&self, ticket: CommandTicket, formation: Formation) {
        let link = Arc::clone(&self.link);
        let inputs = self.inputs.clone();
        tokio::spawn(async move {
            info!(formation = %formation, ticket = ticket.0, "submitting formation command");
            let outcome = match link
                .submit_formation(FormationRequest {
                    formation: formation.clone(),
                })
                .await
            {
                Ok(()) => CommandOutcome::Completed,
                Err(err) => {
                    warn!(formation = %formation, "formation command failed: {err:#}");
                    CommandOutcome::Failed(format!("{err:#}"))
                }
            };
            match inputs.upgrade() {
                Some(tx) => {
                    let _ = tx.send(DashboardInput::FormationSettled { ticket, outcome });
                }
                None => debug!(ticket = ticket.0, "dashboard gone; dropping command completion"),
            }
        });
    }

    fn persist_position(&self, update: PodPositionUpdate) {
        let link = Arc::clone(&self.link);
        tokio::spawn(async move {
            match link.persist_position(update).await {
                Ok(()) => debug!(pod_id = update.id.0, x = update.x, y = update.y, "pod position persisted"),
                Err(err) => warn!(pod_id = update.id.0, "failed to persist drag: {err:#}"),
            }
        });
    }
}

async fn run_event_stream(
    link: Arc<dyn MissionLink>,
    inputs: mpsc::WeakUnboundedSender<DashboardInput>,
    reconnect_delay: Duration,
) {
    let mut decoder = SseFrameDecoder::new();
    loop {
        match link.open_stream().await {
            Ok(mut chunks) => {
                info!("mission stream connected");
                decoder.reset();
                while let Some(chunk) = chunks.next().await {
                    let chunk = match chunk {
                        Ok(chunk) => chunk,
                        Err(err) => {
                            warn!("mission stream receive failed: {err:#}");
                            break;
                        }
                    };
                    for frame in decoder.push(&chunk) {
                        match decode_frame(&frame) {
                            Ok(Some(event)) => {
                                let Some(tx) = inputs.upgrade() else {
                                    return;
                                };
                                if tx.send(DashboardInput::Stream(event)).is_err() {
                                    return;
                                }
                            }
                            Ok(None) => debug!(event = %frame.event, "ignoring unrecognized stream event"),
                            Err(err) => debug!(%err, "discarding malformed stream payload"),
                        }
                    }
                }
                warn!("mission stream disconnected; retrying");
            }
            Err(err) => warn!("mission stream unavailable: {err:#}"),
        }

        if inputs.upgrade().is_none() {
            return;
        }
        tokio::time::sleep(reconnect_delay).await;
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
