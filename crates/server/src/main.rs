use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::{stream, Stream, StreamExt};
use rand::{rngs::SmallRng, SeedableRng};
use shared::{
    domain::{Formation, Pod},
    error::{ApiError, ErrorCode},
    protocol::{
        FormationAccepted, FormationRequest, FormationUpdatePayload, PodPositionAccepted,
        PodPositionUpdate, PodUpdatePayload, FORMATION_ROUTE, FORMATION_UPDATE_EVENT,
        POD_UPDATE_EVENT, STREAM_ROUTE, UPDATE_POD_ROUTE,
    },
};
use tokio::{
    sync::{broadcast, Mutex},
    time::MissedTickBehavior,
};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod fleet;
mod layout;

use config::{load_settings, Settings};
use fleet::Fleet;

/// Change pushed to every connected stream subscriber.
#[derive(Debug, Clone, PartialEq)]
enum FleetEvent {
    Pod(Pod),
    Formation(Formation),
}

impl FleetEvent {
    fn to_sse_event(&self) -> Option<Event> {
        let event = match self {
            FleetEvent::Pod(pod) => Event::default()
                .event(POD_UPDATE_EVENT)
                .json_data(PodUpdatePayload { pod: *pod }),
            FleetEvent::Formation(formation) => Event::default()
                .event(FORMATION_UPDATE_EVENT)
                .json_data(FormationUpdatePayload {
                    formation: formation.clone(),
                }),
        };
        event
            .map_err(|error| warn!(%error, "failed to encode stream event"))
            .ok()
    }
}

struct AppState {
    fleet: Mutex<Fleet>,
    events: broadcast::Sender<FleetEvent>,
}

impl AppState {
    fn new(settings: &Settings) -> Self {
        let rng = match settings.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let (events, _) = broadcast::channel(256);
        Self {
            fleet: Mutex::new(Fleet::new(
                settings.pod_count,
                settings.drift_factor,
                rng,
            )),
            events,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let state = Arc::new(AppState::new(&settings));
    tokio::spawn(run_simulation(state.clone(), settings.tick_interval()));
    let app = build_router(state);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(
        %addr,
        pod_count = settings.pod_count,
        tick_interval_ms = settings.tick_interval_ms,
        "mission server listening"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(STREAM_ROUTE, get(stream_fleet))
        .route(FORMATION_ROUTE, post(submit_formation))
        .route(UPDATE_POD_ROUTE, post(update_pod))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn run_simulation(state: Arc<AppState>, tick_interval: Duration) {
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        advance_fleet(&state).await;
    }
}

async fn advance_fleet(state: &AppState) {
    let mut fleet = state.fleet.lock().await;
    for pod in fleet.step() {
        // No subscribers is not an error.
        let _ = state.events.send(FleetEvent::Pod(pod));
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn stream_fleet(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe under the lock so nothing lands between snapshot and updates.
    let (initial, receiver) = {
        let fleet = state.fleet.lock().await;
        let mut initial = vec![FleetEvent::Formation(fleet.formation().clone())];
        initial.extend(fleet.pods().into_iter().map(FleetEvent::Pod));
        (initial, state.events.subscribe())
    };
    info!(pods = initial.len() - 1, "stream subscriber connected");

    let updates = BroadcastStream::new(receiver).filter_map(|message| async move {
        match message {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "stream subscriber lagged");
                None
            }
        }
    });
    let events = stream::iter(initial)
        .chain(updates)
        .filter_map(|event| async move { event.to_sse_event() })
        .map(Ok);

    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn submit_formation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FormationRequest>,
) -> Result<Json<FormationAccepted>, (StatusCode, Json<ApiError>)> {
    let formation = req.formation;
    if formation.as_str().trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(
                ErrorCode::Validation,
                "formation name must not be empty",
            )),
        ));
    }

    let mut fleet = state.fleet.lock().await;
    fleet.set_formation(formation.clone());
    let _ = state.events.send(FleetEvent::Formation(formation.clone()));
    info!(%formation, "formation accepted");

    Ok(Json(FormationAccepted {
        status: "accepted".into(),
        formation,
    }))
}

async fn update_pod(
    State(state): State<Arc<AppState>>,
    Json(update): Json<PodPositionUpdate>,
) -> Result<Json<PodPositionAccepted>, (StatusCode, Json<ApiError>)> {
    let mut fleet = state.fleet.lock().await;
    let previous = fleet.formation().clone();
    if !fleet.relocate(update) {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiError::new(
                ErrorCode::NotFound,
                format!("pod {} not found", update.id),
            )),
        ));
    }
    if previous != *fleet.formation() {
        let _ = state
            .events
            .send(FleetEvent::Formation(fleet.formation().clone()));
    }
    info!(pod_id = %update.id, x = update.x, y = update.y, "pod relocated manually");

    Ok(Json(PodPositionAccepted {
        status: "updated".into(),
        id: update.id,
    }))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
