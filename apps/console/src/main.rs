use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use client_core::{
    load_config, spawn_dashboard, transport::ChunkStream, ContainerOrigin, DashboardEvent,
    DashboardHandle, DashboardSnapshot, HttpMissionLink, MissionLink, PointerPosition,
};
use shared::{
    domain::{PodId, TransmissionState},
    protocol::{FormationRequest, PodPositionUpdate},
};
use tokio::{
    sync::{broadcast, mpsc},
    time::timeout,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "console", about = "Terminal front end for the mission dashboard")]
struct Args {
    /// Mission server base URL; overrides dashboard.toml and the environment.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow the live fleet and print the event log.
    Watch {
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
    /// Transmit a formation command and wait for it to settle.
    Formation { name: String },
    /// Drag a pod to a new position and persist it.
    Relocate { id: i64, x: f64, y: f64 },
}

/// Forwards to the HTTP link and reports every persistence attempt back to
/// the console, which otherwise has no view of when it finished.
struct ObservedLink {
    inner: HttpMissionLink,
    persisted: mpsc::UnboundedSender<Result<PodPositionUpdate, String>>,
}

#[async_trait]
impl MissionLink for ObservedLink {
    async fn open_stream(&self) -> Result<ChunkStream> {
        self.inner.open_stream().await
    }

    async fn submit_formation(&self, request: FormationRequest) -> Result<()> {
        self.inner.submit_formation(request).await
    }

    async fn persist_position(&self, update: PodPositionUpdate) -> Result<()> {
        let result = self.inner.persist_position(update).await;
        let report = match &result {
            Ok(()) => Ok(update),
            Err(err) => Err(format!("{err:#}")),
        };
        let _ = self.persisted.send(report);
        result
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let mut config = load_config();
    if let Some(api_url) = args.api_url {
        config.api_url = api_url;
    }
    let request_timeout = config.request_timeout();

    let (persisted_tx, persisted_rx) = mpsc::unbounded_channel();
    let link = ObservedLink {
        inner: HttpMissionLink::new(&config.api_url, request_timeout)?,
        persisted: persisted_tx,
    };
    info!(api_url = %config.api_url, "connecting to mission server");

    let handle = spawn_dashboard(Arc::new(link), config.runtime_options());
    let mut events = handle.subscribe_events();

    // Leave room for the request itself plus a stream reconnect.
    let settle_timeout = request_timeout + config.reconnect_delay() + Duration::from_secs(1);
    let result = match args.command {
        Command::Watch { seconds } => watch(&handle, &mut events, seconds).await,
        Command::Formation { name } => {
            transmit_formation(&handle, &mut events, &name, settle_timeout).await
        }
        Command::Relocate { id, x, y } => {
            relocate(
                &handle,
                &mut events,
                persisted_rx,
                PodId(id),
                (x, y),
                settle_timeout,
            )
            .await
        }
    };

    handle.shutdown().await;
    result
}

async fn watch(
    handle: &DashboardHandle,
    events: &mut broadcast::Receiver<DashboardEvent>,
    seconds: u64,
) -> Result<()> {
    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            event = events.recv() => match event {
                Ok(event) => print_log_line(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "console fell behind dashboard events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    print_summary(&handle.snapshot().await?);
    Ok(())
}

async fn transmit_formation(
    handle: &DashboardHandle,
    events: &mut broadcast::Receiver<DashboardEvent>,
    name: &str,
    settle_timeout: Duration,
) -> Result<()> {
    let ticket = handle.request_formation(name).await?;
    info!(?ticket, formation = name, "formation transmission started");

    timeout(settle_timeout, async {
        loop {
            match next_event(events).await? {
                DashboardEvent::TransmissionChanged(TransmissionState::Idle) => {
                    return Ok::<(), anyhow::Error>(())
                }
                event => print_log_line(&event),
            }
        }
    })
    .await
    .map_err(|_| anyhow!("formation {name} did not settle within {settle_timeout:?}"))??;

    // The settle entry is appended alongside the idle transition.
    while let Ok(event) = events.try_recv() {
        print_log_line(&event);
    }
    Ok(())
}

async fn relocate(
    handle: &DashboardHandle,
    events: &mut broadcast::Receiver<DashboardEvent>,
    mut persisted: mpsc::UnboundedReceiver<Result<PodPositionUpdate, String>>,
    pod_id: PodId,
    (x, y): (f64, f64),
    settle_timeout: Duration,
) -> Result<()> {
    timeout(settle_timeout, wait_for_pod(handle, events, pod_id))
        .await
        .map_err(|_| anyhow!("pod {pod_id} never appeared on the mission stream"))??;

    handle.begin_drag(pod_id).await?;
    handle.update_drag(
        PointerPosition {
            client_x: x,
            client_y: y,
        },
        ContainerOrigin::default(),
    )?;
    let Some(update) = handle.end_drag().await? else {
        bail!("drag session for pod {pod_id} ended before release");
    };
    while let Ok(event) = events.try_recv() {
        print_log_line(&event);
    }

    match timeout(settle_timeout, persisted.recv()).await {
        Ok(Some(Ok(saved))) => {
            println!("POD-{} persisted at ({}, {})", saved.id, saved.x, saved.y);
            Ok(())
        }
        Ok(Some(Err(reason))) => bail!("pod {} position not persisted: {reason}", update.id),
        Ok(None) => bail!("dashboard stopped before pod {} was persisted", update.id),
        Err(_) => bail!("persisting pod {} timed out", update.id),
    }
}

async fn wait_for_pod(
    handle: &DashboardHandle,
    events: &mut broadcast::Receiver<DashboardEvent>,
    pod_id: PodId,
) -> Result<()> {
    if handle
        .snapshot()
        .await?
        .pods
        .iter()
        .any(|pod| pod.id == pod_id)
    {
        return Ok(());
    }
    loop {
        if let DashboardEvent::PodChanged(pod) = next_event(events).await? {
            if pod.id == pod_id {
                return Ok(());
            }
        }
    }
}

async fn next_event(events: &mut broadcast::Receiver<DashboardEvent>) -> Result<DashboardEvent> {
    loop {
        match events.recv().await {
            Ok(event) => return Ok(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "console fell behind dashboard events");
            }
            Err(broadcast::error::RecvError::Closed) => bail!("dashboard runtime stopped"),
        }
    }
}

fn print_log_line(event: &DashboardEvent) {
    if let DashboardEvent::LogAppended(entry) = event {
        println!("{entry}");
    }
}

fn print_summary(snapshot: &DashboardSnapshot) {
    let transmission = if snapshot.is_transmitting() {
        "TRANSMITTING"
    } else {
        "IDLE"
    };
    println!(
        "formation {} | signal {:.0}% | {} | {} pods, {} links",
        snapshot.formation,
        snapshot.signal_strength,
        transmission,
        snapshot.pods.len(),
        snapshot.links.len()
    );
    for pod in &snapshot.pods {
        println!("  POD-{} ({:.0}, {:.0})", pod.id, pod.x, pod.y);
    }
}
