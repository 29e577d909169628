use super::*;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use shared::{
    domain::{Formation, PodId},
    error::ErrorCode,
};
use tokio::{net::TcpListener, sync::Mutex};

use crate::ingress::{decode_frame, SseFrameDecoder, StreamEvent};

#[derive(Clone, Default)]
struct ServerState {
    formations: Arc<Mutex<Vec<FormationRequest>>>,
    positions: Arc<Mutex<Vec<PodPositionUpdate>>>,
}

async fn handle_formation(
    State(state): State<ServerState>,
    Json(request): Json<FormationRequest>,
) -> impl IntoResponse {
    if request.formation.as_str() == "JAMMED" {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(ErrorCode::Validation, "uplink jammed")),
        )
            .into_response();
    }
    state.formations.lock().await.push(request);
    Json(serde_json::json!({ "status": "accepted" })).into_response()
}

async fn handle_update_pod(
    State(state): State<ServerState>,
    Json(update): Json<PodPositionUpdate>,
) -> impl IntoResponse {
    state.positions.lock().await.push(update);
    Json(serde_json::json!({ "status": "updated", "id": update.id }))
}

async fn handle_stream() -> impl IntoResponse {
    (
        [("content-type", "text/event-stream")],
        "event: formation_update\ndata: {\"formation\":\"CIRCLE\"}\n\nevent: pod_update\ndata: {\"pod\":{\"id\":0,\"x\":120,\"y\":340}}\n\n",
    )
}

async fn spawn_mission_server() -> Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let app = Router::new()
        .route("/formation", post(handle_formation))
        .route("/update_pod", post(handle_update_pod))
        .route("/stream", get(handle_stream))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

fn link(server_url: &str) -> HttpMissionLink {
    HttpMissionLink::new(server_url, Duration::from_secs(5)).expect("link")
}

#[tokio::test]
async fn submit_formation_posts_json_body() {
    let (server_url, state) = spawn_mission_server().await.expect("spawn server");
    link(&server_url)
        .submit_formation(FormationRequest {
            formation: Formation::from("SPIRAL"),
        })
        .await
        .expect("submit");

    let formations = state.formations.lock().await;
    assert_eq!(formations.len(), 1);
    assert_eq!(formations[0].formation, Formation::Custom("SPIRAL".into()));
}

#[tokio::test]
async fn rejected_formation_surfaces_api_error() {
    let (server_url, _state) = spawn_mission_server().await.expect("spawn server");
    let err = link(&server_url)
        .submit_formation(FormationRequest {
            formation: Formation::from("JAMMED"),
        })
        .await
        .expect_err("must fail");
    let text = format!("{err:#}");
    assert!(text.contains("400"), "unexpected error: {text}");
    assert!(text.contains("uplink jammed"), "unexpected error: {text}");
}

#[tokio::test]
async fn persist_position_posts_integer_coordinates() {
    let (server_url, state) = spawn_mission_server().await.expect("spawn server");
    let update = PodPositionUpdate {
        id: PodId(6),
        x: 301,
        y: -4,
    };
    link(&server_url)
        .persist_position(update)
        .await
        .expect("persist");
    assert_eq!(state.positions.lock().await.as_slice(), &[update]);
}

#[tokio::test]
async fn open_stream_yields_decodable_frames() {
    let (server_url, _state) = spawn_mission_server().await.expect("spawn server");
    let mut chunks = link(&server_url).open_stream().await.expect("open");
    let mut decoder = SseFrameDecoder::new();
    let mut events = Vec::new();
    while let Some(chunk) = chunks.next().await {
        for frame in decoder.push(&chunk.expect("chunk")) {
            events.extend(decode_frame(&frame).expect("decode"));
        }
    }

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], StreamEvent::FormationUpdate(Formation::Circle));
    assert!(matches!(events[1], StreamEvent::PodUpdate(pod) if pod.id == PodId(0)));
}

#[tokio::test]
async fn unreachable_server_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let result = link(&format!("http://{addr}")).open_stream().await;
    assert!(result.is_err());
}

#[test]
fn rejects_non_http_urls() {
    assert!(HttpMissionLink::new("ws://localhost:8000", Duration::from_secs(1)).is_err());
    assert!(HttpMissionLink::new("not a url", Duration::from_secs(1)).is_err());
}

#[tokio::test]
async fn offline_link_fails_every_call() {
    let link = OfflineMissionLink;
    assert!(link.open_stream().await.is_err());
    assert!(link
        .submit_formation(FormationRequest {
            formation: Formation::Star
        })
        .await
        .is_err());
}
