//! Axum server for watching a replay from a browser.
//!
//! REST routes drive playback; `/ws` streams every render command as it is
//! emitted, after an initial grid snapshot.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

use crate::config::EngineConfig;
use crate::driver::PlaybackDriver;
use crate::error::{Error, Result};
use crate::grid_state::GridState;
use crate::playback::{PlaybackStatus, Replay};
use crate::recording::Recording;
use crate::render::{RenderCommand, RenderSink};

/// Render commands buffered per subscriber before it counts as lagging.
const BROADCAST_CAPACITY: usize = 1024;

/// Fans render commands out to every connected viewer.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<RenderCommand>,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<RenderCommand>) -> Self {
        Self { tx }
    }
}

impl RenderSink for BroadcastSink {
    fn render(&mut self, command: RenderCommand) {
        // No viewers connected is fine
        let _ = self.tx.send(command);
    }
}

/// Shared application state.
pub struct AppState {
    recording: Recording,
    playback: PlaybackDriver<BroadcastSink>,
    updates: broadcast::Sender<RenderCommand>,
}

/// Replay viewer server.
pub struct ReplayServer {
    state: Arc<AppState>,
}

impl ReplayServer {
    /// Load `recording` into a fresh replay.
    pub fn new(recording: Recording, config: EngineConfig) -> Result<Self> {
        let (updates, _) = broadcast::channel(BROADCAST_CAPACITY);
        let tick = config.tick_interval;
        let mut replay = Replay::new(BroadcastSink::new(updates.clone()), config);
        replay.load(recording)?;
        // Keep the normalized copy so metadata matches what plays
        let recording = replay
            .recording()
            .cloned()
            .ok_or_else(|| Error::InvalidRecording("load produced no recording".into()))?;

        Ok(Self {
            state: Arc::new(AppState {
                recording,
                playback: PlaybackDriver::new(replay, tick),
                updates,
            }),
        })
    }

    /// Build the router for the server.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/status", get(status_handler))
            .route("/api/recording", get(recording_handler))
            .route("/api/grid", get(grid_handler))
            .route("/api/playback", get(playback_status_handler))
            .route("/api/playback/play", post(play_handler))
            .route("/api/playback/pause", post(pause_handler))
            .route("/api/playback/seek", post(seek_handler))
            .route("/api/playback/speed", post(speed_handler))
            .route("/ws", get(ws_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Run the server on the given port.
    pub async fn serve(self, port: u16) -> std::result::Result<(), std::io::Error> {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Replay viewer running on http://localhost:{}", port);
        axum::serve(listener, self.router()).await
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    puzzle_title: String,
    puzzle_date: String,
    grid_size: usize,
    action_count: usize,
    duration_ms: f64,
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let recording = &state.recording;
    Json(StatusResponse {
        status: "ok",
        puzzle_title: recording.puzzle_title.clone(),
        puzzle_date: recording.puzzle_date.clone(),
        grid_size: recording.grid_size,
        action_count: recording.action_count(),
        duration_ms: recording.duration_ms(),
    })
}

async fn recording_handler(State(state): State<Arc<AppState>>) -> Json<Recording> {
    Json(state.recording.clone())
}

async fn current_grid(state: &AppState) -> Option<GridState> {
    state.playback.with_replay(|r| r.grid().cloned()).await
}

async fn grid_handler(State(state): State<Arc<AppState>>) -> Json<Option<GridState>> {
    Json(current_grid(&state).await)
}

async fn playback_status_handler(State(state): State<Arc<AppState>>) -> Json<PlaybackStatus> {
    Json(state.playback.status().await)
}

async fn play_handler(State(state): State<Arc<AppState>>) -> Json<PlaybackStatus> {
    state.playback.play().await;
    Json(state.playback.status().await)
}

async fn pause_handler(State(state): State<Arc<AppState>>) -> Json<PlaybackStatus> {
    state.playback.pause().await;
    Json(state.playback.status().await)
}

#[derive(Deserialize)]
struct SeekRequest {
    fraction: f64,
}

async fn seek_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SeekRequest>,
) -> Json<PlaybackStatus> {
    state.playback.seek(req.fraction).await;
    Json(state.playback.status().await)
}

#[derive(Deserialize)]
struct SpeedRequest {
    multiplier: f64,
}

async fn speed_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SpeedRequest>,
) -> std::result::Result<Json<PlaybackStatus>, (StatusCode, String)> {
    state
        .playback
        .set_speed(req.multiplier)
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(state.playback.status().await))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsCommand {
    GetGrid,
    GetStatus,
    Seek { fraction: f64 },
    Play,
    Pause,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsMessage {
    Snapshot(GridState),
    Status(PlaybackStatus),
    Render { command: RenderCommand },
}

async fn send(socket: &mut WebSocket, message: &WsMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode websocket message");
            true
        }
    }
}

async fn send_snapshot(socket: &mut WebSocket, state: &AppState) -> bool {
    match current_grid(state).await {
        Some(grid) => send(socket, &WsMessage::Snapshot(grid)).await,
        None => true,
    }
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    // Subscribe before the snapshot so nothing falls in between
    let mut updates = state.updates.subscribe();
    if !send_snapshot(&mut socket, &state).await {
        return;
    }

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(command) => {
                    if !send(&mut socket, &WsMessage::Render { command }).await {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "viewer lagged; resending snapshot");
                    if !send_snapshot(&mut socket, &state).await {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(cmd) = serde_json::from_str::<WsCommand>(&text) {
                        let response = handle_ws_command(&state, cmd).await;
                        if !send(&mut socket, &response).await {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

async fn handle_ws_command(state: &AppState, cmd: WsCommand) -> WsMessage {
    match cmd {
        WsCommand::GetGrid => match current_grid(state).await {
            Some(grid) => WsMessage::Snapshot(grid),
            None => WsMessage::Status(state.playback.status().await),
        },
        WsCommand::GetStatus => WsMessage::Status(state.playback.status().await),
        WsCommand::Seek { fraction } => {
            state.playback.seek(fraction).await;
            WsMessage::Status(state.playback.status().await)
        }
        WsCommand::Play => {
            state.playback.play().await;
            WsMessage::Status(state.playback.status().await)
        }
        WsCommand::Pause => {
            state.playback.pause().await;
            WsMessage::Status(state.playback.status().await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::PlaybackState;
    use crate::recording::tests::scenario_recording;

    fn server() -> ReplayServer {
        ReplayServer::new(scenario_recording(), EngineConfig::default()).unwrap()
    }

    #[test]
    fn server_creation() {
        let server = server();
        assert_eq!(server.state.recording.action_count(), 3);
    }

    #[test]
    fn router_builds() {
        let _router = server().router();
    }

    #[test]
    fn invalid_recording_is_rejected() {
        let mut recording = scenario_recording();
        recording.grid_size = 0;
        assert!(ReplayServer::new(recording, EngineConfig::default()).is_err());
    }

    #[tokio::test]
    async fn seek_broadcasts_render_commands() {
        let server = server();
        let mut updates = server.state.updates.subscribe();

        let Json(status) =
            seek_handler(State(server.state.clone()), Json(SeekRequest { fraction: 0.4 })).await;
        assert_eq!(status.position_ms, 400.0);
        assert_eq!(status.state, PlaybackState::Paused);

        let first = updates.recv().await.unwrap();
        assert_eq!(first, RenderCommand::SetCellLetter { row: 0, col: 0, letter: Some('C') });

        let Json(grid) = grid_handler(State(server.state.clone())).await;
        assert_eq!(grid.unwrap().letter_at(xword_grid::CellCoord::new(0, 0)), Some('C'));
    }

    #[tokio::test]
    async fn bad_speed_is_a_client_error() {
        let server = server();
        let result =
            speed_handler(State(server.state.clone()), Json(SpeedRequest { multiplier: -1.0 }))
                .await;
        let Err((code, _)) = result else {
            panic!("negative speed accepted");
        };
        assert_eq!(code, StatusCode::BAD_REQUEST);

        let Ok(Json(status)) =
            speed_handler(State(server.state.clone()), Json(SpeedRequest { multiplier: 2.0 })).await
        else {
            panic!("valid speed rejected");
        };
        assert_eq!(status.speed, 2.0);
    }

    #[tokio::test]
    async fn ws_commands_control_playback() {
        let server = server();
        let response = handle_ws_command(&server.state, WsCommand::Seek { fraction: 1.0 }).await;
        let WsMessage::Status(status) = response else {
            panic!("expected status");
        };
        assert_eq!(status.state, PlaybackState::Finished);

        let parsed: WsCommand = serde_json::from_str(r#"{"type":"seek","fraction":0.5}"#).unwrap();
        assert!(matches!(parsed, WsCommand::Seek { fraction } if fraction == 0.5));
    }
}
