// Relay server: WebSocket listener for room traffic, HTTP listener for
// disconnect notifications. Both share one room registry.
use crate::config::ServerConfig;
use crate::connection::handle_connection;
use crate::error::Result;
use crate::message::{DisconnectRequest, DisconnectResponse};
use crate::rooms::Rooms;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tracing::{error, info, warn};

pub async fn run_server(config: &ServerConfig) -> Result<()> {
    let ws_listener = TcpListener::bind(config.ws_addr).await.map_err(|e| {
        error!("[Server] Failed to bind to address {}: {}", config.ws_addr, e);
        e
    })?;
    let http_listener = TcpListener::bind(config.http_addr).await.map_err(|e| {
        error!("[Server] Failed to bind to address {}: {}", config.http_addr, e);
        e
    })?;
    serve(ws_listener, http_listener, Rooms::default()).await
}

/// Serves both listeners until the WebSocket listener fails.
pub async fn serve(ws_listener: TcpListener, http_listener: TcpListener, rooms: Rooms) -> Result<()> {
    info!("[Server] WebSocket listening on: {}", ws_listener.local_addr()?);
    info!("[Server] HTTP listening on: {}", http_listener.local_addr()?);

    let app = router(rooms.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, app).await {
            error!("[Server] HTTP server error: {}", e);
        }
    });

    loop {
        let (stream, peer_addr) = ws_listener.accept().await?;
        info!("[Server] Incoming TCP connection from: {}", peer_addr);

        let rooms = rooms.clone();
        tokio::spawn(async move {
            match accept_async(stream).await {
                Ok(ws_stream) => handle_connection(peer_addr, ws_stream, rooms).await,
                Err(e) => warn!("[Server] WebSocket handshake error with {}: {}", peer_addr, e),
            }
        });
    }
}

pub fn router(rooms: Rooms) -> Router {
    Router::new()
        .route("/user_disconnect", post(user_disconnect))
        .with_state(rooms)
}

async fn user_disconnect(
    State(rooms): State<Rooms>,
    Json(body): Json<DisconnectRequest>,
) -> (StatusCode, Json<DisconnectResponse>) {
    let member = body.data;
    match rooms.leave(&member) {
        Ok(()) => {
            info!("[Server] {}@{} disconnected via HTTP.", member.username, member.room);
            (StatusCode::OK, Json(DisconnectResponse { message: "Data received successfully".into() }))
        }
        Err(e) => {
            warn!("[Server] Disconnect for unknown member: {}", e);
            (StatusCode::NOT_FOUND, Json(DisconnectResponse { message: e.to_string() }))
        }
    }
}
