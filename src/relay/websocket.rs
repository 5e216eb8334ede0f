//! WebSocket feed endpoint.
//!
//! Each session waits for `{latitude, longitude}` requests. A valid request
//! gets an immediate `air_quality_update` followed by periodic ones; a new
//! request replaces the previous location.

use crate::feed::message::{FeedMessage, LocationRequest};
use crate::relay::source::validate_coordinates;
use crate::relay::RelayState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info, warn};

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub token: Option<String>,
}

/// WebSocket upgrade handler; rejects requests without an accepted token.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<FeedQuery>,
    State(state): State<RelayState>,
) -> Response {
    let token = query.token.unwrap_or_default();
    if !state.config.accepts_token(&token) {
        warn!("Rejected feed connection with missing or unknown token");
        return (StatusCode::UNAUTHORIZED, "Invalid or missing token").into_response();
    }

    ws.on_upgrade(move |socket| handle_session(socket, state))
}

async fn handle_session(socket: WebSocket, state: RelayState) {
    let session_id = uuid::Uuid::new_v4().to_string();
    info!("Feed session opened: {}", session_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<FeedMessage>(32);

    let session_send = session_id.clone();
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match message.to_json() {
                Ok(text) => {
                    if let Err(e) = sender.send(Message::Text(text)).await {
                        warn!("Failed to send to session {}: {}", session_send, e);
                        break;
                    }
                }
                Err(e) => error!("Failed to encode message for {}: {}", session_send, e),
            }
        }
    });

    let mut updates: Option<JoinHandle<()>> = None;
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                debug!("Received from {}: {}", session_id, text);
                handle_request(&text, &state, &tx, &mut updates).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket error for session {}: {}", session_id, e);
                break;
            }
        }
    }

    if let Some(task) = updates.take() {
        task.abort();
    }
    writer.abort();
    info!("Feed session closed: {}", session_id);
}

async fn handle_request(
    text: &str,
    state: &RelayState,
    tx: &mpsc::Sender<FeedMessage>,
    updates: &mut Option<JoinHandle<()>>,
) {
    let request: LocationRequest = match serde_json::from_str(text) {
        Ok(request) => request,
        Err(_) => {
            send_error(tx, "Invalid message format").await;
            return;
        }
    };

    if validate_coordinates(request.latitude, request.longitude).is_err() {
        send_error(tx, "Invalid coordinates").await;
        return;
    }

    push_reading(state, tx, request).await;

    if let Some(previous) = updates.take() {
        previous.abort();
    }
    *updates = Some(tokio::spawn(periodic_updates(state.clone(), tx.clone(), request)));
}

async fn periodic_updates(state: RelayState, tx: mpsc::Sender<FeedMessage>, request: LocationRequest) {
    let period = state.config.update_interval();
    let mut ticks = IntervalStream::new(interval_at(Instant::now() + period, period));

    while ticks.next().await.is_some() {
        if !push_reading(&state, &tx, request).await {
            break;
        }
    }
}

/// Fetch and send one reading. Returns `false` once the session is gone.
async fn push_reading(state: &RelayState, tx: &mpsc::Sender<FeedMessage>, request: LocationRequest) -> bool {
    let message = match state.source.fetch(request.latitude, request.longitude).await {
        Ok(data) => FeedMessage::AirQualityUpdate { data },
        Err(e) => {
            error!(
                "Error updating air quality for ({}, {}): {}",
                request.latitude, request.longitude, e
            );
            FeedMessage::Error { message: e.to_string() }
        }
    };
    tx.send(message).await.is_ok()
}

async fn send_error(tx: &mpsc::Sender<FeedMessage>, message: &str) {
    let _ = tx
        .send(FeedMessage::Error {
            message: message.to_string(),
        })
        .await;
}
