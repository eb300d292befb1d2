//! WebSocket ingress.
//!
//! Clients connect with `GET /ws?channel=<id>`; the channel is bound for
//! the lifetime of the connection. Each accepted socket runs two loops: the
//! inbound loop reads client payloads and hands them to the hub, while a
//! spawned outbound task drains the connection's mailbox onto the wire.
//! Either side failing tears down only this connection.

use crate::app::AppState;
use crate::metrics::{self, ConnectionMetricsGuard};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use ripple_core::{validate_channel_name, ConnectionId, MailboxReceiver, WireMessage};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Query parameters for the WebSocket endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub channel: String,
}

/// WebSocket upgrade handler.
///
/// The channel is validated before the upgrade: a missing or invalid
/// `channel` parameter is rejected with a client error and no connection
/// state is allocated.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    if query.channel.is_empty() {
        return (StatusCode::BAD_REQUEST, "channel parameter required").into_response();
    }
    if let Err(reason) = validate_channel_name(&query.channel) {
        return (StatusCode::BAD_REQUEST, reason).into_response();
    }
    if state.config.websocket.require_existing_channel
        && !state.directory.exists(&query.channel).await
    {
        return (StatusCode::NOT_FOUND, "Channel not found").into_response();
    }

    let ws = ws.max_message_size(state.config.limits.max_message_size);
    ws.on_upgrade(move |socket| handle_socket(socket, query.channel, state))
}

/// Drive one accepted connection until it closes.
async fn handle_socket(socket: WebSocket, channel: String, state: Arc<AppState>) {
    let _metrics_guard = ConnectionMetricsGuard::new();
    let connection_id = ConnectionId::generate();

    let mailbox = match state.hub.register(&connection_id, &channel) {
        Ok(rx) => rx,
        Err(e) => {
            // Name was validated pre-upgrade, so this is unreachable in
            // practice; close the socket rather than trust it.
            warn!(connection = %connection_id, error = %e, "Registration failed");
            return;
        }
    };
    metrics::set_active_channels(state.hub.stats().channel_count);
    debug!(connection = %connection_id, channel = %channel, "WebSocket connected");

    let (sender, mut receiver) = socket.split();

    // Outbound loop: mailbox -> wire. Ends when the mailbox closes (the
    // hub dropped its sender at unregister) or a write fails.
    let outbound = tokio::spawn(outbound_loop(sender, mailbox));

    // Inbound loop: wire -> hub.
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                metrics::record_message(text.len(), "inbound");
                publish(&state, &channel, &connection_id, text.as_bytes());
            }
            Ok(Message::Binary(data)) => {
                metrics::record_message(data.len(), "inbound");
                publish(&state, &channel, &connection_id, &data);
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // Control frames; pings are answered by the ws layer.
            }
            Ok(Message::Close(_)) => {
                debug!(connection = %connection_id, "Received close frame");
                break;
            }
            Err(e) => {
                warn!(connection = %connection_id, error = %e, "WebSocket error");
                metrics::record_error("websocket");
                break;
            }
        }
    }

    // Draining: closing the mailbox is the outbound loop's stop signal.
    state.hub.unregister(&connection_id);
    metrics::set_active_channels(state.hub.stats().channel_count);
    let _ = outbound.await;

    debug!(connection = %connection_id, channel = %channel, "WebSocket disconnected");
}

/// Forward mailbox payloads to the socket until the mailbox closes.
async fn outbound_loop(mut sender: SplitSink<WebSocket, Message>, mut mailbox: MailboxReceiver) {
    while let Some(payload) = mailbox.recv().await {
        metrics::record_message(payload.len(), "outbound");
        let text = String::from_utf8_lossy(&payload).into_owned();
        if sender.send(Message::Text(text)).await.is_err() {
            debug!("Outbound write failed, loop exiting");
            break;
        }
    }
    let _ = sender.close().await;
}

/// Parse, canonicalize, and broadcast one inbound payload.
///
/// A malformed payload is logged and discarded; the connection stays up.
fn publish(state: &AppState, channel: &str, connection_id: &ConnectionId, raw: &[u8]) {
    let msg = match serde_json::from_slice::<WireMessage>(raw) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(connection = %connection_id, error = %e, "Invalid message format");
            metrics::record_error("protocol");
            return;
        }
    };

    // Bind the routing fields to this connection's channel; the client's
    // channel_id is never honored.
    let msg = msg.canonicalize(channel);

    let json = match serde_json::to_string(&msg) {
        Ok(json) => json,
        Err(e) => {
            warn!(connection = %connection_id, error = %e, "Failed to serialize message");
            metrics::record_error("serialize");
            return;
        }
    };

    let report = state.hub.broadcast(channel, &Bytes::from(json));
    if report.dropped > 0 {
        metrics::record_mailbox_dropped(report.dropped);
    }
    trace!(
        connection = %connection_id,
        channel = %channel,
        delivered = report.delivered,
        dropped = report.dropped,
        "Published"
    );
}
