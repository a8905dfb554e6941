use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::startup::AppState;
use crate::ws::hub::{Client, ConnectionId, Hub};
use crate::ws::protocol::ServerMessage;
use crate::ws::session::Session;

/// How long the writer may keep flushing after the reader has gone.
const WRITER_DRAIN: Duration = Duration::from_secs(5);

/// Unregisters the connection when dropped, whichever way the connection ends.
struct Teardown {
    hub: Hub,
    id: ConnectionId,
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.hub.unregister(self.id);
    }
}

/// Runs one registered connection until either pump stops.
///
/// The Hub holds the only sender for the outbound buffer: unregistering or
/// evicting the connection closes the buffer, which ends the write pump.
pub async fn serve(socket: WebSocket, state: AppState, room_id: Uuid, user_id: Uuid) {
    let id = ConnectionId::new();
    let (outbound, outbound_rx) = mpsc::channel::<ServerMessage>(state.config.send_buffer);

    state.hub.register(Client {
        id,
        room_id,
        user_id,
        outbound,
    });
    let teardown = Teardown {
        hub: state.hub.clone(),
        id,
    };

    info!(
        connection_id = %id,
        room_id = %room_id,
        user_id = %user_id,
        "WebSocket connection opened"
    );

    // The writer must be draining before the join fetch, or broadcasts that
    // land during it fill the buffer and evict this connection.
    let (sink, stream) = socket.split();
    let mut writer = tokio::spawn(write_pump(sink, outbound_rx, id));

    let session = Session::new(state, id, room_id, user_id);
    session.send_current_state().await;
    let mut reader = tokio::spawn(read_pump(stream, session));

    let reader_done = tokio::select! {
        _ = &mut writer => false,
        _ = &mut reader => true,
    };

    drop(teardown);
    if reader_done {
        if tokio::time::timeout(WRITER_DRAIN, &mut writer).await.is_err() {
            writer.abort();
        }
    } else {
        reader.abort();
    }

    info!(connection_id = %id, "WebSocket connection closed");
}

/// Forwards outbound messages to the socket until the buffer closes or a write fails.
async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<ServerMessage>,
    id: ConnectionId,
) {
    while let Some(message) = outbound.recv().await {
        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                error!(connection_id = %id, error = %e, "Failed to serialize outbound message");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(text)).await {
            debug!(connection_id = %id, error = %e, "WebSocket write failed");
            return;
        }
    }
    let _ = sink.close().await;
}

/// Feeds text frames to the session until the peer closes or the transport fails.
async fn read_pump(mut stream: SplitStream<WebSocket>, session: Session) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => session.handle_frame(&text).await,
            Ok(Message::Close(frame)) => {
                debug!(reason = ?frame, "Client initiated close");
                break;
            }
            Ok(Message::Binary(_)) => {
                debug!("Ignoring binary frame");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Err(e) => {
                debug!(error = %e, "WebSocket receive error");
                break;
            }
        }
    }
}
