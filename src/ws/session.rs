use crate::error::{IntentError, ProtocolError, StoreError};
use crate::startup::AppState;
use crate::ws::hub::ConnectionId;
use crate::ws::protocol::{self, ClientMessage, ServerMessage};
use std::sync::Arc;
use uuid::Uuid;

/// Per-connection intent handling: mutate, re-read the room, broadcast.
///
/// Runs on the connection's read task, not on the Hub loop. Failures go back
/// to this connection only.
pub struct Session {
    state: AppState,
    connection_id: ConnectionId,
    room_id: Uuid,
    user_id: Uuid,
}

impl Session {
    pub fn new(state: AppState, connection_id: ConnectionId, room_id: Uuid, user_id: Uuid) -> Self {
        Self {
            state,
            connection_id,
            room_id,
            user_id,
        }
    }

    pub async fn handle_frame(&self, frame: &str) {
        let message = match protocol::decode(frame) {
            Ok(message) => message,
            Err(ProtocolError::UnknownType(kind)) => {
                warn!(
                    connection_id = %self.connection_id,
                    kind = %kind,
                    "Unknown message type"
                );
                return;
            }
            Err(e) => {
                warn!(
                    connection_id = %self.connection_id,
                    error = %e,
                    "Invalid message format"
                );
                return;
            }
        };

        if let Err(err) = self.dispatch(message).await {
            match &err {
                IntentError::EmptyContent | IntentError::EmptyOption => {
                    debug!(connection_id = %self.connection_id, "{}", err);
                }
                _ => {
                    error!(
                        connection_id = %self.connection_id,
                        room_id = %self.room_id,
                        user_id = %self.user_id,
                        error = ?err,
                        "{}", err
                    );
                }
            }
            self.reply(ServerMessage::error(err.to_string()));
        }
    }

    async fn dispatch(&self, message: ClientMessage) -> Result<(), IntentError> {
        match message {
            ClientMessage::AddOption { content } => self.add_option(&content).await,
            ClientMessage::Vote { option_id } => self.vote(&option_id).await,
            ClientMessage::RevealVotes => self.publish(true).await,
        }
    }

    async fn add_option(&self, content: &str) -> Result<(), IntentError> {
        if content.is_empty() {
            return Err(IntentError::EmptyContent);
        }

        self.state
            .store
            .upsert_option_for_user(self.room_id, self.user_id, content)
            .await
            .map_err(IntentError::OptionWrite)?;

        self.publish(false).await
    }

    async fn vote(&self, option_id: &str) -> Result<(), IntentError> {
        if option_id.is_empty() {
            return Err(IntentError::EmptyOption);
        }
        let option_id = Uuid::parse_str(option_id)
            .map_err(|_| IntentError::VoteWrite(StoreError::OptionNotFound))?;

        self.state
            .store
            .upsert_vote_for_user(self.user_id, option_id)
            .await
            .map_err(IntentError::VoteWrite)?;

        self.publish(false).await
    }

    async fn publish(&self, reveal_votes: bool) -> Result<(), IntentError> {
        self.state
            .publish_room_state(self.room_id, reveal_votes)
            .await
            .map_err(IntentError::RoomState)
    }

    /// Sends the current room to this connection alone.
    pub async fn send_current_state(&self) {
        match self.state.store.full_room_state(self.room_id).await {
            Ok(snapshot) => self.reply(ServerMessage::Snapshot(Arc::new(snapshot))),
            Err(e) => {
                error!(room_id = %self.room_id, error = %e, "Failed to load room for new connection");
                self.reply(ServerMessage::error(
                    IntentError::RoomState(e).to_string(),
                ));
            }
        }
    }

    fn reply(&self, message: ServerMessage) {
        self.state.hub.send_to(self.connection_id, message);
    }
}
