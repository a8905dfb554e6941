use axum::{
    extract::{Extension, Query, ws::WebSocketUpgrade},
    response::Response,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth;
use crate::error::RoomError;
use crate::startup::AppState;
use crate::ws::connection;

/// `GET /ws?roomID=..&token=..` (or `&userID=..` when auth mode is direct).
#[derive(Debug, Deserialize)]
pub struct SocketQuery {
    #[serde(rename = "roomID")]
    pub room_id: String,
    pub token: Option<String>,
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
}

/// Resolves room and user before upgrading. A request that fails here never
/// reaches the Hub.
pub async fn room_socket(
    Extension(app_state): Extension<AppState>,
    Query(params): Query<SocketQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, RoomError> {
    let credential = params
        .token
        .as_deref()
        .or(params.user_id.as_deref())
        .filter(|c| !c.is_empty())
        .ok_or(RoomError::Unauthorized)?;
    let user_id = auth::resolve_identity(&app_state.config, credential)?;

    let room_id = Uuid::parse_str(&params.room_id).map_err(|_| RoomError::RoomNotFound)?;
    let room = app_state.store.get_room(room_id).await?;
    let user = app_state.store.get_user(user_id).await?;
    if user.room_id != room.room_id {
        warn!(
            room_id = %room.room_id,
            user_id = %user.user_id,
            "User does not belong to requested room"
        );
        return Err(RoomError::UserNotFound);
    }

    Ok(ws.on_upgrade(move |socket| {
        connection::serve(socket, app_state, room.room_id, user.user_id)
    }))
}
