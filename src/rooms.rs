use crate::auth::{self, AuthUser};
use crate::error::RoomError;
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json, Query},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

// Request DTOs
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[serde(default)]
    pub room_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(rename = "roomID", default)]
    pub room_id: String,
    #[serde(rename = "displayName", default)]
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct UserWithOptionRequest {
    #[serde(rename = "roomID", default)]
    pub room_id: String,
    #[serde(rename = "displayName", default)]
    pub display_name: String,
    #[serde(rename = "optionContent", default)]
    pub option_content: String,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    #[serde(rename = "roomID", default)]
    pub room_id: String,
    pub dates: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct RoomQuery {
    #[serde(rename = "roomID", default)]
    pub room_id: String,
}

fn parse_room_id(raw: &str) -> Result<Uuid, RoomError> {
    if raw.is_empty() {
        return Err(RoomError::InvalidRequest("roomID is required"));
    }
    Uuid::parse_str(raw).map_err(|_| RoomError::RoomNotFound)
}

/// Pushes the room to its sockets after an HTTP-side change. The change is
/// already committed, so a failure here is only logged.
async fn broadcast_after_change(app_state: &AppState, room_id: Uuid) {
    if let Err(e) = app_state.publish_room_state(room_id, false).await {
        warn!(room_id = %room_id, error = %e, "Failed to broadcast room state");
    }
}

/// Caller must belong to the room they are acting on.
async fn ensure_member(app_state: &AppState, user_id: Uuid, room_id: Uuid) -> Result<(), RoomError> {
    let user = app_state.store.get_user(user_id).await?;
    if user.room_id != room_id {
        return Err(RoomError::Unauthorized);
    }
    Ok(())
}

/// POST /rooms
pub async fn create_room(
    Extension(app_state): Extension<AppState>,
    Json(payload): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, RoomError> {
    if payload.room_name.is_empty() {
        return Err(RoomError::InvalidRequest("roomName is required"));
    }

    let room = app_state.store.create_room(&payload.room_name).await?;
    info!(room_id = %room.room_id, "Room created");

    Ok((StatusCode::CREATED, Json(room)))
}

/// POST /users
pub async fn create_user(
    Extension(app_state): Extension<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, RoomError> {
    if payload.room_id.is_empty() || payload.display_name.is_empty() {
        return Err(RoomError::InvalidRequest("roomID and displayName are required"));
    }
    let room_id = parse_room_id(&payload.room_id)?;

    let user = app_state
        .store
        .create_user(room_id, &payload.display_name)
        .await?;
    broadcast_after_change(&app_state, room_id).await;

    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /userOption
///
/// Creates a user (plus their option when given) and returns their token.
pub async fn create_user_with_option(
    Extension(app_state): Extension<AppState>,
    Json(payload): Json<UserWithOptionRequest>,
) -> Result<impl IntoResponse, RoomError> {
    if payload.room_id.is_empty() || payload.display_name.is_empty() {
        return Err(RoomError::InvalidRequest("roomID and displayName are required"));
    }
    let room_id = parse_room_id(&payload.room_id)?;

    let user = app_state
        .store
        .create_user(room_id, &payload.display_name)
        .await?;

    if !payload.option_content.is_empty() {
        app_state
            .store
            .upsert_option_for_user(room_id, user.user_id, &payload.option_content)
            .await?;
    }

    let token = auth::issue_token(&app_state.config, user.user_id, room_id)?;
    broadcast_after_change(&app_state, room_id).await;

    Ok((StatusCode::OK, Json(token)))
}

/// PUT /userOption
pub async fn update_user_with_option(
    Extension(app_state): Extension<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<UserWithOptionRequest>,
) -> Result<impl IntoResponse, RoomError> {
    if payload.room_id.is_empty() || payload.display_name.is_empty() {
        return Err(RoomError::InvalidRequest("roomID and displayName are required"));
    }
    let room_id = parse_room_id(&payload.room_id)?;
    ensure_member(&app_state, auth_user.user_id, room_id).await?;

    app_state
        .store
        .rename_user(auth_user.user_id, &payload.display_name)
        .await?;

    let upserted = if payload.option_content.is_empty() {
        Ok(())
    } else {
        app_state
            .store
            .upsert_option_for_user(room_id, auth_user.user_id, &payload.option_content)
            .await
            .map(|_| ())
    };

    // The rename is already committed, so peers hear about it either way.
    broadcast_after_change(&app_state, room_id).await;
    upserted?;

    Ok((StatusCode::OK, "User and option updated successfully"))
}

/// POST /userAvailability
pub async fn create_availability(
    Extension(app_state): Extension<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<AvailabilityRequest>,
) -> Result<impl IntoResponse, RoomError> {
    let Some(dates) = payload.dates else {
        return Err(RoomError::InvalidRequest("roomID and dates are required"));
    };
    let room_id = parse_room_id(&payload.room_id)?;
    ensure_member(&app_state, auth_user.user_id, room_id).await?;

    app_state
        .store
        .replace_user_dates(room_id, auth_user.user_id, &dates)
        .await?;

    Ok((StatusCode::OK, "Availability created successfully"))
}

/// GET /roomState?roomID=
pub async fn get_room_state(
    Extension(app_state): Extension<AppState>,
    _auth_user: AuthUser,
    Query(query): Query<RoomQuery>,
) -> Result<impl IntoResponse, RoomError> {
    let room_id = parse_room_id(&query.room_id)?;
    let snapshot = app_state.store.full_room_state(room_id).await?;

    Ok((StatusCode::OK, Json(snapshot)))
}

/// GET /dates?roomID=
pub async fn get_dates(
    Extension(app_state): Extension<AppState>,
    _auth_user: AuthUser,
    Query(query): Query<RoomQuery>,
) -> Result<impl IntoResponse, RoomError> {
    let room_id = parse_room_id(&query.room_id)?;
    app_state.store.get_room(room_id).await?;
    let dates = app_state.store.room_dates(room_id).await?;

    Ok((StatusCode::OK, Json(dates)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::routes::build_router;
    use crate::store::{MemoryStore, Store};
    use axum::{
        body::{Body, to_bytes},
        http::{Request, header},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app_state() -> AppState {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        AppState::new(store, Config::default())
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    async fn create_room(state: &AppState) -> String {
        let (status, body) = send(
            state,
            json_request("POST", "/rooms", None, json!({"roomName": "retro"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["roomId"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn create_room_requires_name() {
        let state = app_state();
        let (status, body) = send(
            &state,
            json_request("POST", "/rooms", None, json!({"roomName": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request");
    }

    #[tokio::test]
    async fn user_with_option_returns_token_and_persists_option() {
        let state = app_state();
        let room_id = create_room(&state).await;

        let (status, token) = send(
            &state,
            json_request(
                "POST",
                "/userOption",
                None,
                json!({"roomID": room_id, "displayName": "ana", "optionContent": "Friday"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = token.as_str().unwrap().to_string();

        let (status, snapshot) = send(
            &state,
            Request::builder()
                .uri(format!("/roomState?roomID={room_id}"))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["roomName"], "retro");
        assert_eq!(snapshot["users"][0]["displayName"], "ana");
        assert_eq!(snapshot["options"][0]["content"], "Friday");
        assert_eq!(snapshot["revealVotes"], false);
    }

    #[tokio::test]
    async fn user_in_unknown_room_is_not_found() {
        let state = app_state();
        let (status, _) = send(
            &state,
            json_request(
                "POST",
                "/userOption",
                None,
                json!({"roomID": Uuid::new_v4(), "displayName": "ana"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        let state = app_state();
        let room_id = create_room(&state).await;

        let (status, _) = send(
            &state,
            Request::builder()
                .uri(format!("/roomState?roomID={room_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &state,
            json_request(
                "PUT",
                "/userOption",
                Some("not-a-token"),
                json!({"roomID": room_id, "displayName": "x"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn update_replaces_name_and_option() {
        let state = app_state();
        let room_id = create_room(&state).await;
        let (_, token) = send(
            &state,
            json_request(
                "POST",
                "/userOption",
                None,
                json!({"roomID": room_id, "displayName": "ana", "optionContent": "Friday"}),
            ),
        )
        .await;
        let token = token.as_str().unwrap().to_string();

        let (status, _) = send(
            &state,
            json_request(
                "PUT",
                "/userOption",
                Some(token.as_str()),
                json!({"roomID": room_id, "displayName": "ana b", "optionContent": "Saturday"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let snapshot = state
            .store
            .full_room_state(Uuid::parse_str(&room_id).unwrap())
            .await
            .unwrap();
        assert_eq!(snapshot.users[0].display_name, "ana b");
        assert_eq!(snapshot.options.len(), 1);
        assert_eq!(snapshot.options[0].content, "Saturday");
    }

    #[tokio::test]
    async fn rename_is_pushed_even_when_option_write_fails() {
        use crate::store::failing::FailingStore;
        use crate::ws::hub::{Client, ConnectionId};
        use crate::ws::protocol::ServerMessage;
        use std::sync::atomic::Ordering;
        use std::time::Duration;
        use tokio::sync::mpsc;

        let store = Arc::new(FailingStore::new());
        let state = AppState::new(store.clone(), Config::default());
        let room_id = create_room(&state).await;
        let (_, token) = send(
            &state,
            json_request(
                "POST",
                "/userOption",
                None,
                json!({"roomID": room_id, "displayName": "ana"}),
            ),
        )
        .await;
        let token = token.as_str().unwrap().to_string();

        let room = Uuid::parse_str(&room_id).unwrap();
        let (outbound, mut rx) = mpsc::channel(8);
        let user_id = state.store.full_room_state(room).await.unwrap().users[0].user_id;
        state.hub.register(Client {
            id: ConnectionId::new(),
            room_id: room,
            user_id,
            outbound,
        });

        store.fail_option_writes.store(true, Ordering::SeqCst);
        let (status, _) = send(
            &state,
            json_request(
                "PUT",
                "/userOption",
                Some(token.as_str()),
                json!({"roomID": room_id, "displayName": "ana b", "optionContent": "Sunday"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        match tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
            Ok(Some(ServerMessage::Snapshot(snapshot))) => {
                assert_eq!(snapshot.users[0].display_name, "ana b");
                assert!(snapshot.options.is_empty());
            }
            other => panic!("expected a snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn availability_is_grouped_by_date() {
        let state = app_state();
        let room_id = create_room(&state).await;
        let mut tokens = Vec::new();
        for name in ["ana", "ben"] {
            let (_, token) = send(
                &state,
                json_request(
                    "POST",
                    "/userOption",
                    None,
                    json!({"roomID": room_id, "displayName": name}),
                ),
            )
            .await;
            tokens.push(token.as_str().unwrap().to_string());
        }

        for (token, dates) in tokens.iter().zip([
            json!(["2024-07-01", "2024-07-02"]),
            json!(["2024-07-02"]),
        ]) {
            let (status, _) = send(
                &state,
                json_request(
                    "POST",
                    "/userAvailability",
                    Some(token.as_str()),
                    json!({"roomID": room_id, "dates": dates}),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(
            &state,
            Request::builder()
                .uri(format!("/dates?roomID={room_id}"))
                .header(header::AUTHORIZATION, format!("Bearer {}", tokens[0]))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["roomId"], room_id.as_str());
        assert_eq!(body["dates"][0]["date"], "2024-07-01");
        assert_eq!(body["dates"][0]["users"].as_array().unwrap().len(), 1);
        assert_eq!(body["dates"][1]["date"], "2024-07-02");
        assert_eq!(body["dates"][1]["users"].as_array().unwrap().len(), 2);
    }
}
