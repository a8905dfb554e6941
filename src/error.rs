use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Room not found")]
    RoomNotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("Option not found")]
    OptionNotFound,
    #[error("Database error: {0}")]
    Database(String),
}

#[derive(Error, Debug)]
pub enum RoomError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid request: {0}")]
    InvalidRequest(&'static str),
    #[error("Room not found")]
    RoomNotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("Option not found")]
    OptionNotFound,
    #[error("Token creation error")]
    TokenCreationError,
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Failure of a socket intent. The `Display` text is what the
/// originating connection receives in its error signal.
#[derive(Error, Debug)]
pub enum IntentError {
    #[error("Content cannot be empty")]
    EmptyContent,
    #[error("Option cannot be empty")]
    EmptyOption,
    #[error("Failed to create option")]
    OptionWrite(#[source] StoreError),
    #[error("Failed to create vote")]
    VoteWrite(#[source] StoreError),
    #[error("Failed to get room state")]
    RoomState(#[source] StoreError),
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("frame has no type field")]
    MissingType,
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            RoomError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            RoomError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
            RoomError::RoomNotFound => (StatusCode::NOT_FOUND, "Room not found"),
            RoomError::UserNotFound => (StatusCode::NOT_FOUND, "User not found"),
            RoomError::OptionNotFound => (StatusCode::NOT_FOUND, "Option not found"),
            RoomError::TokenCreationError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create token")
            }
            RoomError::DatabaseError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.as_str()),
        };

        let body = Json(json!({
            "error": error_message,
            "details": self.to_string()
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        StoreError::Database(error.to_string())
    }
}

impl From<StoreError> for RoomError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::RoomNotFound => RoomError::RoomNotFound,
            StoreError::UserNotFound => RoomError::UserNotFound,
            StoreError::OptionNotFound => RoomError::OptionNotFound,
            StoreError::Database(msg) => RoomError::DatabaseError(msg),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for RoomError {
    fn from(_: jsonwebtoken::errors::Error) -> Self {
        RoomError::Unauthorized
    }
}
