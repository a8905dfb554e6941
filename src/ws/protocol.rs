//! Socket message envelopes.
//!
//! Inbound frames are JSON objects carrying a `type` discriminator. Decoding
//! reads the discriminator first and then parses the payload for that kind,
//! so an unknown kind and a broken payload are reported differently.

use crate::db::models::RoomSnapshot;
use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Client to server intents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    AddOption { content: String },
    Vote { option_id: String },
    RevealVotes,
}

#[derive(Debug, Deserialize)]
struct AddOptionPayload {
    #[serde(default, deserialize_with = "null_as_empty")]
    content: String,
}

#[derive(Debug, Deserialize)]
struct VotePayload {
    #[serde(default, rename = "optionID", deserialize_with = "null_as_empty")]
    option_id: String,
}

/// `null` reads as an empty string so it hits the same validation as a missing field.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn decode(frame: &str) -> Result<ClientMessage, ProtocolError> {
    let value: Value = serde_json::from_str(frame).map_err(ProtocolError::Malformed)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?
        .to_string();

    match kind.as_str() {
        "add_option" => {
            let payload: AddOptionPayload = serde_json::from_value(value)
                .map_err(|source| ProtocolError::InvalidPayload {
                    kind: "add_option",
                    source,
                })?;
            Ok(ClientMessage::AddOption {
                content: payload.content,
            })
        }
        "vote" => {
            let payload: VotePayload =
                serde_json::from_value(value).map_err(|source| ProtocolError::InvalidPayload {
                    kind: "vote",
                    source,
                })?;
            Ok(ClientMessage::Vote {
                option_id: payload.option_id,
            })
        }
        "revealVotes" => Ok(ClientMessage::RevealVotes),
        _ => Err(ProtocolError::UnknownType(kind)),
    }
}

/// `{"type": "error", "message": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "error")]
pub struct ErrorSignal {
    pub message: String,
}

/// Server to client payloads.
///
/// Snapshots serialize bare (no `type` field); error signals carry
/// `type: "error"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Snapshot(Arc<RoomSnapshot>),
    Error(ErrorSignal),
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorSignal {
            message: message.into(),
        })
    }
}
