use crate::config::{AuthMode, Config};
use crate::error::RoomError;
use crate::startup::AppState;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ISSUER: &str = "poll-rooms";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub room_id: Uuid,
    pub iss: String,
    pub exp: i64,
}

pub fn issue_token(config: &Config, user_id: Uuid, room_id: Uuid) -> Result<String, RoomError> {
    let claims = Claims {
        user_id,
        room_id,
        iss: ISSUER.to_string(),
        exp: (Utc::now() + Duration::hours(config.token_ttl_hours)).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        error!("Token creation failed: {}", e);
        RoomError::TokenCreationError
    })
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Maps a client credential to a user id according to the auth mode.
pub fn resolve_identity(config: &Config, credential: &str) -> Result<Uuid, RoomError> {
    match config.auth_mode {
        AuthMode::Token => {
            let claims = verify_token(&config.jwt_secret, credential).map_err(|e| {
                warn!("Rejected token: {}", e);
                RoomError::Unauthorized
            })?;
            Ok(claims.user_id)
        }
        AuthMode::Direct => Uuid::parse_str(credential).map_err(|_| RoomError::Unauthorized),
    }
}

/// Caller identity from `Authorization: Bearer <credential>`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = RoomError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let app_state = parts
            .extensions
            .get::<AppState>()
            .cloned()
            .ok_or(RoomError::Unauthorized)?;

        let credential = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(RoomError::Unauthorized)?;

        let user_id = resolve_identity(&app_state.config, credential)?;
        Ok(AuthUser { user_id })
    }
}
