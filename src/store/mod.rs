//! Persistence seam for rooms, users, options and votes.
//!
//! The socket layer and HTTP handlers only talk to [`Store`]. Postgres backs
//! it in production; the in-memory variant serves local runs and tests.

mod memory;
mod postgres;

#[cfg(test)]
pub(crate) mod failing;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::db::models::{Room, RoomDates, RoomOption, RoomSnapshot, User, Vote};
use crate::error::StoreError;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_room(&self, name: &str) -> Result<Room, StoreError>;

    async fn get_room(&self, room_id: Uuid) -> Result<Room, StoreError>;

    async fn create_user(&self, room_id: Uuid, display_name: &str) -> Result<User, StoreError>;

    async fn get_user(&self, user_id: Uuid) -> Result<User, StoreError>;

    async fn rename_user(&self, user_id: Uuid, display_name: &str) -> Result<(), StoreError>;

    /// Keeps exactly one option per (room, user); a second call replaces the content.
    async fn upsert_option_for_user(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<RoomOption, StoreError>;

    /// Keeps exactly one vote per user, whichever option it pointed at before.
    async fn upsert_vote_for_user(
        &self,
        user_id: Uuid,
        option_id: Uuid,
    ) -> Result<Vote, StoreError>;

    /// Snapshot with `reveal_votes` always `false`.
    async fn full_room_state(&self, room_id: Uuid) -> Result<RoomSnapshot, StoreError>;

    async fn replace_user_dates(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        dates: &[String],
    ) -> Result<(), StoreError>;

    async fn room_dates(&self, room_id: Uuid) -> Result<RoomDates, StoreError>;
}
