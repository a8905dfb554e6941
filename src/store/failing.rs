use super::{MemoryStore, Store};
use crate::db::models::{Room, RoomDates, RoomOption, RoomSnapshot, User, Vote};
use crate::error::StoreError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// `MemoryStore` whose option writes and room reads can be switched to fail.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    pub fail_option_writes: AtomicBool,
    pub fail_room_state: AtomicBool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn outage() -> StoreError {
        StoreError::Database("connection refused".to_string())
    }
}

#[async_trait]
impl Store for FailingStore {
    async fn create_room(&self, name: &str) -> Result<Room, StoreError> {
        self.inner.create_room(name).await
    }

    async fn get_room(&self, room_id: Uuid) -> Result<Room, StoreError> {
        self.inner.get_room(room_id).await
    }

    async fn create_user(&self, room_id: Uuid, display_name: &str) -> Result<User, StoreError> {
        self.inner.create_user(room_id, display_name).await
    }

    async fn get_user(&self, user_id: Uuid) -> Result<User, StoreError> {
        self.inner.get_user(user_id).await
    }

    async fn rename_user(&self, user_id: Uuid, display_name: &str) -> Result<(), StoreError> {
        self.inner.rename_user(user_id, display_name).await
    }

    async fn upsert_option_for_user(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<RoomOption, StoreError> {
        if self.fail_option_writes.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner
            .upsert_option_for_user(room_id, user_id, content)
            .await
    }

    async fn upsert_vote_for_user(
        &self,
        user_id: Uuid,
        option_id: Uuid,
    ) -> Result<Vote, StoreError> {
        self.inner.upsert_vote_for_user(user_id, option_id).await
    }

    async fn full_room_state(&self, room_id: Uuid) -> Result<RoomSnapshot, StoreError> {
        if self.fail_room_state.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.full_room_state(room_id).await
    }

    async fn replace_user_dates(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        dates: &[String],
    ) -> Result<(), StoreError> {
        self.inner.replace_user_dates(room_id, user_id, dates).await
    }

    async fn room_dates(&self, room_id: Uuid) -> Result<RoomDates, StoreError> {
        self.inner.room_dates(room_id).await
    }
}
