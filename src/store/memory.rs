use super::Store;
use crate::db::models::{
    AvailabilityDate, Room, RoomDates, RoomOption, RoomSnapshot, User, Vote, group_dates,
};
use crate::error::StoreError;
use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    rooms: Vec<Room>,
    users: Vec<User>,
    options: Vec<RoomOption>,
    votes: Vec<Vote>,
    dates: Vec<AvailabilityDate>,
}

impl Tables {
    fn room(&self, room_id: Uuid) -> Result<&Room, StoreError> {
        self.rooms
            .iter()
            .find(|r| r.room_id == room_id)
            .ok_or(StoreError::RoomNotFound)
    }

    fn user(&self, user_id: Uuid) -> Result<&User, StoreError> {
        self.users
            .iter()
            .find(|u| u.user_id == user_id)
            .ok_or(StoreError::UserNotFound)
    }

    fn room_users(&self, room_id: Uuid) -> Vec<User> {
        self.users
            .iter()
            .filter(|u| u.room_id == room_id)
            .cloned()
            .collect()
    }
}

/// Process-local store. One lock around all tables gives every operation
/// serializable isolation.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_room(&self, name: &str) -> Result<Room, StoreError> {
        let room = Room {
            room_id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.tables.lock().await.rooms.push(room.clone());
        Ok(room)
    }

    async fn get_room(&self, room_id: Uuid) -> Result<Room, StoreError> {
        self.tables.lock().await.room(room_id).cloned()
    }

    async fn create_user(&self, room_id: Uuid, display_name: &str) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.room(room_id)?;

        let user = User {
            user_id: Uuid::new_v4(),
            room_id,
            display_name: display_name.to_string(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<User, StoreError> {
        self.tables.lock().await.user(user_id).cloned()
    }

    async fn rename_user(&self, user_id: Uuid, display_name: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or(StoreError::UserNotFound)?;
        user.display_name = display_name.to_string();
        Ok(())
    }

    async fn upsert_option_for_user(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<RoomOption, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.user(user_id)?.room_id != room_id {
            return Err(StoreError::UserNotFound);
        }

        if let Some(existing) = tables
            .options
            .iter_mut()
            .find(|o| o.room_id == room_id && o.user_id == user_id)
        {
            existing.content = content.to_string();
            return Ok(existing.clone());
        }

        let option = RoomOption {
            option_id: Uuid::new_v4(),
            room_id,
            user_id,
            content: content.to_string(),
        };
        tables.options.push(option.clone());
        Ok(option)
    }

    async fn upsert_vote_for_user(
        &self,
        user_id: Uuid,
        option_id: Uuid,
    ) -> Result<Vote, StoreError> {
        let mut tables = self.tables.lock().await;
        let room_id = tables.user(user_id)?.room_id;
        if !tables
            .options
            .iter()
            .any(|o| o.option_id == option_id && o.room_id == room_id)
        {
            return Err(StoreError::OptionNotFound);
        }

        if let Some(existing) = tables.votes.iter_mut().find(|v| v.user_id == user_id) {
            existing.option_id = option_id;
            return Ok(existing.clone());
        }

        let vote = Vote {
            vote_id: Uuid::new_v4(),
            option_id,
            user_id,
        };
        tables.votes.push(vote.clone());
        Ok(vote)
    }

    async fn full_room_state(&self, room_id: Uuid) -> Result<RoomSnapshot, StoreError> {
        let tables = self.tables.lock().await;
        let room = tables.room(room_id)?;

        let options: Vec<RoomOption> = tables
            .options
            .iter()
            .filter(|o| o.room_id == room_id)
            .cloned()
            .collect();
        let votes = tables
            .votes
            .iter()
            .filter(|v| options.iter().any(|o| o.option_id == v.option_id))
            .cloned()
            .collect();

        Ok(RoomSnapshot {
            room_name: room.name.clone(),
            users: tables.room_users(room_id),
            options,
            votes,
            reveal_votes: false,
        })
    }

    async fn replace_user_dates(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        dates: &[String],
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.user(user_id)?.room_id != room_id {
            return Err(StoreError::UserNotFound);
        }

        tables
            .dates
            .retain(|d| !(d.room_id == room_id && d.user_id == user_id));
        tables
            .dates
            .extend(dates.iter().map(|date| AvailabilityDate {
                date_id: Uuid::new_v4(),
                room_id,
                user_id,
                date: date.clone(),
            }));
        Ok(())
    }

    async fn room_dates(&self, room_id: Uuid) -> Result<RoomDates, StoreError> {
        let tables = self.tables.lock().await;
        Ok(group_dates(room_id, &tables.room_users(room_id), &tables.dates))
    }
}
