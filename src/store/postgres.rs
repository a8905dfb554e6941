use super::Store;
use crate::db;
use crate::db::connection::DbPool;
use crate::db::models::{Room, RoomDates, RoomOption, RoomSnapshot, User, Vote, group_dates};
use crate::error::StoreError;
use async_trait::async_trait;
use tokio::time::{Duration, interval};
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = db::init_db(database_url).await?;
        Ok(Self { pool })
    }

    /// Periodically checks out a connection so a dead database shows up in the logs.
    pub fn spawn_health_check(&self) {
        let pool = self.pool.clone();
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                match pool.acquire().await {
                    Ok(conn) => {
                        drop(conn);
                    }
                    Err(e) => {
                        error!("Database connection health check failed: {}", e);
                    }
                }
            }
        });
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_room(&self, name: &str) -> Result<Room, StoreError> {
        Ok(db::create_room(&self.pool, name).await?)
    }

    async fn get_room(&self, room_id: Uuid) -> Result<Room, StoreError> {
        db::get_room(&self.pool, room_id)
            .await?
            .ok_or(StoreError::RoomNotFound)
    }

    async fn create_user(&self, room_id: Uuid, display_name: &str) -> Result<User, StoreError> {
        self.get_room(room_id).await?;
        Ok(db::create_user(&self.pool, room_id, display_name).await?)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<User, StoreError> {
        db::get_user(&self.pool, user_id)
            .await?
            .ok_or(StoreError::UserNotFound)
    }

    async fn rename_user(&self, user_id: Uuid, display_name: &str) -> Result<(), StoreError> {
        match db::rename_user(&self.pool, user_id, display_name).await? {
            true => Ok(()),
            false => Err(StoreError::UserNotFound),
        }
    }

    async fn upsert_option_for_user(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<RoomOption, StoreError> {
        match db::upsert_option_for_user(&self.pool, room_id, user_id, content).await {
            Ok(option) => Ok(option),
            Err(sqlx::Error::RowNotFound) => Err(StoreError::UserNotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert_vote_for_user(
        &self,
        user_id: Uuid,
        option_id: Uuid,
    ) -> Result<Vote, StoreError> {
        match db::upsert_vote_for_user(&self.pool, user_id, option_id).await {
            Ok(vote) => Ok(vote),
            Err(sqlx::Error::RowNotFound) => Err(StoreError::OptionNotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn full_room_state(&self, room_id: Uuid) -> Result<RoomSnapshot, StoreError> {
        let room = self.get_room(room_id).await?;
        let users = db::get_room_users(&self.pool, room_id).await?;
        let options = db::get_room_options(&self.pool, room_id).await?;
        let votes = db::get_room_votes(&self.pool, room_id).await?;

        Ok(RoomSnapshot {
            room_name: room.name,
            users,
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
        Ok(db::replace_user_dates(&self.pool, room_id, user_id, dates).await?)
    }

    async fn room_dates(&self, room_id: Uuid) -> Result<RoomDates, StoreError> {
        let users = db::get_room_users(&self.pool, room_id).await?;
        let dates = db::get_room_dates(&self.pool, room_id).await?;
        Ok(group_dates(room_id, &users, &dates))
    }
}
