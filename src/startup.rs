use crate::config::Config;
use crate::db::models::RoomSnapshot;
use crate::error::StoreError;
use crate::store::Store;
use crate::ws::Hub;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub hub: Hub,
    pub config: Arc<Config>,
}

impl AppState {
    /// Spawns the Hub loop, so this must run inside a tokio runtime.
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        AppState {
            store,
            hub: Hub::spawn(),
            config: Arc::new(config),
        }
    }

    /// Re-reads the room and pushes it to every connection in it.
    pub async fn publish_room_state(
        &self,
        room_id: Uuid,
        reveal_votes: bool,
    ) -> Result<(), StoreError> {
        let snapshot: RoomSnapshot = self.store.full_room_state(room_id).await?;
        let snapshot = if reveal_votes {
            snapshot.revealed()
        } else {
            snapshot
        };
        self.hub.broadcast(room_id, snapshot);
        Ok(())
    }
}
