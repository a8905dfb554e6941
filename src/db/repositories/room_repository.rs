use crate::db::connection::DbPool;
use crate::db::models::Room;
use sqlx::Error;
use uuid::Uuid;

pub async fn create_room(pool: &DbPool, name: &str) -> Result<Room, Error> {
    let room_id = Uuid::new_v4();

    sqlx::query("INSERT INTO rooms (id, name) VALUES ($1, $2)")
        .bind(room_id)
        .bind(name)
        .execute(pool)
        .await?;

    Ok(Room {
        room_id,
        name: name.to_string(),
    })
}

pub async fn get_room(pool: &DbPool, room_id: Uuid) -> Result<Option<Room>, Error> {
    let row = sqlx::query_as::<_, Room>("SELECT id AS room_id, name FROM rooms WHERE id = $1")
        .bind(room_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}
