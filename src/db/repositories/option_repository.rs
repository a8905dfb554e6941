use crate::db::connection::DbPool;
use crate::db::models::RoomOption;
use sqlx::Error;
use uuid::Uuid;

/// Inserts the user's option for the room or replaces its content.
///
/// Fails with `RowNotFound` when the user is not a member of the room.
pub async fn upsert_option_for_user(
    pool: &DbPool,
    room_id: Uuid,
    user_id: Uuid,
    content: &str,
) -> Result<RoomOption, Error> {
    let mut tx = pool.begin().await?;

    let member = sqlx::query("SELECT id FROM users WHERE id = $1 AND room_id = $2 FOR SHARE")
        .bind(user_id)
        .bind(room_id)
        .fetch_optional(&mut *tx)
        .await?;

    if member.is_none() {
        tx.rollback().await?;
        return Err(sqlx::Error::RowNotFound);
    }

    let option = sqlx::query_as::<_, RoomOption>(
        r#"
        INSERT INTO options (id, room_id, user_id, content) VALUES ($1, $2, $3, $4)
        ON CONFLICT (room_id, user_id) DO UPDATE SET content = EXCLUDED.content
        RETURNING id AS option_id, room_id, user_id, content
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(room_id)
    .bind(user_id)
    .bind(content)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(option)
}

pub async fn get_room_options(pool: &DbPool, room_id: Uuid) -> Result<Vec<RoomOption>, Error> {
    let rows = sqlx::query_as::<_, RoomOption>(
        "SELECT id AS option_id, room_id, user_id, content FROM options WHERE room_id = $1 ORDER BY created_at, id",
    )
    .bind(room_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
