use crate::db::connection::DbPool;
use crate::db::models::User;
use sqlx::Error;
use uuid::Uuid;

pub async fn create_user(pool: &DbPool, room_id: Uuid, display_name: &str) -> Result<User, Error> {
    let user_id = Uuid::new_v4();

    sqlx::query("INSERT INTO users (id, room_id, display_name) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(room_id)
        .bind(display_name)
        .execute(pool)
        .await?;

    Ok(User {
        user_id,
        room_id,
        display_name: display_name.to_string(),
    })
}

pub async fn get_user(pool: &DbPool, user_id: Uuid) -> Result<Option<User>, Error> {
    let row = sqlx::query_as::<_, User>(
        "SELECT id AS user_id, room_id, display_name FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn get_room_users(pool: &DbPool, room_id: Uuid) -> Result<Vec<User>, Error> {
    let rows = sqlx::query_as::<_, User>(
        "SELECT id AS user_id, room_id, display_name FROM users WHERE room_id = $1 ORDER BY created_at, id",
    )
    .bind(room_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns `false` when no such user exists.
pub async fn rename_user(pool: &DbPool, user_id: Uuid, display_name: &str) -> Result<bool, Error> {
    let result = sqlx::query("UPDATE users SET display_name = $1 WHERE id = $2")
        .bind(display_name)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
