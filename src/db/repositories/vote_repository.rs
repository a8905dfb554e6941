use crate::db::connection::DbPool;
use crate::db::models::Vote;
use sqlx::Error;
use uuid::Uuid;

/// Points the user's single vote at `option_id`, creating it if needed.
///
/// Fails with `RowNotFound` when the option is not part of the user's room.
pub async fn upsert_vote_for_user(
    pool: &DbPool,
    user_id: Uuid,
    option_id: Uuid,
) -> Result<Vote, Error> {
    let mut tx = pool.begin().await?;

    let option = sqlx::query(
        r#"
        SELECT o.id FROM options o
        JOIN users u ON u.room_id = o.room_id
        WHERE o.id = $1 AND u.id = $2
        FOR SHARE OF o
        "#,
    )
    .bind(option_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    if option.is_none() {
        tx.rollback().await?;
        return Err(sqlx::Error::RowNotFound);
    }

    let vote = sqlx::query_as::<_, Vote>(
        r#"
        INSERT INTO votes (id, option_id, user_id) VALUES ($1, $2, $3)
        ON CONFLICT (user_id) DO UPDATE SET option_id = EXCLUDED.option_id
        RETURNING id AS vote_id, option_id, user_id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(option_id)
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(vote)
}

pub async fn get_room_votes(pool: &DbPool, room_id: Uuid) -> Result<Vec<Vote>, Error> {
    let rows = sqlx::query_as::<_, Vote>(
        r#"
        SELECT v.id AS vote_id, v.option_id, v.user_id
        FROM votes v
        JOIN options o ON v.option_id = o.id
        WHERE o.room_id = $1
        ORDER BY v.created_at, v.id
        "#,
    )
    .bind(room_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
