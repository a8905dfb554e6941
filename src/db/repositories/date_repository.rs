use crate::db::connection::DbPool;
use crate::db::models::AvailabilityDate;
use sqlx::Error;
use uuid::Uuid;

pub async fn replace_user_dates(
    pool: &DbPool,
    room_id: Uuid,
    user_id: Uuid,
    dates: &[String],
) -> Result<(), Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM dates WHERE room_id = $1 AND user_id = $2")
        .bind(room_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    for date in dates {
        sqlx::query("INSERT INTO dates (id, room_id, user_id, date) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(room_id)
            .bind(user_id)
            .bind(date)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn get_room_dates(pool: &DbPool, room_id: Uuid) -> Result<Vec<AvailabilityDate>, Error> {
    let rows = sqlx::query_as::<_, AvailabilityDate>(
        "SELECT id AS date_id, room_id, user_id, date FROM dates WHERE room_id = $1 ORDER BY seq",
    )
    .bind(room_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
