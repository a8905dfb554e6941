use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: Uuid,
    pub room_id: Uuid,
    pub display_name: String,
}

/// A proposed choice. At most one per (room, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoomOption {
    #[serde(rename = "id")]
    pub option_id: Uuid,
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
}

/// A user's current choice. At most one per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub vote_id: Uuid,
    pub option_id: Uuid,
    pub user_id: Uuid,
}

/// Complete state of a room as pushed to clients.
///
/// Never persisted. `reveal_votes` is decided per broadcast and is `false`
/// whenever the snapshot comes straight from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_name: String,
    pub users: Vec<User>,
    pub options: Vec<RoomOption>,
    pub votes: Vec<Vote>,
    #[serde(default)]
    pub reveal_votes: bool,
}

impl RoomSnapshot {
    pub fn revealed(mut self) -> Self {
        self.reveal_votes = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityDate {
    pub date_id: Uuid,
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWithUsers {
    pub date: String,
    pub users: Vec<User>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDates {
    pub room_id: Uuid,
    pub dates: Vec<DateWithUsers>,
}

/// Groups availability rows by date string, walking users in order so the
/// first user to mention a date decides where that date lands.
pub fn group_dates(room_id: Uuid, users: &[User], dates: &[AvailabilityDate]) -> RoomDates {
    let mut grouped: Vec<DateWithUsers> = Vec::new();

    for user in users {
        for date in dates.iter().filter(|d| d.user_id == user.user_id) {
            match grouped.iter_mut().find(|g| g.date == date.date) {
                Some(group) => group.users.push(user.clone()),
                None => grouped.push(DateWithUsers {
                    date: date.date.clone(),
                    users: vec![user.clone()],
                }),
            }
        }
    }

    RoomDates {
        room_id,
        dates: grouped,
    }
}
