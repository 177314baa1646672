//! Database entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Pc,
    Playstation,
    Xbox,
    NintendoSwitch,
    Mobile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ResponseStatus {
    /// Accepted and rejected responses can no longer change status.
    pub fn is_terminal(self) -> bool {
        match self {
            ResponseStatus::Pending => false,
            ResponseStatus::Accepted | ResponseStatus::Rejected => true,
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResponseStatus::Pending => "pending",
            ResponseStatus::Accepted => "accepted",
            ResponseStatus::Rejected => "rejected",
        })
    }
}

/// Public part of a user profile.
#[derive(Debug, Clone, FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub nickname: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Game {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub icon_url: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct GameApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub game_id: Uuid,
    pub title: String,
    pub description: String,
    pub min_players: i64,
    pub max_players: i64,
    pub accepted_players: i64,
    pub prime_time_start: DateTime<Utc>,
    pub prime_time_end: DateTime<Utc>,
    pub is_active: bool,
    pub is_full: bool,
    pub with_voice_chat: bool,
    pub platform: Platform,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub application_id: Uuid,
    pub user_id: Uuid,
    pub status: ResponseStatus,
    pub conversation_id: Option<Uuid>,
    pub opening_message_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub response_id: Uuid,
    pub participant1_id: Uuid,
    pub participant2_id: Uuid,
    pub last_message_at: Option<DateTime<Utc>>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.participant1_id == user_id || self.participant2_id == user_id
    }

    /// The participant that is not `user_id`.
    pub fn other_participant(&self, user_id: Uuid) -> Uuid {
        if self.participant1_id == user_id {
            self.participant2_id
        } else {
            self.participant1_id
        }
    }
}

/// Conversation row with the unread count of one participant attached.
#[derive(Debug, Clone, FromRow)]
pub struct ConversationWithUnread {
    #[sqlx(flatten)]
    pub conversation: Conversation,
    pub unread_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
