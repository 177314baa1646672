//! Infrastructure traits, used for DI on higher levels
//!
//! Methods taking a `&mut SqliteConnection` are meant to run inside a caller
//! owned transaction; everything else reads from the pool.

use crate::infrastructure::entities;
use crate::infrastructure::entities::Platform;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

pub type StoreResult<T> = Result<T, sqlx::Error>;

/// Equality filters for the public application listing.
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    /// Owner of the applications.
    pub user_id: Option<Uuid>,
    pub game_id: Option<Uuid>,
    pub platform: Option<Platform>,
    pub with_voice_chat: Option<bool>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_profile(&self, user_id: Uuid) -> StoreResult<Option<entities::UserProfile>>;

    async fn create_user(&self, user: entities::UserProfile) -> StoreResult<entities::UserProfile>;
}

#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn find_game(&self, game_id: Uuid) -> StoreResult<Option<entities::Game>>;

    async fn create_game(&self, game: entities::Game) -> StoreResult<entities::Game>;
}

#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn find_application(
        &self,
        application_id: Uuid,
    ) -> StoreResult<Option<entities::GameApplication>>;

    /// Active applications matching `filter`, newest first.
    async fn list_active_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> StoreResult<Vec<entities::GameApplication>>;

    /// All applications owned by `user_id`, newest first.
    async fn list_user_applications(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Vec<entities::GameApplication>>;

    async fn create_application(
        &self,
        application: entities::GameApplication,
    ) -> StoreResult<entities::GameApplication>;

    /// Saves the owner editable columns plus `is_full`.
    ///
    /// Returns `None` when the row is gone or already holds more accepted players
    /// than the new `max_players`.
    async fn save_application(
        &self,
        application: &entities::GameApplication,
    ) -> StoreResult<Option<entities::GameApplication>>;

    async fn delete_application(&self, application_id: Uuid) -> StoreResult<bool>;

    async fn deactivate_application(
        &self,
        application_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Adds one accepted player unless the application is already at capacity.
    ///
    /// Returns `false` when the application is full (or missing).
    async fn increment_accepted_players(
        &self,
        conn: &mut SqliteConnection,
        application_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;
}

#[async_trait]
pub trait ResponseRepository: Send + Sync {
    async fn find_response(
        &self,
        response_id: Uuid,
    ) -> StoreResult<Option<entities::ApplicationResponse>>;

    async fn find_user_response(
        &self,
        application_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<entities::ApplicationResponse>>;

    /// Responses to an application, newest first.
    async fn list_application_responses(
        &self,
        application_id: Uuid,
    ) -> StoreResult<Vec<entities::ApplicationResponse>>;

    /// Responses written by `user_id`, newest first.
    async fn list_user_responses(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Vec<entities::ApplicationResponse>>;

    async fn count_application_responses(&self, application_id: Uuid) -> StoreResult<i64>;

    async fn create_response(
        &self,
        conn: &mut SqliteConnection,
        response: entities::ApplicationResponse,
    ) -> StoreResult<entities::ApplicationResponse>;

    async fn attach_conversation(
        &self,
        conn: &mut SqliteConnection,
        response_id: Uuid,
        conversation_id: Uuid,
        opening_message_id: Uuid,
    ) -> StoreResult<()>;

    /// Moves a response from `from` to `to`.
    ///
    /// Returns `false` if the response was not in `from` any more.
    async fn transition_status(
        &self,
        conn: &mut SqliteConnection,
        response_id: Uuid,
        from: entities::ResponseStatus,
        to: entities::ResponseStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find_conversation(
        &self,
        conversation_id: Uuid,
    ) -> StoreResult<Option<entities::Conversation>>;

    /// The non-archived conversation between two users, in either participant order.
    async fn find_active_between(
        &self,
        conn: &mut SqliteConnection,
        first_user: Uuid,
        second_user: Uuid,
    ) -> StoreResult<Option<entities::Conversation>>;

    async fn create_conversation(
        &self,
        conn: &mut SqliteConnection,
        conversation: entities::Conversation,
    ) -> StoreResult<entities::Conversation>;

    async fn touch_conversation(
        &self,
        conn: &mut SqliteConnection,
        conversation_id: Uuid,
        last_message_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Archives the conversation opened by the response.
    ///
    /// Returns `false` if the response did not open one.
    async fn archive_for_response(
        &self,
        conn: &mut SqliteConnection,
        response_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Non-archived conversations of `user_id` with their unread counts, most
    /// recently active first.
    async fn list_user_conversations(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Vec<entities::ConversationWithUnread>>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn find_message(&self, message_id: Uuid) -> StoreResult<Option<entities::Message>>;

    async fn create_message(
        &self,
        conn: &mut SqliteConnection,
        message: entities::Message,
    ) -> StoreResult<entities::Message>;

    async fn last_message(&self, conversation_id: Uuid) -> StoreResult<Option<entities::Message>>;

    /// One page of a conversation, oldest first.
    async fn list_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<entities::Message>>;

    async fn count_messages(&self, conversation_id: Uuid) -> StoreResult<i64>;

    /// Marks every unread message not sent by `reader_id` as read in one statement.
    async fn mark_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> StoreResult<u64>;

    /// Unread messages addressed to `user_id` across their non-archived conversations.
    async fn count_unread(&self, user_id: Uuid) -> StoreResult<i64>;
}
