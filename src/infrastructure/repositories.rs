//! DB Repository abstractions

use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{
    ApplicationResponse, Conversation, ConversationWithUnread, Game, GameApplication, Message,
    ResponseStatus, UserProfile,
};
use crate::infrastructure::traits::{
    ApplicationFilter, ApplicationRepository, ConversationRepository, GameRepository,
    MessageRepository, ResponseRepository, StoreResult, UserRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use di::{Ref, injectable};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use uuid::Uuid;

#[injectable(UserRepository)]
pub struct DbUserRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbUserRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl UserRepository for DbUserRepository {
    async fn find_profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>> {
        sqlx::query_as("SELECT id, nickname, avatar_url, created_at FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn create_user(&self, user: UserProfile) -> StoreResult<UserProfile> {
        sqlx::query_as(
            "INSERT INTO users (id, nickname, avatar_url, created_at) VALUES (?, ?, ?, ?) RETURNING *",
        )
        .bind(user.id)
        .bind(user.nickname)
        .bind(user.avatar_url)
        .bind(user.created_at)
        .fetch_one(&**self.connection)
        .await
    }
}

#[injectable(GameRepository)]
pub struct DbGameRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbGameRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl GameRepository for DbGameRepository {
    async fn find_game(&self, game_id: Uuid) -> StoreResult<Option<Game>> {
        sqlx::query_as("SELECT * FROM games WHERE id = ?")
            .bind(game_id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn create_game(&self, game: Game) -> StoreResult<Game> {
        sqlx::query_as(
            "INSERT INTO games (id, name, slug, icon_url, is_active, created_at) VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(game.id)
        .bind(game.name)
        .bind(game.slug)
        .bind(game.icon_url)
        .bind(game.is_active)
        .bind(game.created_at)
        .fetch_one(&**self.connection)
        .await
    }
}

#[injectable(ApplicationRepository)]
pub struct DbApplicationRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbApplicationRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl ApplicationRepository for DbApplicationRepository {
    async fn find_application(&self, application_id: Uuid) -> StoreResult<Option<GameApplication>> {
        sqlx::query_as("SELECT * FROM game_applications WHERE id = ?")
            .bind(application_id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn list_active_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> StoreResult<Vec<GameApplication>> {
        let mut query =
            QueryBuilder::<Sqlite>::new("SELECT * FROM game_applications WHERE is_active = 1");
        if let Some(user_id) = filter.user_id {
            query.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(game_id) = filter.game_id {
            query.push(" AND game_id = ").push_bind(game_id);
        }
        if let Some(platform) = filter.platform {
            query.push(" AND platform = ").push_bind(platform);
        }
        if let Some(with_voice_chat) = filter.with_voice_chat {
            query.push(" AND with_voice_chat = ").push_bind(with_voice_chat);
        }
        query.push(" ORDER BY julianday(created_at) DESC, rowid DESC");

        query
            .build_query_as::<GameApplication>()
            .fetch_all(&**self.connection)
            .await
    }

    async fn list_user_applications(&self, user_id: Uuid) -> StoreResult<Vec<GameApplication>> {
        sqlx::query_as(
            "SELECT * FROM game_applications WHERE user_id = ? ORDER BY julianday(created_at) DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(&**self.connection)
        .await
    }

    async fn create_application(&self, application: GameApplication) -> StoreResult<GameApplication> {
        sqlx::query_as(
            "INSERT INTO game_applications (id, user_id, game_id, title, description, min_players, max_players, accepted_players, prime_time_start, prime_time_end, is_active, is_full, with_voice_chat, platform, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(application.id)
        .bind(application.user_id)
        .bind(application.game_id)
        .bind(application.title)
        .bind(application.description)
        .bind(application.min_players)
        .bind(application.max_players)
        .bind(application.accepted_players)
        .bind(application.prime_time_start)
        .bind(application.prime_time_end)
        .bind(application.is_active)
        .bind(application.is_full)
        .bind(application.with_voice_chat)
        .bind(application.platform)
        .bind(application.created_at)
        .bind(application.updated_at)
        .fetch_one(&**self.connection)
        .await
    }

    async fn save_application(
        &self,
        application: &GameApplication,
    ) -> StoreResult<Option<GameApplication>> {
        // is_full and the capacity guard read the stored counter, not the caller's copy
        sqlx::query_as(
            "UPDATE game_applications SET title = ?, description = ?, min_players = ?, max_players = ?, prime_time_start = ?, prime_time_end = ?, with_voice_chat = ?, platform = ?, is_active = ?, is_full = (accepted_players >= ?), updated_at = ? WHERE id = ? AND accepted_players <= ? RETURNING *",
        )
        .bind(&application.title)
        .bind(&application.description)
        .bind(application.min_players)
        .bind(application.max_players)
        .bind(application.prime_time_start)
        .bind(application.prime_time_end)
        .bind(application.with_voice_chat)
        .bind(application.platform)
        .bind(application.is_active)
        .bind(application.max_players)
        .bind(application.updated_at)
        .bind(application.id)
        .bind(application.max_players)
        .fetch_optional(&**self.connection)
        .await
    }

    async fn delete_application(&self, application_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM game_applications WHERE id = ?")
            .bind(application_id)
            .execute(&**self.connection)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn deactivate_application(
        &self,
        application_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE game_applications SET is_active = 0, updated_at = ? WHERE id = ?")
                .bind(now)
                .bind(application_id)
                .execute(&**self.connection)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn increment_accepted_players(
        &self,
        conn: &mut SqliteConnection,
        application_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        // SET expressions see the pre-update row
        let result = sqlx::query(
            "UPDATE game_applications SET accepted_players = accepted_players + 1, is_full = (accepted_players + 1 >= max_players), updated_at = ? WHERE id = ? AND accepted_players < max_players",
        )
        .bind(now)
        .bind(application_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[injectable(ResponseRepository)]
pub struct DbResponseRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbResponseRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl ResponseRepository for DbResponseRepository {
    async fn find_response(&self, response_id: Uuid) -> StoreResult<Option<ApplicationResponse>> {
        sqlx::query_as("SELECT * FROM application_responses WHERE id = ?")
            .bind(response_id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn find_user_response(
        &self,
        application_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<ApplicationResponse>> {
        sqlx::query_as(
            "SELECT * FROM application_responses WHERE application_id = ? AND user_id = ?",
        )
        .bind(application_id)
        .bind(user_id)
        .fetch_optional(&**self.connection)
        .await
    }

    async fn list_application_responses(
        &self,
        application_id: Uuid,
    ) -> StoreResult<Vec<ApplicationResponse>> {
        sqlx::query_as(
            "SELECT * FROM application_responses WHERE application_id = ? ORDER BY julianday(created_at) DESC, rowid DESC",
        )
        .bind(application_id)
        .fetch_all(&**self.connection)
        .await
    }

    async fn list_user_responses(&self, user_id: Uuid) -> StoreResult<Vec<ApplicationResponse>> {
        sqlx::query_as(
            "SELECT * FROM application_responses WHERE user_id = ? ORDER BY julianday(created_at) DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(&**self.connection)
        .await
    }

    async fn count_application_responses(&self, application_id: Uuid) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM application_responses WHERE application_id = ?")
            .bind(application_id)
            .fetch_one(&**self.connection)
            .await
    }

    async fn create_response(
        &self,
        conn: &mut SqliteConnection,
        response: ApplicationResponse,
    ) -> StoreResult<ApplicationResponse> {
        sqlx::query_as(
            "INSERT INTO application_responses (id, application_id, user_id, status, conversation_id, opening_message_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(response.id)
        .bind(response.application_id)
        .bind(response.user_id)
        .bind(response.status)
        .bind(response.conversation_id)
        .bind(response.opening_message_id)
        .bind(response.created_at)
        .bind(response.updated_at)
        .fetch_one(&mut *conn)
        .await
    }

    async fn attach_conversation(
        &self,
        conn: &mut SqliteConnection,
        response_id: Uuid,
        conversation_id: Uuid,
        opening_message_id: Uuid,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE application_responses SET conversation_id = ?, opening_message_id = ? WHERE id = ?",
        )
        .bind(conversation_id)
        .bind(opening_message_id)
        .bind(response_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn transition_status(
        &self,
        conn: &mut SqliteConnection,
        response_id: Uuid,
        from: ResponseStatus,
        to: ResponseStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE application_responses SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to)
        .bind(now)
        .bind(response_id)
        .bind(from)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[injectable(ConversationRepository)]
pub struct DbConversationRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbConversationRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl ConversationRepository for DbConversationRepository {
    async fn find_conversation(&self, conversation_id: Uuid) -> StoreResult<Option<Conversation>> {
        sqlx::query_as("SELECT * FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn find_active_between(
        &self,
        conn: &mut SqliteConnection,
        first_user: Uuid,
        second_user: Uuid,
    ) -> StoreResult<Option<Conversation>> {
        sqlx::query_as(
            "SELECT * FROM conversations WHERE is_archived = 0 AND ((participant1_id = ? AND participant2_id = ?) OR (participant1_id = ? AND participant2_id = ?)) ORDER BY julianday(created_at) ASC LIMIT 1",
        )
        .bind(first_user)
        .bind(second_user)
        .bind(second_user)
        .bind(first_user)
        .fetch_optional(&mut *conn)
        .await
    }

    async fn create_conversation(
        &self,
        conn: &mut SqliteConnection,
        conversation: Conversation,
    ) -> StoreResult<Conversation> {
        sqlx::query_as(
            "INSERT INTO conversations (id, response_id, participant1_id, participant2_id, last_message_at, is_archived, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(conversation.id)
        .bind(conversation.response_id)
        .bind(conversation.participant1_id)
        .bind(conversation.participant2_id)
        .bind(conversation.last_message_at)
        .bind(conversation.is_archived)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .fetch_one(&mut *conn)
        .await
    }

    async fn touch_conversation(
        &self,
        conn: &mut SqliteConnection,
        conversation_id: Uuid,
        last_message_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query("UPDATE conversations SET last_message_at = ?, updated_at = ? WHERE id = ?")
            .bind(last_message_at)
            .bind(last_message_at)
            .bind(conversation_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn archive_for_response(
        &self,
        conn: &mut SqliteConnection,
        response_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE conversations SET is_archived = 1, updated_at = ? WHERE response_id = ?",
        )
        .bind(now)
        .bind(response_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_user_conversations(&self, user_id: Uuid) -> StoreResult<Vec<ConversationWithUnread>> {
        sqlx::query_as(
            "SELECT c.*, (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id AND m.sender_id <> ? AND m.is_read = 0) AS unread_count FROM conversations c WHERE (c.participant1_id = ? OR c.participant2_id = ?) AND c.is_archived = 0 ORDER BY c.last_message_at IS NULL, julianday(c.last_message_at) DESC, c.rowid DESC",
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&**self.connection)
        .await
    }
}

#[injectable(MessageRepository)]
pub struct DbMessageRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbMessageRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl MessageRepository for DbMessageRepository {
    async fn find_message(&self, message_id: Uuid) -> StoreResult<Option<Message>> {
        sqlx::query_as("SELECT * FROM messages WHERE id = ?")
            .bind(message_id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn create_message(
        &self,
        conn: &mut SqliteConnection,
        message: Message,
    ) -> StoreResult<Message> {
        sqlx::query_as(
            "INSERT INTO messages (id, conversation_id, sender_id, content, is_read, read_at, created_at) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(message.content)
        .bind(message.is_read)
        .bind(message.read_at)
        .bind(message.created_at)
        .fetch_one(&mut *conn)
        .await
    }

    async fn last_message(&self, conversation_id: Uuid) -> StoreResult<Option<Message>> {
        sqlx::query_as(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY julianday(created_at) DESC, rowid DESC LIMIT 1",
        )
        .bind(conversation_id)
        .fetch_optional(&**self.connection)
        .await
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Message>> {
        sqlx::query_as(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY julianday(created_at) ASC, rowid ASC LIMIT ? OFFSET ?",
        )
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&**self.connection)
        .await
    }

    async fn count_messages(&self, conversation_id: Uuid) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = ?")
            .bind(conversation_id)
            .fetch_one(&**self.connection)
            .await
    }

    async fn mark_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = 1, read_at = ? WHERE conversation_id = ? AND sender_id <> ? AND is_read = 0",
        )
        .bind(read_at)
        .bind(conversation_id)
        .bind(reader_id)
        .execute(&**self.connection)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count_unread(&self, user_id: Uuid) -> StoreResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages m INNER JOIN conversations c ON c.id = m.conversation_id WHERE (c.participant1_id = ? OR c.participant2_id = ?) AND c.is_archived = 0 AND m.sender_id <> ? AND m.is_read = 0",
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_one(&**self.connection)
        .await
    }
}
