//! Shared test fixtures
//!
//! Every test gets its own in-memory database. The pool holds exactly one connection that
//! never expires, so the database lives as long as the pool does.

#![allow(dead_code)]

use chrono::{Duration, Utc};
use di::Ref;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use teamup_api::core::models::{ApplicationFields, NewApplication};
use teamup_api::core::services::{
    MyApplicationService, MyConversationService, MyMessageService, MyResponseService,
};
use teamup_api::core::traits::{
    ApplicationService, ConversationService, MessageService, ResponseService,
};
use teamup_api::infrastructure::database::DatabaseConnection;
use teamup_api::infrastructure::entities::{Game, Platform, UserProfile};
use teamup_api::infrastructure::repositories::{
    DbApplicationRepository, DbConversationRepository, DbGameRepository, DbMessageRepository,
    DbResponseRepository, DbUserRepository,
};
use teamup_api::infrastructure::traits::{
    ApplicationRepository, ConversationRepository, GameRepository, MessageRepository,
    ResponseRepository, UserRepository,
};
use uuid::Uuid;

/// Setup test database with migrations
pub async fn setup_test_db() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();

    sqlx::migrate!().run(&pool).await.unwrap();
    pool
}

/// Setup a migrated file database allowing concurrent connections
pub async fn setup_file_db(dir: &Path) -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(dir.join("teamup.db"))
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(10));

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .unwrap();

    sqlx::migrate!().run(&pool).await.unwrap();
    pool
}

/// Repositories and services wired by hand over one pool.
pub struct TestApp {
    pub pool: SqlitePool,
    pub connection: Ref<DatabaseConnection>,
    pub users: Ref<dyn UserRepository>,
    pub games: Ref<dyn GameRepository>,
    pub application_repo: Ref<dyn ApplicationRepository>,
    pub response_repo: Ref<dyn ResponseRepository>,
    pub conversation_repo: Ref<dyn ConversationRepository>,
    pub message_repo: Ref<dyn MessageRepository>,
    pub applications: Ref<dyn ApplicationService>,
    pub responses: Ref<dyn ResponseService>,
    pub conversations: Ref<dyn ConversationService>,
    pub messages: Ref<dyn MessageService>,
}

impl TestApp {
    pub async fn new() -> TestApp {
        TestApp::with_pool(setup_test_db().await)
    }

    /// Services over a file database in `dir` whose pool hands out several
    /// connections, so writers really contend.
    pub async fn on_disk(dir: &Path) -> TestApp {
        TestApp::with_pool(setup_file_db(dir).await)
    }

    pub fn with_pool(pool: SqlitePool) -> TestApp {
        let connection = Ref::new(DatabaseConnection::from_pool(pool.clone()));

        let users: Ref<dyn UserRepository> =
            Ref::new(DbUserRepository::new(connection.clone()));
        let games: Ref<dyn GameRepository> =
            Ref::new(DbGameRepository::new(connection.clone()));
        let application_repo: Ref<dyn ApplicationRepository> =
            Ref::new(DbApplicationRepository::new(connection.clone()));
        let response_repo: Ref<dyn ResponseRepository> =
            Ref::new(DbResponseRepository::new(connection.clone()));
        let conversation_repo: Ref<dyn ConversationRepository> =
            Ref::new(DbConversationRepository::new(connection.clone()));
        let message_repo: Ref<dyn MessageRepository> =
            Ref::new(DbMessageRepository::new(connection.clone()));

        let conversations: Ref<dyn ConversationService> = Ref::new(MyConversationService::new(
            conversation_repo.clone(),
            message_repo.clone(),
            response_repo.clone(),
            application_repo.clone(),
            games.clone(),
            users.clone(),
        ));
        let messages: Ref<dyn MessageService> = Ref::new(MyMessageService::new(
            connection.clone(),
            conversation_repo.clone(),
            message_repo.clone(),
        ));
        let applications: Ref<dyn ApplicationService> = Ref::new(MyApplicationService::new(
            application_repo.clone(),
            response_repo.clone(),
            message_repo.clone(),
            games.clone(),
            users.clone(),
        ));

        let responses = response_service(
            &connection,
            &application_repo,
            &response_repo,
            &conversation_repo,
            &message_repo,
            &games,
            &users,
            &conversations,
            messages.clone(),
        );

        TestApp {
            pool,
            connection,
            users,
            games,
            application_repo,
            response_repo,
            conversation_repo,
            message_repo,
            applications,
            responses,
            conversations,
            messages,
        }
    }

    /// A response service whose message persistence goes through `messages`.
    pub fn response_service_with(
        &self,
        messages: Ref<dyn MessageService>,
    ) -> Ref<dyn ResponseService> {
        response_service(
            &self.connection,
            &self.application_repo,
            &self.response_repo,
            &self.conversation_repo,
            &self.message_repo,
            &self.games,
            &self.users,
            &self.conversations,
            messages,
        )
    }

    pub async fn create_user(&self, nickname: &str) -> Uuid {
        self.users
            .create_user(UserProfile {
                id: Uuid::new_v4(),
                nickname: nickname.to_owned(),
                avatar_url: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap()
            .id
    }

    pub async fn create_game(&self, slug: &str) -> Uuid {
        self.games
            .create_game(Game {
                id: Uuid::new_v4(),
                name: slug.to_uppercase(),
                slug: slug.to_owned(),
                icon_url: format!("https://cdn.example.com/{slug}.png"),
                is_active: true,
                created_at: Utc::now(),
            })
            .await
            .unwrap()
            .id
    }

    /// Creates an application with `max_players` slots owned by `owner_id`.
    pub async fn create_application(&self, owner_id: Uuid, game_id: Uuid, max_players: i64) -> Uuid {
        self.applications
            .create_application(owner_id, new_application(game_id, max_players))
            .await
            .unwrap()
            .application
            .id
    }
}

pub fn application_fields(max_players: i64) -> ApplicationFields {
    let start = Utc::now() + Duration::hours(2);
    ApplicationFields {
        title: "Ranked duo tonight".to_owned(),
        description: "Looking for a calm support player".to_owned(),
        min_players: 1,
        max_players,
        prime_time_start: start,
        prime_time_end: start + Duration::hours(3),
        with_voice_chat: true,
        platform: Platform::Pc,
    }
}

pub fn new_application(game_id: Uuid, max_players: i64) -> NewApplication {
    NewApplication {
        game_id,
        fields: application_fields(max_players),
    }
}

#[allow(clippy::too_many_arguments)]
fn response_service(
    connection: &Ref<DatabaseConnection>,
    application_repo: &Ref<dyn ApplicationRepository>,
    response_repo: &Ref<dyn ResponseRepository>,
    conversation_repo: &Ref<dyn ConversationRepository>,
    message_repo: &Ref<dyn MessageRepository>,
    games: &Ref<dyn GameRepository>,
    users: &Ref<dyn UserRepository>,
    conversations: &Ref<dyn ConversationService>,
    messages: Ref<dyn MessageService>,
) -> Ref<dyn ResponseService> {
    Ref::new(MyResponseService::new(
        connection.clone(),
        application_repo.clone(),
        response_repo.clone(),
        conversation_repo.clone(),
        message_repo.clone(),
        games.clone(),
        users.clone(),
        conversations.clone(),
        messages,
    ))
}
