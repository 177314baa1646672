//! API Integration Tests
//!
//! Drives the HTTP API through the DI provider against an in-memory database.
//!
//! Tests are serialized because they share a global test pool: the DI-created
//! `DatabaseConnection` picks up whatever `DatabaseConnection::set_test_pool()` installed.

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::TestApp;
use di::{Injectable, ServiceCollection};
use di_axum::RouterServiceProviderExtensions;
use serde_json::{Value, json};
use serial_test::serial;
use teamup_api::{
    api,
    config::AppConfig,
    core::services::{
        MyApplicationService, MyConversationService, MyMessageService, MyResponseService,
    },
    infrastructure::database::DatabaseConnection,
    infrastructure::repositories::{
        DbApplicationRepository, DbConversationRepository, DbGameRepository, DbMessageRepository,
        DbResponseRepository, DbUserRepository,
    },
};
use tower::ServiceExt;
use uuid::Uuid;

/// Setup test database and install it as the DI test pool
async fn setup() -> TestApp {
    let app = TestApp::new().await;
    DatabaseConnection::set_test_pool(app.pool.clone());
    app
}

/// Clean up after test
fn cleanup_test_db() {
    DatabaseConnection::clear_test_pool();
}

/// Create test app - uses the global test pool set by setup()
fn create_test_app() -> axum::Router {
    let provider = ServiceCollection::new()
        .add(AppConfig::singleton())
        .add(DatabaseConnection::singleton())
        .add(DbUserRepository::scoped())
        .add(DbGameRepository::scoped())
        .add(DbApplicationRepository::scoped())
        .add(DbResponseRepository::scoped())
        .add(DbConversationRepository::scoped())
        .add(DbMessageRepository::scoped())
        .add(MyConversationService::scoped())
        .add(MyMessageService::scoped())
        .add(MyResponseService::scoped())
        .add(MyApplicationService::scoped())
        .build_provider()
        .unwrap();

    axum::Router::new()
        .nest("/api", api::router())
        .with_provider(provider)
}

async fn send(
    router: &axum::Router,
    method: Method,
    uri: &str,
    user: Option<Uuid>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        request = request.header("X-User-ID", user.to_string());
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn application_body(game_id: Uuid, max_players: i64) -> Value {
    json!({
        "game_id": game_id,
        "title": "Weekend raid",
        "description": "Clearing the new raid on normal",
        "min_players": 1,
        "max_players": max_players,
        "prime_time_start": "2030-01-04T18:00:00Z",
        "prime_time_end": "2030-01-04T22:00:00Z",
        "with_voice_chat": true,
        "platform": "pc"
    })
}

#[tokio::test]
#[serial]
async fn test_list_conversations_empty() {
    let app = setup().await;
    let router = create_test_app();
    let user = app.create_user("lonely").await;

    let (status, json) = send(&router, Method::GET, "/api/conversations", Some(user), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["conversations"].as_array().unwrap().len(), 0);

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_requires_auth() {
    let _app = setup().await;
    let router = create_test_app();

    let (status, json) = send(&router, Method::GET, "/api/conversations", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].as_str().unwrap().contains("X-User-ID"));

    let (status, _) = send(&router, Method::GET, "/api/responses/my", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_public_listing_without_identity() {
    let app = setup().await;
    let router = create_test_app();
    let owner = app.create_user("owner").await;
    let game = app.create_game("dota-2").await;
    app.create_application(owner, game, 4).await;

    let (status, json) = send(&router, Method::GET, "/api/applications", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let applications = json["applications"].as_array().unwrap();
    assert_eq!(applications.len(), 1);
    assert_eq!(applications[0]["game"]["slug"], "dota-2");
    assert_eq!(applications[0]["owner"]["nickname"], "owner");

    let (status, json) = send(
        &router,
        Method::GET,
        "/api/applications?platform=xbox",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["applications"].as_array().unwrap().len(), 0);

    let (status, json) = send(
        &router,
        Method::GET,
        "/api/applications?platform=amiga",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_response_flow() {
    let app = setup().await;
    let router = create_test_app();
    let owner = app.create_user("owner").await;
    let responder = app.create_user("responder").await;
    let game = app.create_game("dota-2").await;

    let (status, json) = send(
        &router,
        Method::POST,
        "/api/applications",
        Some(owner),
        Some(application_body(game, 2)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let application_id = json["id"].as_str().unwrap().to_owned();
    assert_eq!(json["accepted_players"], 0);
    assert_eq!(json["is_full"], false);

    let responses_uri = format!("/api/applications/{application_id}/responses");

    let (status, json) = send(
        &router,
        Method::POST,
        &responses_uri,
        Some(responder),
        Some(json!({ "message": "too short" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("10"));

    let (status, json) = send(
        &router,
        Method::POST,
        &responses_uri,
        Some(owner),
        Some(json!({ "message": "Responding to myself here" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "cannot respond to own application");

    let (status, json) = send(
        &router,
        Method::POST,
        &responses_uri,
        Some(responder),
        Some(json!({ "message": "I main support, 5k MMR" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "pending");
    assert_eq!(json["message"], "I main support, 5k MMR");
    let response_id = json["id"].as_str().unwrap().to_owned();
    let conversation_id = json["conversation_id"].as_str().unwrap().to_owned();

    let (status, json) = send(
        &router,
        Method::POST,
        &responses_uri,
        Some(responder),
        Some(json!({ "message": "I main support, 5k MMR" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "already responded");

    let (status, json) = send(&router, Method::GET, &responses_uri, Some(responder), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json["error"].is_string());

    let (status, json) = send(&router, Method::GET, &responses_uri, Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["responses"].as_array().unwrap().len(), 1);

    let response_uri = format!("/api/responses/{response_id}");

    let (status, _) = send(
        &router,
        Method::PATCH,
        &response_uri,
        Some(owner),
        Some(json!({ "status": "maybe" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &router,
        Method::PATCH,
        &response_uri,
        Some(responder),
        Some(json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = send(
        &router,
        Method::PATCH,
        &response_uri,
        Some(owner),
        Some(json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "accepted");
    assert_eq!(json["application"]["accepted_players"], 1);

    let (status, _) = send(
        &router,
        Method::PATCH,
        &response_uri,
        Some(owner),
        Some(json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(&router, Method::GET, "/api/responses/my", Some(responder), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["responses"][0]["status"], "accepted");

    // messaging over the conversation the response opened
    let (status, json) = send(
        &router,
        Method::GET,
        "/api/conversations/unread-count",
        Some(owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);

    let messages_uri = format!("/api/conversations/{conversation_id}/messages");
    let (status, json) = send(
        &router,
        Method::POST,
        &messages_uri,
        Some(owner),
        Some(json!({ "content": "Welcome! Invite sent." })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["content"], "Welcome! Invite sent.");

    let (status, json) = send(
        &router,
        Method::GET,
        &format!("{messages_uri}?limit=1&offset=0"),
        Some(responder),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 2);
    assert_eq!(json["limit"], 1);
    assert_eq!(json["has_more"], true);
    assert_eq!(json["messages"][0]["content"], "I main support, 5k MMR");

    let read_uri = format!("/api/conversations/{conversation_id}/read");
    let (status, json) = send(&router, Method::PATCH, &read_uri, Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["marked"], 1);

    let (status, json) = send(&router, Method::PATCH, &read_uri, Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["marked"], 0);

    let (status, json) = send(
        &router,
        Method::GET,
        &format!("/api/conversations/{conversation_id}"),
        Some(responder),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["participant1"]["nickname"], "owner");
    assert_eq!(json["participant2"]["nickname"], "responder");
    assert_eq!(json["game"]["slug"], "dota-2");

    let (status, json) = send(&router, Method::GET, "/api/conversations", Some(responder), None).await;
    assert_eq!(status, StatusCode::OK);
    let conversations = json["conversations"].as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["other_user"]["nickname"], "owner");
    assert_eq!(conversations[0]["unread_count"], 1);

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_application_management() {
    let app = setup().await;
    let router = create_test_app();
    let owner = app.create_user("owner").await;
    let other = app.create_user("other").await;
    let game = app.create_game("cs2").await;

    let (status, json) = send(
        &router,
        Method::POST,
        "/api/applications",
        Some(owner),
        Some(application_body(Uuid::new_v4(), 3)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "game not found");

    let (status, json) = send(
        &router,
        Method::POST,
        "/api/applications",
        Some(owner),
        Some(json!({ "title": "missing fields" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let (_, json) = send(
        &router,
        Method::POST,
        "/api/applications",
        Some(owner),
        Some(application_body(game, 3)),
    )
    .await;
    let application_uri = format!("/api/applications/{}", json["id"].as_str().unwrap());

    let mut update = application_body(game, 5);
    update["title"] = json!("Weekend raid, heroic");
    update["is_active"] = json!(true);

    let (status, _) = send(
        &router,
        Method::PATCH,
        &application_uri,
        Some(other),
        Some(update.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = send(
        &router,
        Method::PATCH,
        &application_uri,
        Some(owner),
        Some(update),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Weekend raid, heroic");
    assert_eq!(json["max_players"], 5);

    let (status, json) = send(&router, Method::GET, "/api/applications/my", Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["applications"].as_array().unwrap().len(), 1);

    let (status, json) = send(&router, Method::DELETE, &application_uri, Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], true);
    assert_eq!(json["deactivated"], false);

    let (status, _) = send(&router, Method::GET, &application_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_get_messages_nonexistent_conversation() {
    let app = setup().await;
    let router = create_test_app();
    let user = app.create_user("someone").await;

    let (status, json) = send(
        &router,
        Method::GET,
        &format!("/api/conversations/{}/messages", Uuid::new_v4()),
        Some(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "conversation not found");

    let (status, json) = send(
        &router,
        Method::GET,
        "/api/conversations/not-a-uuid/messages",
        Some(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_list_active_applications_of_user() {
    let app = setup().await;
    let router = create_test_app();
    let owner = app.create_user("owner").await;
    let other = app.create_user("other").await;
    let game = app.create_game("valorant").await;

    let open = app.create_application(owner, game, 4).await;
    let closed = app.create_application(owner, game, 4).await;
    app.application_repo
        .deactivate_application(closed, chrono::Utc::now())
        .await
        .unwrap();
    app.create_application(other, game, 4).await;

    let (status, json) = send(
        &router,
        Method::GET,
        &format!("/api/applications/user/{owner}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let applications = json["applications"].as_array().unwrap();
    assert_eq!(applications.len(), 1);
    assert_eq!(applications[0]["id"], open.to_string());
    assert_eq!(applications[0]["owner"]["nickname"], "owner");

    let (status, json) = send(
        &router,
        Method::GET,
        &format!("/api/applications/user/{}", Uuid::new_v4()),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["applications"].as_array().unwrap().len(), 0);

    let (status, _) = send(
        &router,
        Method::GET,
        "/api/applications/user/not-a-uuid",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    cleanup_test_db();
}
