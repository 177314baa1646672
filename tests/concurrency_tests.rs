//! Concurrent response workflow tests
//!
//! Runs racing callers over a file database with several pooled connections.

mod common;

use common::TestApp;
use teamup_api::core::error::AppError;
use teamup_api::infrastructure::entities::ResponseStatus;
use tempfile::TempDir;

const MESSAGE: &str = "Ready to play tonight, any role.";

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_duplicate_responses() {
    let dir = TempDir::new().unwrap();
    let app = TestApp::on_disk(dir.path()).await;
    let owner = app.create_user("owner").await;
    let responder = app.create_user("responder").await;
    let game = app.create_game("dota-2").await;
    let application = app.create_application(owner, game, 5).await;

    let (first, second) = tokio::join!(
        app.responses
            .create_response(application, responder, MESSAGE.to_owned()),
        app.responses
            .create_response(application, responder, MESSAGE.to_owned()),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(AppError::Conflict("already responded"))))
    );

    let (responses, conversations, messages): (i64, i64, i64) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM application_responses), (SELECT COUNT(*) FROM conversations), (SELECT COUNT(*) FROM messages)",
    )
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!((responses, conversations, messages), (1, 1, 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_accepts_count_once() {
    let dir = TempDir::new().unwrap();
    let app = TestApp::on_disk(dir.path()).await;
    let owner = app.create_user("owner").await;
    let responder = app.create_user("responder").await;
    let game = app.create_game("dota-2").await;
    let application = app.create_application(owner, game, 5).await;

    let response = app
        .responses
        .create_response(application, responder, MESSAGE.to_owned())
        .await
        .unwrap()
        .response;

    let (first, second) = tokio::join!(
        app.responses
            .update_response_status(response.id, owner, ResponseStatus::Accepted),
        app.responses
            .update_response_status(response.id, owner, ResponseStatus::Accepted),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(AppError::InvalidState(_))))
    );

    let stored = app
        .application_repo
        .find_application(application)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.accepted_players, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_accepts_respect_capacity() {
    let dir = TempDir::new().unwrap();
    let app = TestApp::on_disk(dir.path()).await;
    let owner = app.create_user("owner").await;
    let first_user = app.create_user("first").await;
    let second_user = app.create_user("second").await;
    let game = app.create_game("dota-2").await;
    let application = app.create_application(owner, game, 1).await;

    let mut responses = Vec::new();
    for responder in [first_user, second_user] {
        let response = app
            .responses
            .create_response(application, responder, MESSAGE.to_owned())
            .await
            .unwrap()
            .response;
        responses.push(response.id);
    }

    let (first, second) = tokio::join!(
        app.responses
            .update_response_status(responses[0], owner, ResponseStatus::Accepted),
        app.responses
            .update_response_status(responses[1], owner, ResponseStatus::Accepted),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(AppError::InvalidState(_))))
    );

    // the losing response rolled back to pending
    let pending: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM application_responses WHERE status = 'pending'",
    )
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(pending, 1);

    let stored = app
        .application_repo
        .find_application(application)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.accepted_players, 1);
    assert!(stored.is_full);
}
