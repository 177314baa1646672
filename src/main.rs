//! Team-up API server

use teamup_api::api;
use teamup_api::config::AppConfig;
use teamup_api::core::services::{
    MyApplicationService, MyConversationService, MyMessageService, MyResponseService,
};
use teamup_api::infrastructure::database::DatabaseConnection;
use teamup_api::infrastructure::repositories::{
    DbApplicationRepository, DbConversationRepository, DbGameRepository, DbMessageRepository,
    DbResponseRepository, DbUserRepository,
};

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use di::{Injectable, ServiceCollection};
use di_axum::RouterServiceProviderExtensions;
use anyhow::anyhow;
use log::{error, info};
use serde::Serialize;
use tokio::runtime::{Builder, Runtime};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(web_server_task(config))
}

async fn web_server_task(config: AppConfig) -> anyhow::Result<()> {
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
        .map_err(|e| anyhow!("invalid service registrations: {e}"))?;

    let database = provider.get_required::<DatabaseConnection>();
    sqlx::migrate!().run(&**database).await?;
    info!("database migrations applied");

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    let app = Router::new()
        .route("/", get(index))
        .nest("/api", api::router())
        .layer(
            CorsLayer::new()
                .allow_headers(Any)
                .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
                .allow_origin(AllowOrigin::list(origins)),
        )
        .with_provider(provider);

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {e}");
    }
}

#[derive(Serialize)]
struct Status {
    name: &'static str,
    version: &'static str,
    status: &'static str,
}

async fn index() -> Json<Status> {
    Json(Status {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
    })
}
