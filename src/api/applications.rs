//! Applications endpoints

use crate::api::applications::schemas::{
    Application, ApplicationList, ApplicationQuery, CreateApplication, DeleteResult,
    UpdateApplication,
};
use crate::api::responses::schemas::{CreateResponse, Response, ResponseList};
use crate::api::{ApiJson, ApiPath, ApiQuery, ExtractUser};
use crate::core::error::AppError;
use crate::core::traits::{ApplicationService, ResponseService};
use crate::infrastructure::traits::ApplicationFilter;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_applications).post(create_application))
        .route("/my", get(my_applications))
        .route("/user/:id", get(user_applications))
        .route(
            "/:id",
            get(get_application)
                .patch(update_application)
                .delete(delete_application),
        )
        .route(
            "/:id/responses",
            get(application_responses).post(respond_to_application),
        )
}

async fn list_applications(
    Inject(application_service): Inject<dyn ApplicationService>,
    viewer: Option<ExtractUser>,
    ApiQuery(query): ApiQuery<ApplicationQuery>,
) -> Result<Json<ApplicationList>, AppError> {
    let applications = application_service
        .list_active_applications(query.into(), viewer.map(|ExtractUser(id)| id))
        .await?;

    Ok(Json(ApplicationList {
        applications: applications.into_iter().map(Application::from).collect(),
    }))
}

async fn create_application(
    Inject(application_service): Inject<dyn ApplicationService>,
    ExtractUser(current_user): ExtractUser,
    ApiJson(create_application): ApiJson<CreateApplication>,
) -> Result<(StatusCode, Json<Application>), AppError> {
    let application = application_service
        .create_application(current_user, create_application.into())
        .await?;

    Ok((StatusCode::CREATED, Json(application.into())))
}

async fn my_applications(
    Inject(application_service): Inject<dyn ApplicationService>,
    ExtractUser(current_user): ExtractUser,
) -> Result<Json<ApplicationList>, AppError> {
    let applications = application_service
        .list_user_applications(current_user)
        .await?;

    Ok(Json(ApplicationList {
        applications: applications.into_iter().map(Application::from).collect(),
    }))
}

async fn user_applications(
    Inject(application_service): Inject<dyn ApplicationService>,
    viewer: Option<ExtractUser>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<ApplicationList>, AppError> {
    let filter = ApplicationFilter {
        user_id: Some(user_id),
        ..Default::default()
    };
    let applications = application_service
        .list_active_applications(filter, viewer.map(|ExtractUser(id)| id))
        .await?;

    Ok(Json(ApplicationList {
        applications: applications.into_iter().map(Application::from).collect(),
    }))
}

async fn get_application(
    Inject(application_service): Inject<dyn ApplicationService>,
    ApiPath(application_id): ApiPath<Uuid>,
) -> Result<Json<Application>, AppError> {
    let application = application_service.get_application(application_id).await?;
    Ok(Json(application.into()))
}

async fn update_application(
    Inject(application_service): Inject<dyn ApplicationService>,
    ExtractUser(current_user): ExtractUser,
    ApiPath(application_id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UpdateApplication>,
) -> Result<Json<Application>, AppError> {
    let application = application_service
        .update_application(application_id, current_user, update.into())
        .await?;
    Ok(Json(application.into()))
}

async fn delete_application(
    Inject(application_service): Inject<dyn ApplicationService>,
    ExtractUser(current_user): ExtractUser,
    ApiPath(application_id): ApiPath<Uuid>,
) -> Result<Json<DeleteResult>, AppError> {
    let outcome = application_service
        .delete_application(application_id, current_user)
        .await?;
    Ok(Json(outcome.into()))
}

async fn respond_to_application(
    Inject(response_service): Inject<dyn ResponseService>,
    ExtractUser(current_user): ExtractUser,
    ApiPath(application_id): ApiPath<Uuid>,
    ApiJson(create_response): ApiJson<CreateResponse>,
) -> Result<(StatusCode, Json<Response>), AppError> {
    let response = response_service
        .create_response(application_id, current_user, create_response.message)
        .await?;

    Ok((StatusCode::CREATED, Json(response.into())))
}

async fn application_responses(
    Inject(response_service): Inject<dyn ResponseService>,
    ExtractUser(current_user): ExtractUser,
    ApiPath(application_id): ApiPath<Uuid>,
) -> Result<Json<ResponseList>, AppError> {
    let responses = response_service
        .list_application_responses(application_id, current_user)
        .await?;

    Ok(Json(ResponseList {
        responses: responses.into_iter().map(Response::from).collect(),
    }))
}

pub mod schemas {
    use crate::core::models::{
        self, ApplicationFields, ApplicationUpdate, DeleteOutcome, NewApplication,
    };
    use crate::infrastructure::entities::{self, Platform, ResponseStatus};
    use crate::infrastructure::traits::ApplicationFilter;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Deserialize, Debug)]
    pub struct ApplicationQuery {
        pub game_id: Option<Uuid>,
        pub platform: Option<Platform>,
        pub with_voice_chat: Option<bool>,
    }

    impl From<ApplicationQuery> for ApplicationFilter {
        fn from(query: ApplicationQuery) -> Self {
            ApplicationFilter {
                user_id: None,
                game_id: query.game_id,
                platform: query.platform,
                with_voice_chat: query.with_voice_chat,
            }
        }
    }

    #[derive(Deserialize, Debug)]
    pub struct CreateApplication {
        pub game_id: Uuid,
        pub title: String,
        pub description: String,
        pub min_players: i64,
        pub max_players: i64,
        pub prime_time_start: DateTime<Utc>,
        pub prime_time_end: DateTime<Utc>,
        #[serde(default)]
        pub with_voice_chat: bool,
        pub platform: Platform,
    }

    impl From<CreateApplication> for NewApplication {
        fn from(input: CreateApplication) -> Self {
            NewApplication {
                game_id: input.game_id,
                fields: ApplicationFields {
                    title: input.title,
                    description: input.description,
                    min_players: input.min_players,
                    max_players: input.max_players,
                    prime_time_start: input.prime_time_start,
                    prime_time_end: input.prime_time_end,
                    with_voice_chat: input.with_voice_chat,
                    platform: input.platform,
                },
            }
        }
    }

    /// Full replacement of the editable fields, optionally toggling `is_active`.
    #[derive(Deserialize, Debug)]
    pub struct UpdateApplication {
        pub title: String,
        pub description: String,
        pub min_players: i64,
        pub max_players: i64,
        pub prime_time_start: DateTime<Utc>,
        pub prime_time_end: DateTime<Utc>,
        #[serde(default)]
        pub with_voice_chat: bool,
        pub platform: Platform,
        pub is_active: Option<bool>,
    }

    impl From<UpdateApplication> for ApplicationUpdate {
        fn from(input: UpdateApplication) -> Self {
            ApplicationUpdate {
                fields: ApplicationFields {
                    title: input.title,
                    description: input.description,
                    min_players: input.min_players,
                    max_players: input.max_players,
                    prime_time_start: input.prime_time_start,
                    prime_time_end: input.prime_time_end,
                    with_voice_chat: input.with_voice_chat,
                    platform: input.platform,
                },
                is_active: input.is_active,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct Game {
        pub id: Uuid,
        pub name: String,
        pub slug: String,
        pub icon_url: String,
    }

    impl From<entities::Game> for Game {
        fn from(game: entities::Game) -> Self {
            Game {
                id: game.id,
                name: game.name,
                slug: game.slug,
                icon_url: game.icon_url,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct User {
        pub id: Uuid,
        pub nickname: String,
        pub avatar_url: Option<String>,
    }

    impl From<entities::UserProfile> for User {
        fn from(user: entities::UserProfile) -> Self {
            User {
                id: user.id,
                nickname: user.nickname,
                avatar_url: user.avatar_url,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct MyResponse {
        pub id: Uuid,
        pub status: ResponseStatus,
        pub message: Option<String>,
    }

    #[derive(Serialize, Debug)]
    pub struct Application {
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
        pub game: Option<Game>,
        pub owner: Option<User>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub my_response: Option<MyResponse>,
    }

    impl Application {
        pub fn from_entity(
            application: entities::GameApplication,
            game: Option<entities::Game>,
            owner: Option<entities::UserProfile>,
        ) -> Self {
            Application {
                id: application.id,
                user_id: application.user_id,
                game_id: application.game_id,
                title: application.title,
                description: application.description,
                min_players: application.min_players,
                max_players: application.max_players,
                accepted_players: application.accepted_players,
                prime_time_start: application.prime_time_start,
                prime_time_end: application.prime_time_end,
                is_active: application.is_active,
                is_full: application.is_full,
                with_voice_chat: application.with_voice_chat,
                platform: application.platform,
                created_at: application.created_at,
                updated_at: application.updated_at,
                game: game.map(Game::from),
                owner: owner.map(User::from),
                my_response: None,
            }
        }
    }

    impl From<models::ApplicationDetails> for Application {
        fn from(details: models::ApplicationDetails) -> Self {
            Application {
                my_response: details.viewer_response.map(|response| MyResponse {
                    id: response.response_id,
                    status: response.status,
                    message: response.message,
                }),
                ..Application::from_entity(details.application, details.game, details.owner)
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct ApplicationList {
        pub applications: Vec<Application>,
    }

    #[derive(Serialize, Debug)]
    pub struct DeleteResult {
        pub deleted: bool,
        pub deactivated: bool,
    }

    impl From<DeleteOutcome> for DeleteResult {
        fn from(outcome: DeleteOutcome) -> Self {
            DeleteResult {
                deleted: outcome == DeleteOutcome::Removed,
                deactivated: outcome == DeleteOutcome::Deactivated,
            }
        }
    }
}
