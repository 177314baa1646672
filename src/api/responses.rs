//! Responses endpoints

use crate::api::responses::schemas::{Response, ResponseList, UpdateResponseStatus};
use crate::api::{ApiJson, ApiPath, ExtractUser};
use crate::core::error::AppError;
use crate::core::traits::ResponseService;
use axum::routing::{get, patch};
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/my", get(my_responses))
        .route("/:id", patch(update_response_status))
}

async fn my_responses(
    Inject(response_service): Inject<dyn ResponseService>,
    ExtractUser(current_user): ExtractUser,
) -> Result<Json<ResponseList>, AppError> {
    let responses = response_service.list_user_responses(current_user).await?;

    Ok(Json(ResponseList {
        responses: responses.into_iter().map(Response::from).collect(),
    }))
}

async fn update_response_status(
    Inject(response_service): Inject<dyn ResponseService>,
    ExtractUser(current_user): ExtractUser,
    ApiPath(response_id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UpdateResponseStatus>,
) -> Result<Json<Response>, AppError> {
    let status = update.parse_status()?;
    let response = response_service
        .update_response_status(response_id, current_user, status)
        .await?;
    Ok(Json(response.into()))
}

pub mod schemas {
    use crate::api::applications::schemas::{Application, User};
    use crate::api::conversations::schemas::Conversation;
    use crate::core::error::AppError;
    use crate::core::models;
    use crate::infrastructure::entities::ResponseStatus;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Deserialize, Debug)]
    pub struct CreateResponse {
        pub message: String,
    }

    #[derive(Deserialize, Debug)]
    pub struct UpdateResponseStatus {
        pub status: String,
    }

    impl UpdateResponseStatus {
        pub fn parse_status(&self) -> Result<ResponseStatus, AppError> {
            match self.status.as_str() {
                "pending" => Ok(ResponseStatus::Pending),
                "accepted" => Ok(ResponseStatus::Accepted),
                "rejected" => Ok(ResponseStatus::Rejected),
                other => Err(AppError::validation(format!(
                    "unknown response status `{other}`"
                ))),
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct Response {
        pub id: Uuid,
        pub application_id: Uuid,
        pub user_id: Uuid,
        pub status: ResponseStatus,
        pub message: Option<String>,
        pub conversation_id: Option<Uuid>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub application: Option<Application>,
        pub user: Option<User>,
        pub conversation: Option<Conversation>,
    }

    impl From<models::ResponseDetails> for Response {
        fn from(details: models::ResponseDetails) -> Self {
            let response = details.response;
            let game = details.game;
            Response {
                id: response.id,
                application_id: response.application_id,
                user_id: response.user_id,
                status: response.status,
                message: details.opening_message.map(|message| message.content),
                conversation_id: response.conversation_id,
                created_at: response.created_at,
                updated_at: response.updated_at,
                application: details
                    .application
                    .map(|application| Application::from_entity(application, game, None)),
                user: details.user.map(User::from),
                conversation: details.conversation.map(Conversation::from),
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct ResponseList {
        pub responses: Vec<Response>,
    }
}
