//! Application responses and their status workflow.

use crate::core::error::{AppError, AppResult, is_unique_violation};
use crate::core::models::{MIN_RESPONSE_MESSAGE_CHARS, ResponseDetails};
use crate::core::traits::{ConversationService, MessageService, ResponseService};
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{ApplicationResponse, ResponseStatus};
use crate::infrastructure::traits::{
    ApplicationRepository, ConversationRepository, GameRepository, MessageRepository,
    ResponseRepository, UserRepository,
};
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::info;
use uuid::Uuid;

#[injectable(ResponseService)]
pub struct MyResponseService {
    connection: Ref<DatabaseConnection>,
    applications: Ref<dyn ApplicationRepository>,
    responses: Ref<dyn ResponseRepository>,
    conversation_repo: Ref<dyn ConversationRepository>,
    message_repo: Ref<dyn MessageRepository>,
    games: Ref<dyn GameRepository>,
    users: Ref<dyn UserRepository>,
    conversations: Ref<dyn ConversationService>,
    messages: Ref<dyn MessageService>,
}

impl MyResponseService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        connection: Ref<DatabaseConnection>,
        applications: Ref<dyn ApplicationRepository>,
        responses: Ref<dyn ResponseRepository>,
        conversation_repo: Ref<dyn ConversationRepository>,
        message_repo: Ref<dyn MessageRepository>,
        games: Ref<dyn GameRepository>,
        users: Ref<dyn UserRepository>,
        conversations: Ref<dyn ConversationService>,
        messages: Ref<dyn MessageService>,
    ) -> Self {
        Self {
            connection,
            applications,
            responses,
            conversation_repo,
            message_repo,
            games,
            users,
            conversations,
            messages,
        }
    }

    /// Loads everything a response is presented with.
    async fn details(&self, response: ApplicationResponse) -> AppResult<ResponseDetails> {
        let application = self
            .applications
            .find_application(response.application_id)
            .await?;
        let game = match &application {
            Some(application) => self.games.find_game(application.game_id).await?,
            None => None,
        };
        let user = self.users.find_profile(response.user_id).await?;
        let conversation = match response.conversation_id {
            Some(conversation_id) => {
                self.conversation_repo
                    .find_conversation(conversation_id)
                    .await?
            }
            None => None,
        };
        let opening_message = match response.opening_message_id {
            Some(message_id) => self.message_repo.find_message(message_id).await?,
            None => None,
        };

        Ok(ResponseDetails {
            response,
            application,
            game,
            user,
            conversation,
            opening_message,
        })
    }

    async fn reload(&self, response_id: Uuid) -> AppResult<ResponseDetails> {
        let response = self
            .responses
            .find_response(response_id)
            .await?
            .ok_or(AppError::NotFound("response"))?;
        self.details(response).await
    }
}

#[async_trait]
impl ResponseService for MyResponseService {
    async fn create_response(
        &self,
        application_id: Uuid,
        responder_id: Uuid,
        message: String,
    ) -> AppResult<ResponseDetails> {
        let application = self
            .applications
            .find_application(application_id)
            .await?
            .ok_or(AppError::NotFound("application"))?;

        if !application.is_active {
            return Err(AppError::invalid_state("application inactive"));
        }
        if application.user_id == responder_id {
            return Err(AppError::InvalidOperation(
                "cannot respond to own application",
            ));
        }
        if self
            .responses
            .find_user_response(application_id, responder_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("already responded"));
        }

        let message = message.trim();
        if message.chars().count() < MIN_RESPONSE_MESSAGE_CHARS {
            return Err(AppError::validation(format!(
                "message must be at least {MIN_RESPONSE_MESSAGE_CHARS} characters long"
            )));
        }

        let now = Utc::now();
        let mut tx = self.connection.begin().await?;

        // The unique (application, user) index settles concurrent duplicates.
        let response = self
            .responses
            .create_response(
                &mut *tx,
                ApplicationResponse {
                    id: Uuid::new_v4(),
                    application_id,
                    user_id: responder_id,
                    status: ResponseStatus::Pending,
                    conversation_id: None,
                    opening_message_id: None,
                    created_at: now,
                    updated_at: now,
                },
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict("already responded")
                } else {
                    AppError::Database(e)
                }
            })?;

        let conversation = self
            .conversations
            .ensure_conversation(&mut *tx, response.id, application.user_id, responder_id)
            .await?;
        let opening_message = self
            .messages
            .append_message(&mut *tx, conversation.id, responder_id, message.to_owned())
            .await?;
        self.responses
            .attach_conversation(&mut *tx, response.id, conversation.id, opening_message.id)
            .await?;

        tx.commit().await?;

        info!(
            "user {responder_id} responded to application {application_id} (response {}, conversation {})",
            response.id, conversation.id
        );
        self.reload(response.id).await
    }

    async fn update_response_status(
        &self,
        response_id: Uuid,
        caller_id: Uuid,
        status: ResponseStatus,
    ) -> AppResult<ResponseDetails> {
        let response = self
            .responses
            .find_response(response_id)
            .await?
            .ok_or(AppError::NotFound("response"))?;
        let application = self
            .applications
            .find_application(response.application_id)
            .await?
            .ok_or(AppError::NotFound("application"))?;

        if application.user_id != caller_id {
            return Err(AppError::Forbidden(
                "only the application author can update response status",
            ));
        }
        if !status.is_terminal() {
            return Err(AppError::validation(
                "status must be either accepted or rejected",
            ));
        }
        if response.status.is_terminal() {
            return Err(AppError::invalid_state(format!(
                "response is already {}",
                response.status
            )));
        }

        let now = Utc::now();
        let mut tx = self.connection.begin().await?;

        // Compare-and-set first so that the write lock is held for the rest of the unit.
        if !self
            .responses
            .transition_status(&mut *tx, response_id, ResponseStatus::Pending, status, now)
            .await?
        {
            return Err(AppError::invalid_state("response was already decided"));
        }

        match status {
            ResponseStatus::Accepted => {
                if !self
                    .applications
                    .increment_accepted_players(&mut *tx, application.id, now)
                    .await?
                {
                    return Err(AppError::invalid_state("application is full"));
                }
            }
            ResponseStatus::Rejected => {
                self.conversations
                    .archive_conversation(&mut *tx, response_id)
                    .await?;
            }
            // not a settable target, rejected above
            ResponseStatus::Pending => {}
        }

        tx.commit().await?;

        info!(
            "response {response_id} on application {} is now {status}",
            application.id
        );
        self.reload(response_id).await
    }

    async fn list_application_responses(
        &self,
        application_id: Uuid,
        caller_id: Uuid,
    ) -> AppResult<Vec<ResponseDetails>> {
        let application = self
            .applications
            .find_application(application_id)
            .await?
            .ok_or(AppError::NotFound("application"))?;

        if application.user_id != caller_id {
            return Err(AppError::Forbidden(
                "you can only view responses to your own applications",
            ));
        }

        let responses = self
            .responses
            .list_application_responses(application_id)
            .await?;

        let mut details = Vec::with_capacity(responses.len());
        for response in responses {
            details.push(self.details(response).await?);
        }
        Ok(details)
    }

    async fn list_user_responses(&self, caller_id: Uuid) -> AppResult<Vec<ResponseDetails>> {
        let responses = self.responses.list_user_responses(caller_id).await?;

        let mut details = Vec::with_capacity(responses.len());
        for response in responses {
            details.push(self.details(response).await?);
        }
        Ok(details)
    }
}
