//! Game applications ("looking for group" posts).

use crate::core::error::{AppError, AppResult, is_foreign_key_violation};
use crate::core::models::{
    ApplicationDetails, ApplicationFields, ApplicationUpdate, DeleteOutcome, NewApplication,
    ViewerResponse,
};
use crate::core::traits::ApplicationService;
use crate::infrastructure::entities::GameApplication;
use crate::infrastructure::traits::{
    ApplicationFilter, ApplicationRepository, GameRepository, MessageRepository,
    ResponseRepository, UserRepository,
};
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::info;
use uuid::Uuid;

#[injectable(ApplicationService)]
pub struct MyApplicationService {
    applications: Ref<dyn ApplicationRepository>,
    responses: Ref<dyn ResponseRepository>,
    messages: Ref<dyn MessageRepository>,
    games: Ref<dyn GameRepository>,
    users: Ref<dyn UserRepository>,
}

fn validate_fields(fields: &ApplicationFields) -> AppResult<()> {
    if fields.title.trim().is_empty() {
        return Err(AppError::validation("title is required"));
    }
    if fields.description.trim().is_empty() {
        return Err(AppError::validation("description is required"));
    }
    if fields.min_players < 1 {
        return Err(AppError::validation("min players must be at least 1"));
    }
    if fields.max_players < fields.min_players {
        return Err(AppError::validation(
            "max players must be greater than or equal to min players",
        ));
    }
    if fields.prime_time_end <= fields.prime_time_start {
        return Err(AppError::validation(
            "prime time must end after it starts",
        ));
    }
    Ok(())
}

fn below_accepted(accepted_players: i64) -> AppError {
    AppError::validation(format!(
        "max players cannot be lower than the {accepted_players} already accepted"
    ))
}

impl MyApplicationService {
    pub fn new(
        applications: Ref<dyn ApplicationRepository>,
        responses: Ref<dyn ResponseRepository>,
        messages: Ref<dyn MessageRepository>,
        games: Ref<dyn GameRepository>,
        users: Ref<dyn UserRepository>,
    ) -> Self {
        Self {
            applications,
            responses,
            messages,
            games,
            users,
        }
    }

    async fn details(
        &self,
        application: GameApplication,
        viewer_id: Option<Uuid>,
    ) -> AppResult<ApplicationDetails> {
        let game = self.games.find_game(application.game_id).await?;
        let owner = self.users.find_profile(application.user_id).await?;

        let viewer_response = match viewer_id {
            Some(viewer_id) => match self
                .responses
                .find_user_response(application.id, viewer_id)
                .await?
            {
                Some(response) => {
                    let message = match response.opening_message_id {
                        Some(message_id) => self
                            .messages
                            .find_message(message_id)
                            .await?
                            .map(|message| message.content),
                        None => None,
                    };
                    Some(ViewerResponse {
                        response_id: response.id,
                        status: response.status,
                        message,
                    })
                }
                None => None,
            },
            None => None,
        };

        Ok(ApplicationDetails {
            application,
            game,
            owner,
            viewer_response,
        })
    }

    async fn owned_application(
        &self,
        application_id: Uuid,
        caller_id: Uuid,
        action: &'static str,
    ) -> AppResult<GameApplication> {
        let application = self
            .applications
            .find_application(application_id)
            .await?
            .ok_or(AppError::NotFound("application"))?;

        if application.user_id != caller_id {
            return Err(AppError::Forbidden(action));
        }
        Ok(application)
    }
}

#[async_trait]
impl ApplicationService for MyApplicationService {
    async fn create_application(
        &self,
        owner_id: Uuid,
        application: NewApplication,
    ) -> AppResult<ApplicationDetails> {
        let NewApplication { game_id, fields } = application;
        validate_fields(&fields)?;

        if self.games.find_game(game_id).await?.is_none() {
            return Err(AppError::NotFound("game"));
        }

        let now = Utc::now();
        let created = self
            .applications
            .create_application(GameApplication {
                id: Uuid::new_v4(),
                user_id: owner_id,
                game_id,
                title: fields.title.trim().to_owned(),
                description: fields.description.trim().to_owned(),
                min_players: fields.min_players,
                max_players: fields.max_players,
                accepted_players: 0,
                prime_time_start: fields.prime_time_start,
                prime_time_end: fields.prime_time_end,
                is_active: true,
                is_full: false,
                with_voice_chat: fields.with_voice_chat,
                platform: fields.platform,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!("user {owner_id} created application {}", created.id);
        self.details(created, None).await
    }

    async fn list_active_applications(
        &self,
        filter: ApplicationFilter,
        viewer_id: Option<Uuid>,
    ) -> AppResult<Vec<ApplicationDetails>> {
        let applications = self.applications.list_active_applications(&filter).await?;

        let mut details = Vec::with_capacity(applications.len());
        for application in applications {
            details.push(self.details(application, viewer_id).await?);
        }
        Ok(details)
    }

    async fn list_user_applications(&self, owner_id: Uuid) -> AppResult<Vec<ApplicationDetails>> {
        let applications = self.applications.list_user_applications(owner_id).await?;

        let mut details = Vec::with_capacity(applications.len());
        for application in applications {
            details.push(self.details(application, None).await?);
        }
        Ok(details)
    }

    async fn get_application(&self, application_id: Uuid) -> AppResult<ApplicationDetails> {
        let application = self
            .applications
            .find_application(application_id)
            .await?
            .ok_or(AppError::NotFound("application"))?;
        self.details(application, None).await
    }

    async fn update_application(
        &self,
        application_id: Uuid,
        caller_id: Uuid,
        update: ApplicationUpdate,
    ) -> AppResult<ApplicationDetails> {
        let current = self
            .owned_application(
                application_id,
                caller_id,
                "you don't have permission to update this application",
            )
            .await?;

        let ApplicationUpdate { fields, is_active } = update;
        validate_fields(&fields)?;
        if fields.max_players < current.accepted_players {
            return Err(below_accepted(current.accepted_players));
        }

        let saved = self
            .applications
            .save_application(&GameApplication {
                title: fields.title.trim().to_owned(),
                description: fields.description.trim().to_owned(),
                min_players: fields.min_players,
                max_players: fields.max_players,
                prime_time_start: fields.prime_time_start,
                prime_time_end: fields.prime_time_end,
                with_voice_chat: fields.with_voice_chat,
                platform: fields.platform,
                is_active: is_active.unwrap_or(current.is_active),
                updated_at: Utc::now(),
                ..current
            })
            .await?;

        // an acceptance may have committed since the check above
        let Some(saved) = saved else {
            return match self.applications.find_application(application_id).await? {
                Some(latest) => Err(below_accepted(latest.accepted_players)),
                None => Err(AppError::NotFound("application")),
            };
        };

        info!("user {caller_id} updated application {application_id}");
        self.details(saved, None).await
    }

    async fn delete_application(
        &self,
        application_id: Uuid,
        caller_id: Uuid,
    ) -> AppResult<DeleteOutcome> {
        self.owned_application(
            application_id,
            caller_id,
            "you don't have permission to delete this application",
        )
        .await?;

        // Responses keep pointing at the application, so it is only closed.
        if self
            .responses
            .count_application_responses(application_id)
            .await?
            > 0
        {
            return self.deactivate(application_id, caller_id).await;
        }

        match self.applications.delete_application(application_id).await {
            Ok(true) => {
                info!("user {caller_id} deleted application {application_id}");
                Ok(DeleteOutcome::Removed)
            }
            Ok(false) => Err(AppError::NotFound("application")),
            // a response slipped in after the count
            Err(e) if is_foreign_key_violation(&e) => {
                self.deactivate(application_id, caller_id).await
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl MyApplicationService {
    async fn deactivate(&self, application_id: Uuid, caller_id: Uuid) -> AppResult<DeleteOutcome> {
        self.applications
            .deactivate_application(application_id, Utc::now())
            .await?;
        info!("user {caller_id} deactivated application {application_id}");
        Ok(DeleteOutcome::Deactivated)
    }
}
