//! Conversation management
//!
//! There is at most one active conversation per pair of users. Responses between the same two
//! users share it; once archived it is never reopened and the next response opens a new one.

use crate::core::error::{AppError, AppResult};
use crate::core::models::{ConversationDetails, ConversationSummary};
use crate::core::traits::ConversationService;
use crate::infrastructure::entities::Conversation;
use crate::infrastructure::traits::{
    ApplicationRepository, ConversationRepository, GameRepository, MessageRepository,
    ResponseRepository, UserRepository,
};
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::info;
use sqlx::SqliteConnection;
use uuid::Uuid;

#[injectable(ConversationService)]
pub struct MyConversationService {
    conversations: Ref<dyn ConversationRepository>,
    messages: Ref<dyn MessageRepository>,
    responses: Ref<dyn ResponseRepository>,
    applications: Ref<dyn ApplicationRepository>,
    games: Ref<dyn GameRepository>,
    users: Ref<dyn UserRepository>,
}

impl MyConversationService {
    pub fn new(
        conversations: Ref<dyn ConversationRepository>,
        messages: Ref<dyn MessageRepository>,
        responses: Ref<dyn ResponseRepository>,
        applications: Ref<dyn ApplicationRepository>,
        games: Ref<dyn GameRepository>,
        users: Ref<dyn UserRepository>,
    ) -> Self {
        Self {
            conversations,
            messages,
            responses,
            applications,
            games,
            users,
        }
    }
}

#[async_trait]
impl ConversationService for MyConversationService {
    async fn ensure_conversation(
        &self,
        conn: &mut SqliteConnection,
        response_id: Uuid,
        owner_id: Uuid,
        responder_id: Uuid,
    ) -> AppResult<Conversation> {
        let now = Utc::now();

        if let Some(existing) = self
            .conversations
            .find_active_between(&mut *conn, owner_id, responder_id)
            .await?
        {
            self.conversations
                .touch_conversation(&mut *conn, existing.id, now)
                .await?;
            return Ok(Conversation {
                last_message_at: Some(now),
                updated_at: now,
                ..existing
            });
        }

        let conversation = self
            .conversations
            .create_conversation(
                &mut *conn,
                Conversation {
                    id: Uuid::new_v4(),
                    response_id,
                    participant1_id: owner_id,
                    participant2_id: responder_id,
                    last_message_at: Some(now),
                    is_archived: false,
                    created_at: now,
                    updated_at: now,
                },
            )
            .await?;

        info!(
            "opened conversation {} between {owner_id} and {responder_id}",
            conversation.id
        );
        Ok(conversation)
    }

    async fn archive_conversation(
        &self,
        conn: &mut SqliteConnection,
        response_id: Uuid,
    ) -> AppResult<bool> {
        let archived = self
            .conversations
            .archive_for_response(&mut *conn, response_id, Utc::now())
            .await?;

        if archived {
            info!("archived conversation of response {response_id}");
        }
        Ok(archived)
    }

    async fn get_conversation(
        &self,
        conversation_id: Uuid,
        caller_id: Uuid,
    ) -> AppResult<ConversationDetails> {
        let conversation = self
            .conversations
            .find_conversation(conversation_id)
            .await?
            .ok_or(AppError::NotFound("conversation"))?;

        if !conversation.has_participant(caller_id) {
            return Err(AppError::Forbidden("access denied"));
        }

        let participant1 = self.users.find_profile(conversation.participant1_id).await?;
        let participant2 = self.users.find_profile(conversation.participant2_id).await?;

        let application = match self.responses.find_response(conversation.response_id).await? {
            Some(response) => {
                self.applications
                    .find_application(response.application_id)
                    .await?
            }
            None => None,
        };
        let game = match &application {
            Some(application) => self.games.find_game(application.game_id).await?,
            None => None,
        };

        Ok(ConversationDetails {
            conversation,
            participant1,
            participant2,
            application,
            game,
        })
    }

    async fn list_conversations(&self, caller_id: Uuid) -> AppResult<Vec<ConversationSummary>> {
        let rows = self.conversations.list_user_conversations(caller_id).await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let other_user = self
                .users
                .find_profile(row.conversation.other_participant(caller_id))
                .await?;
            let last_message = self.messages.last_message(row.conversation.id).await?;

            summaries.push(ConversationSummary {
                conversation: row.conversation,
                other_user,
                last_message,
                unread_count: row.unread_count,
            });
        }

        Ok(summaries)
    }
}
