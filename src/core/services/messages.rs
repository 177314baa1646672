//! Message persistence and read tracking.

use crate::core::error::{AppError, AppResult};
use crate::core::models::{MessagePage, PageRequest};
use crate::core::traits::MessageService;
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{Conversation, Message};
use crate::infrastructure::traits::{ConversationRepository, MessageRepository};
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::{debug, info};
use sqlx::SqliteConnection;
use uuid::Uuid;

#[injectable(MessageService)]
pub struct MyMessageService {
    connection: Ref<DatabaseConnection>,
    conversations: Ref<dyn ConversationRepository>,
    messages: Ref<dyn MessageRepository>,
}

impl MyMessageService {
    pub fn new(
        connection: Ref<DatabaseConnection>,
        conversations: Ref<dyn ConversationRepository>,
        messages: Ref<dyn MessageRepository>,
    ) -> Self {
        Self {
            connection,
            conversations,
            messages,
        }
    }

    async fn participant_conversation(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Conversation> {
        let conversation = self
            .conversations
            .find_conversation(conversation_id)
            .await?
            .ok_or(AppError::NotFound("conversation"))?;

        if !conversation.has_participant(user_id) {
            return Err(AppError::Forbidden("access denied"));
        }

        Ok(conversation)
    }
}

#[async_trait]
impl MessageService for MyMessageService {
    async fn append_message(
        &self,
        conn: &mut SqliteConnection,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: String,
    ) -> AppResult<Message> {
        if content.trim().is_empty() {
            return Err(AppError::validation("message content must not be empty"));
        }

        let message = self
            .messages
            .create_message(
                &mut *conn,
                Message {
                    id: Uuid::new_v4(),
                    conversation_id,
                    sender_id,
                    content,
                    is_read: false,
                    read_at: None,
                    created_at: Utc::now(),
                },
            )
            .await?;

        self.conversations
            .touch_conversation(&mut *conn, conversation_id, message.created_at)
            .await?;

        Ok(message)
    }

    async fn post_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: String,
    ) -> AppResult<Message> {
        let conversation = self
            .participant_conversation(conversation_id, sender_id)
            .await?;

        if conversation.is_archived {
            return Err(AppError::invalid_state("conversation is archived"));
        }
        if content.trim().is_empty() {
            return Err(AppError::validation("message content must not be empty"));
        }

        let mut tx = self.connection.begin().await?;
        let message = self
            .append_message(&mut *tx, conversation_id, sender_id, content)
            .await?;
        tx.commit().await?;

        debug!("message {} posted to conversation {conversation_id}", message.id);
        Ok(message)
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
        caller_id: Uuid,
        page: PageRequest,
    ) -> AppResult<MessagePage> {
        self.participant_conversation(conversation_id, caller_id)
            .await?;

        let (limit, offset) = page.resolve();
        let total = self.messages.count_messages(conversation_id).await?;
        let messages = self
            .messages
            .list_messages(conversation_id, i64::from(limit), i64::from(offset))
            .await?;

        Ok(MessagePage {
            messages,
            total,
            limit,
            offset,
            has_more: total > i64::from(offset) + i64::from(limit),
        })
    }

    async fn mark_read(&self, conversation_id: Uuid, caller_id: Uuid) -> AppResult<u64> {
        self.participant_conversation(conversation_id, caller_id)
            .await?;

        let marked = self
            .messages
            .mark_read(conversation_id, caller_id, Utc::now())
            .await?;

        if marked > 0 {
            info!("user {caller_id} read {marked} messages in conversation {conversation_id}");
        }
        Ok(marked)
    }

    async fn unread_count(&self, caller_id: Uuid) -> AppResult<i64> {
        Ok(self.messages.count_unread(caller_id).await?)
    }
}
