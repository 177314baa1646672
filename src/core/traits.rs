//! DI "Interfaces"

use crate::core::error::AppResult;
use crate::core::models::{
    ApplicationDetails, ApplicationUpdate, ConversationDetails, ConversationSummary,
    DeleteOutcome, MessagePage, NewApplication, PageRequest, ResponseDetails,
};
use crate::infrastructure::entities;
use crate::infrastructure::entities::ResponseStatus;
use crate::infrastructure::traits::ApplicationFilter;
use async_trait::async_trait;
use sqlx::SqliteConnection;
use uuid::Uuid;

#[async_trait]
pub trait ApplicationService: Send + Sync {
    /// Posts a new, active application owned by `owner_id`.
    ///
    /// Returns `NotFound` if the game does not exist.
    async fn create_application(
        &self,
        owner_id: Uuid,
        application: NewApplication,
    ) -> AppResult<ApplicationDetails>;

    /// Lists active applications, newest first.
    ///
    /// When `viewer_id` is given every entry carries the viewer's own response, if any.
    async fn list_active_applications(
        &self,
        filter: ApplicationFilter,
        viewer_id: Option<Uuid>,
    ) -> AppResult<Vec<ApplicationDetails>>;

    /// Lists every application of the given user, including inactive ones.
    async fn list_user_applications(&self, owner_id: Uuid) -> AppResult<Vec<ApplicationDetails>>;

    async fn get_application(&self, application_id: Uuid) -> AppResult<ApplicationDetails>;

    /// Edits an application. Only its owner may do this.
    async fn update_application(
        &self,
        application_id: Uuid,
        caller_id: Uuid,
        update: ApplicationUpdate,
    ) -> AppResult<ApplicationDetails>;

    /// Deletes an application, or deactivates it if responses still reference it.
    async fn delete_application(
        &self,
        application_id: Uuid,
        caller_id: Uuid,
    ) -> AppResult<DeleteOutcome>;
}

#[async_trait]
pub trait ResponseService: Send + Sync {
    /// Responds to an application.
    ///
    /// Creates the response, attaches it to the conversation between the two users and posts
    /// `message` as the opening message, all in one transaction.
    async fn create_response(
        &self,
        application_id: Uuid,
        responder_id: Uuid,
        message: String,
    ) -> AppResult<ResponseDetails>;

    /// Accepts or rejects a pending response. Only the application owner may do this.
    async fn update_response_status(
        &self,
        response_id: Uuid,
        caller_id: Uuid,
        status: ResponseStatus,
    ) -> AppResult<ResponseDetails>;

    /// Lists the responses to an application, newest first. Owner only.
    async fn list_application_responses(
        &self,
        application_id: Uuid,
        caller_id: Uuid,
    ) -> AppResult<Vec<ResponseDetails>>;

    /// Lists the responses written by the caller, newest first.
    async fn list_user_responses(&self, caller_id: Uuid) -> AppResult<Vec<ResponseDetails>>;
}

#[async_trait]
pub trait ConversationService: Send + Sync {
    /// Finds the active conversation between the two users or opens a new one for `response_id`.
    ///
    /// Runs on the caller's transaction.
    async fn ensure_conversation(
        &self,
        conn: &mut SqliteConnection,
        response_id: Uuid,
        owner_id: Uuid,
        responder_id: Uuid,
    ) -> AppResult<entities::Conversation>;

    /// Archives the conversation `response_id` opened, if there is one. Threads
    /// the response only joined stay active.
    ///
    /// Runs on the caller's transaction.
    async fn archive_conversation(
        &self,
        conn: &mut SqliteConnection,
        response_id: Uuid,
    ) -> AppResult<bool>;

    /// Returns `Forbidden` unless the caller takes part in the conversation.
    async fn get_conversation(
        &self,
        conversation_id: Uuid,
        caller_id: Uuid,
    ) -> AppResult<ConversationDetails>;

    /// Lists the caller's non-archived conversations, most recently active first.
    async fn list_conversations(&self, caller_id: Uuid) -> AppResult<Vec<ConversationSummary>>;
}

#[async_trait]
pub trait MessageService: Send + Sync {
    /// Stores a message and bumps the conversation's activity timestamp.
    ///
    /// Runs on the caller's transaction; the caller has already checked that `sender_id` takes
    /// part in the conversation.
    async fn append_message(
        &self,
        conn: &mut SqliteConnection,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: String,
    ) -> AppResult<entities::Message>;

    /// Posts a message to a conversation the sender takes part in.
    async fn post_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: String,
    ) -> AppResult<entities::Message>;

    /// One page of messages, oldest first.
    async fn list_messages(
        &self,
        conversation_id: Uuid,
        caller_id: Uuid,
        page: PageRequest,
    ) -> AppResult<MessagePage>;

    /// Marks the other participant's messages as read. Returns how many changed.
    async fn mark_read(&self, conversation_id: Uuid, caller_id: Uuid) -> AppResult<u64>;

    /// Unread messages across the caller's non-archived conversations.
    async fn unread_count(&self, caller_id: Uuid) -> AppResult<i64>;
}
