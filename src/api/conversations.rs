//! Conversations endpoints

use crate::api::conversations::schemas::{
    ConversationDetails, ConversationList, ConversationSummary, CreateMessage, MarkReadResult,
    Message, MessagesPage, UnreadCount,
};
use crate::api::{ApiJson, ApiPath, ApiQuery, ExtractUser};
use crate::core::error::AppError;
use crate::core::traits::{ConversationService, MessageService};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_conversations))
        .route("/unread-count", get(unread_count))
        .route("/:id", get(get_conversation))
        .route(
            "/:id/messages",
            get(conversation_messages).post(post_message),
        )
        .route("/:id/read", patch(mark_read))
}

async fn list_conversations(
    Inject(conversation_service): Inject<dyn ConversationService>,
    ExtractUser(current_user): ExtractUser,
) -> Result<Json<ConversationList>, AppError> {
    let conversations = conversation_service
        .list_conversations(current_user)
        .await?;

    Ok(Json(ConversationList {
        conversations: conversations
            .into_iter()
            .map(ConversationSummary::from)
            .collect(),
    }))
}

async fn unread_count(
    Inject(message_service): Inject<dyn MessageService>,
    ExtractUser(current_user): ExtractUser,
) -> Result<Json<UnreadCount>, AppError> {
    let count = message_service.unread_count(current_user).await?;
    Ok(Json(UnreadCount { count }))
}

async fn get_conversation(
    Inject(conversation_service): Inject<dyn ConversationService>,
    ExtractUser(current_user): ExtractUser,
    ApiPath(conversation_id): ApiPath<Uuid>,
) -> Result<Json<ConversationDetails>, AppError> {
    let conversation = conversation_service
        .get_conversation(conversation_id, current_user)
        .await?;
    Ok(Json(conversation.into()))
}

async fn conversation_messages(
    Inject(message_service): Inject<dyn MessageService>,
    ExtractUser(current_user): ExtractUser,
    ApiPath(conversation_id): ApiPath<Uuid>,
    ApiQuery(page): ApiQuery<schemas::PageQuery>,
) -> Result<Json<MessagesPage>, AppError> {
    let page = message_service
        .list_messages(conversation_id, current_user, page.into())
        .await?;
    Ok(Json(page.into()))
}

async fn post_message(
    Inject(message_service): Inject<dyn MessageService>,
    ExtractUser(current_user): ExtractUser,
    ApiPath(conversation_id): ApiPath<Uuid>,
    ApiJson(message): ApiJson<CreateMessage>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let message = message_service
        .post_message(conversation_id, current_user, message.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message.into())))
}

async fn mark_read(
    Inject(message_service): Inject<dyn MessageService>,
    ExtractUser(current_user): ExtractUser,
    ApiPath(conversation_id): ApiPath<Uuid>,
) -> Result<Json<MarkReadResult>, AppError> {
    let marked = message_service
        .mark_read(conversation_id, current_user)
        .await?;
    Ok(Json(MarkReadResult { marked }))
}

pub mod schemas {
    use crate::api::applications::schemas::{Game, User};
    use crate::core::models::{self, PageRequest};
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Deserialize, Debug, Default)]
    pub struct PageQuery {
        pub limit: Option<u32>,
        pub offset: Option<u32>,
    }

    impl From<PageQuery> for PageRequest {
        fn from(query: PageQuery) -> Self {
            PageRequest {
                limit: query.limit,
                offset: query.offset,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct Conversation {
        pub id: Uuid,
        pub response_id: Uuid,
        pub participant1_id: Uuid,
        pub participant2_id: Uuid,
        pub last_message_at: Option<DateTime<Utc>>,
        pub is_archived: bool,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl From<entities::Conversation> for Conversation {
        fn from(conversation: entities::Conversation) -> Self {
            Conversation {
                id: conversation.id,
                response_id: conversation.response_id,
                participant1_id: conversation.participant1_id,
                participant2_id: conversation.participant2_id,
                last_message_at: conversation.last_message_at,
                is_archived: conversation.is_archived,
                created_at: conversation.created_at,
                updated_at: conversation.updated_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct ApplicationRef {
        pub id: Uuid,
        pub title: String,
    }

    #[derive(Serialize, Debug)]
    pub struct ConversationDetails {
        #[serde(flatten)]
        pub conversation: Conversation,
        pub participant1: Option<User>,
        pub participant2: Option<User>,
        pub application: Option<ApplicationRef>,
        pub game: Option<Game>,
    }

    impl From<models::ConversationDetails> for ConversationDetails {
        fn from(details: models::ConversationDetails) -> Self {
            ConversationDetails {
                conversation: details.conversation.into(),
                participant1: details.participant1.map(User::from),
                participant2: details.participant2.map(User::from),
                application: details.application.map(|application| ApplicationRef {
                    id: application.id,
                    title: application.title,
                }),
                game: details.game.map(Game::from),
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct ConversationSummary {
        #[serde(flatten)]
        pub conversation: Conversation,
        pub other_user: Option<User>,
        pub last_message: Option<Message>,
        pub unread_count: i64,
    }

    impl From<models::ConversationSummary> for ConversationSummary {
        fn from(summary: models::ConversationSummary) -> Self {
            ConversationSummary {
                conversation: summary.conversation.into(),
                other_user: summary.other_user.map(User::from),
                last_message: summary.last_message.map(Message::from),
                unread_count: summary.unread_count,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct ConversationList {
        pub conversations: Vec<ConversationSummary>,
    }

    #[derive(Serialize, Debug)]
    pub struct Message {
        pub id: Uuid,
        pub conversation_id: Uuid,
        pub sender_id: Uuid,
        pub content: String,
        pub is_read: bool,
        pub read_at: Option<DateTime<Utc>>,
        pub created_at: DateTime<Utc>,
    }

    impl From<entities::Message> for Message {
        fn from(message: entities::Message) -> Self {
            Message {
                id: message.id,
                conversation_id: message.conversation_id,
                sender_id: message.sender_id,
                content: message.content,
                is_read: message.is_read,
                read_at: message.read_at,
                created_at: message.created_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct MessagesPage {
        pub messages: Vec<Message>,
        pub total: i64,
        pub limit: u32,
        pub offset: u32,
        pub has_more: bool,
    }

    impl From<models::MessagePage> for MessagesPage {
        fn from(page: models::MessagePage) -> Self {
            MessagesPage {
                messages: page.messages.into_iter().map(Message::from).collect(),
                total: page.total,
                limit: page.limit,
                offset: page.offset,
                has_more: page.has_more,
            }
        }
    }

    #[derive(Deserialize, Debug)]
    pub struct CreateMessage {
        pub content: String,
    }

    #[derive(Serialize, Debug)]
    pub struct UnreadCount {
        pub count: i64,
    }

    #[derive(Serialize, Debug)]
    pub struct MarkReadResult {
        pub marked: u64,
    }
}
