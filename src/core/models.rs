//! Values passed between the API layer and the services.

use crate::infrastructure::entities::{
    ApplicationResponse, Conversation, Game, GameApplication, Message, Platform, ResponseStatus,
    UserProfile,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Minimum length of the cover message sent with a response, in characters
/// after trimming.
pub const MIN_RESPONSE_MESSAGE_CHARS: usize = 10;

pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Owner editable fields of an application.
#[derive(Debug, Clone)]
pub struct ApplicationFields {
    pub title: String,
    pub description: String,
    pub min_players: i64,
    pub max_players: i64,
    pub prime_time_start: DateTime<Utc>,
    pub prime_time_end: DateTime<Utc>,
    pub with_voice_chat: bool,
    pub platform: Platform,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub game_id: Uuid,
    pub fields: ApplicationFields,
}

#[derive(Debug, Clone)]
pub struct ApplicationUpdate {
    pub fields: ApplicationFields,
    pub is_active: Option<bool>,
}

/// The viewer's own response to an application in a listing.
#[derive(Debug, Clone)]
pub struct ViewerResponse {
    pub response_id: Uuid,
    pub status: ResponseStatus,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApplicationDetails {
    pub application: GameApplication,
    pub game: Option<Game>,
    pub owner: Option<UserProfile>,
    pub viewer_response: Option<ViewerResponse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Nothing referenced the application, the row is gone.
    Removed,
    /// Responses still reference the application, it was closed instead.
    Deactivated,
}

/// A response with its related rows eagerly loaded.
#[derive(Debug, Clone)]
pub struct ResponseDetails {
    pub response: ApplicationResponse,
    pub application: Option<GameApplication>,
    pub game: Option<Game>,
    pub user: Option<UserProfile>,
    pub conversation: Option<Conversation>,
    pub opening_message: Option<Message>,
}

#[derive(Debug, Clone)]
pub struct ConversationDetails {
    pub conversation: Conversation,
    pub participant1: Option<UserProfile>,
    pub participant2: Option<UserProfile>,
    pub application: Option<GameApplication>,
    pub game: Option<Game>,
}

#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub conversation: Conversation,
    pub other_user: Option<UserProfile>,
    pub last_message: Option<Message>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PageRequest {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageRequest {
    /// Effective `(limit, offset)`: limit defaults to 50 and is clamped to 1..=100.
    pub fn resolve(self) -> (u32, u32) {
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT);
        (limit, self.offset.unwrap_or(0))
    }
}

#[derive(Debug, Clone)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub total: i64,
    pub limit: u32,
    pub offset: u32,
    pub has_more: bool,
}
