//! Implementations for the services the app needs.

pub mod applications;
pub mod conversations;
pub mod messages;
pub mod responses;

pub use applications::MyApplicationService;
pub use conversations::MyConversationService;
pub use messages::MyMessageService;
pub use responses::MyResponseService;
