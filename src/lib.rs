//! Team-up API: game applications, responses and the conversations between players
//! - library exports for testing

pub mod api;
pub mod config;
pub mod core;
pub mod infrastructure;
