// Presentation layer - Local status API
pub mod app_state;
pub mod handlers;
