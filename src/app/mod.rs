pub mod app;
pub mod app_context;
pub mod screen_action;
pub mod screens;
