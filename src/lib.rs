//! Terminal kanban client for the team dashboard backend.

pub mod api;
pub mod app;
pub mod columns;
pub mod config;
pub mod drag;
pub mod error;
pub mod integrations;
pub mod kanban_board;
pub mod local_store;
pub mod logging;
pub mod meeting;
pub mod realtime;
pub mod session;
pub mod settings;
pub mod store;
pub mod task;
pub mod ui;
