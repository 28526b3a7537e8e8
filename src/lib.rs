pub mod analytics;
pub mod api;
pub mod auth;
pub mod automation;
pub mod bulk;
pub mod config;
pub mod error;
pub mod timestamp;
pub mod ui;
