pub mod analytics;
pub mod auth;
pub mod bulk;
pub mod settings;
pub mod workflow;
