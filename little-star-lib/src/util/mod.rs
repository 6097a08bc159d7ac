pub mod auth;
pub mod config;
pub mod error;
pub mod movie;
pub mod realtime;
pub mod session;
pub mod traits;
