pub mod admin;
pub mod analysis;
pub mod auth;
pub mod health;
pub mod matchmaking;
pub mod mood_logs;
pub mod ws;
