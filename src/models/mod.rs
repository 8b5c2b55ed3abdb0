pub mod matchmaking;
pub mod mood_log;
pub mod recommendation;
pub mod user;
