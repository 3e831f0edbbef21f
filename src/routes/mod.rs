pub mod error;
pub mod health;
pub mod notification;
pub mod profile;
pub mod training_session;
pub mod user;
