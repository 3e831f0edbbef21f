pub mod health;
pub mod message;
pub mod notification;
pub mod profile;
pub mod read_marker;
pub mod training_session;
pub mod user;
