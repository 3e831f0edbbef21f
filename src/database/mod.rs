pub mod message;
pub mod postgres_repository;
pub mod profile;
pub mod read_marker;
pub mod training_session;
pub mod user;
