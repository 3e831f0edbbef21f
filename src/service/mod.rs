pub mod email;
pub mod notification;
