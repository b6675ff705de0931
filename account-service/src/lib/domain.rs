pub mod cache;
pub mod events;
pub mod notification;
pub mod user;
