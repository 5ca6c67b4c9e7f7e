pub mod activity;
pub mod auth;
pub mod badge;
pub mod conversation;
pub mod events;
pub mod message;
pub mod notification;
pub mod push;
pub mod user;
