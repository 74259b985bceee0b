pub mod api;
pub mod events;
pub mod models;
pub mod participants;
pub mod payload;
pub mod poll;
pub mod thread;
