pub mod comments;
pub mod conversations;
pub mod error;
pub mod middleware;
pub mod notifications;
pub mod posts;
pub mod profile;
pub mod publications;
pub mod routes;
pub mod state;
