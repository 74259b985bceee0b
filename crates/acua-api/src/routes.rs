use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{comments, conversations, notifications, posts, profile, publications};

/// REST routes. Everything except `/health` requires a bearer token.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/me/profile", put(profile::update_profile))
        .route("/me/unread", get(profile::unread))
        .route(
            "/conversations",
            get(conversations::list_conversations).post(conversations::open_conversation),
        )
        .route("/conversations/{conversation_id}", get(conversations::get_conversation))
        .route(
            "/conversations/{conversation_id}/messages",
            get(conversations::get_messages).post(conversations::send_message),
        )
        .route("/conversations/{conversation_id}/read", post(conversations::mark_read))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/{notification_id}/read", post(notifications::mark_read))
        .route("/publications", post(publications::create_publication))
        .route("/publications/{publication_id}", get(publications::get_publication))
        .route("/publications/{publication_id}/like", post(publications::toggle_like))
        .route(
            "/publications/{publication_id}/comments",
            get(comments::list_publication_comments).post(comments::comment_on_publication),
        )
        .route("/posts", post(posts::create_post))
        .route("/posts/{post_id}", get(posts::get_post))
        .route("/posts/{post_id}/vote", post(posts::vote))
        .route(
            "/posts/{post_id}/comments",
            get(comments::list_post_comments).post(comments::comment_on_post),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
