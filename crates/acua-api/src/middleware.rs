use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use acua_types::api::Session;

use crate::error::ApiError;
use crate::state::AppState;

/// Extract and validate the bearer token, then hand the decoded session to
/// the handler as an `Extension<Session>`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or(ApiError::Unauthorized)?;
    let session = decode_session(&state.jwt_secret, token).ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

pub fn decode_session(secret: &str, token: &str) -> Option<Session> {
    decode::<Session>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

/// Mint a session token. Production tokens come from the identity provider;
/// this is for development and tests that share its secret.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    display_name: &str,
    ttl: Duration,
) -> anyhow::Result<String> {
    let session = Session {
        user_id,
        display_name: display_name.to_string(),
        exp: (Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &session,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let user = Uuid::new_v4();
        let token = issue_token("s3cret", user, "Ana", Duration::hours(1)).unwrap();

        let session = decode_session("s3cret", &token).unwrap();
        assert_eq!(session.user_id, user);
        assert_eq!(session.display_name, "Ana");
    }

    #[test]
    fn wrong_secret_or_expired_is_rejected() {
        let user = Uuid::new_v4();
        let token = issue_token("s3cret", user, "Ana", Duration::hours(1)).unwrap();
        assert!(decode_session("other", &token).is_none());

        let expired = issue_token("s3cret", user, "Ana", Duration::hours(-2)).unwrap();
        assert!(decode_session("s3cret", &expired).is_none());
    }

    #[test]
    fn bearer_prefix_required() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Token abc".parse().unwrap());
        assert!(bearer_token(&headers).is_none());
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));
    }
}
