//! Session authentication for dashboard requests.
//!
//! The session token comes from an `Authorization: Bearer` header or, failing
//! that, the dashboard session cookie. Resolving a token to a company is
//! delegated to a [`SessionResolver`]; [`StaticSessions`] serves the
//! configured development sessions.

use crate::rest::AppState;
use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use nexus_core::config::AuthConfig;
use nexus_core::{NexusError, NexusResult};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Looks up the company that owns a session token.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> NexusResult<Option<Uuid>>;
}

/// Fixed token -> company table.
pub struct StaticSessions {
    sessions: HashMap<String, Uuid>,
}

impl StaticSessions {
    pub fn new(sessions: HashMap<String, Uuid>) -> Self {
        Self { sessions }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.sessions.clone())
    }
}

#[async_trait]
impl SessionResolver for StaticSessions {
    async fn resolve(&self, token: &str) -> NexusResult<Option<Uuid>> {
        Ok(self.sessions.get(token).copied())
    }
}

/// Extract the session token, preferring the bearer header over the cookie.
pub fn session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value)
}

/// Resolve the calling company or fail with `Unauthenticated`.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> NexusResult<Uuid> {
    let Some(token) = session_token(headers, &state.cookie_name) else {
        debug!("Request carried no session token");
        return Err(NexusError::Unauthenticated);
    };
    state
        .sessions
        .resolve(token)
        .await?
        .ok_or(NexusError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_preferred_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("analytics-session=xyz"));
        assert_eq!(session_token(&headers, "analytics-session"), Some("abc"));
    }

    #[test]
    fn test_cookie_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; analytics-session=xyz; lang=en"),
        );
        assert_eq!(session_token(&headers, "analytics-session"), Some("xyz"));
        assert_eq!(session_token(&headers, "other-session"), None);
    }

    #[test]
    fn test_missing_or_malformed() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers, "analytics-session"), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(session_token(&headers, "analytics-session"), None);
    }

    #[tokio::test]
    async fn test_static_sessions() {
        let company = Uuid::new_v4();
        let sessions = StaticSessions::new(HashMap::from([("tok".to_string(), company)]));
        assert_eq!(sessions.resolve("tok").await.unwrap(), Some(company));
        assert_eq!(sessions.resolve("nope").await.unwrap(), None);
    }
}
