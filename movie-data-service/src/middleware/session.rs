use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;
use service_core::error::AppError;

use crate::startup::AppState;

pub const SESSION_COOKIE: &str = "JSESSIONID";
pub const SESSION_HEADER: &str = "x-session-id";

/// The authenticated caller, resolved from the session id.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_name: String,
}

/// Session id from the `JSESSIONID` cookie, falling back to `X-Session-Id`.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let value = cookie.value().trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session_id = session_id(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Missing session id")))?;

        match state.sessions.resolve(&session_id).await? {
            Some(user_name) => Ok(CurrentUser { user_name }),
            None => {
                tracing::debug!("Session could not be resolved");
                Err(AppError::Unauthorized(anyhow::anyhow!(
                    "Unknown or expired session"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    #[test]
    fn cookie_takes_precedence_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "theme=dark; JSESSIONID=abc123".parse().unwrap());
        headers.insert(SESSION_HEADER, "from-header".parse().unwrap());
        assert_eq!(session_id(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn falls_back_to_header() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, " s-42 ".parse().unwrap());
        assert_eq!(session_id(&headers).as_deref(), Some("s-42"));
    }

    #[test]
    fn missing_or_blank_session_is_none() {
        let mut headers = HeaderMap::new();
        assert!(session_id(&headers).is_none());
        headers.insert(SESSION_HEADER, "  ".parse().unwrap());
        assert!(session_id(&headers).is_none());
    }
}
