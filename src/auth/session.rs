use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use tracing::{error, warn};
use uuid::Uuid;

use crate::auth::repo::AuthenticatedUser;
use crate::state::AppState;

/// Name of the session cookie. The value is the store-assigned user id;
/// there is no server-side session record, so logout only clears the
/// client-held cookie and a copied cookie stays valid until its max-age.
pub const SESSION_COOKIE: &str = "userId";

const SESSION_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 7;

/// `Set-Cookie` value establishing a session for `user_id`.
pub fn session_cookie(user_id: Uuid, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Strict",
        SESSION_COOKIE, user_id, SESSION_MAX_AGE_SECS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value deleting the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = format!(
        "{}=; HttpOnly; Path=/; Max-Age=0; SameSite=Strict",
        SESSION_COOKIE
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookie_str| {
            cookie_str
                .split(';')
                .map(|c| c.trim())
                .find_map(|c| c.strip_prefix(&format!("{}=", SESSION_COOKIE)))
                .map(|v| v.to_string())
        })
        .filter(|v| !v.is_empty())
}

/// Result of resolving the session cookie against the user store.
#[derive(Debug)]
pub enum SessionState {
    /// No cookie was presented.
    Missing,
    /// A cookie was presented but did not resolve to a user; the caller
    /// should delete the stale cookie.
    Invalid,
    Authenticated(AuthenticatedUser),
}

pub async fn resolve(db: &PgPool, headers: &HeaderMap) -> sqlx::Result<SessionState> {
    let Some(raw) = session_id_from_headers(headers) else {
        return Ok(SessionState::Missing);
    };
    let Ok(user_id) = raw.parse::<Uuid>() else {
        warn!("session cookie holds a malformed user id");
        return Ok(SessionState::Invalid);
    };
    match AuthenticatedUser::find_by_id(db, user_id).await? {
        Some(user) => Ok(SessionState::Authenticated(user)),
        None => Ok(SessionState::Invalid),
    }
}

/// Extractor attaching the authenticated user to a handler. All resource
/// routes go through this; owner-id scoping starts from the id it carries.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedUser);

#[derive(Debug)]
pub enum AuthRejection {
    Missing,
    Invalid { secure: bool },
    Failed,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (message, clear) = match self {
            AuthRejection::Missing => ("authentication required", None),
            AuthRejection::Invalid { secure } => {
                ("invalid session", Some(clear_session_cookie(secure)))
            }
            AuthRejection::Failed => ("authentication failed", None),
        };
        let mut response =
            (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response();
        if let Some(cookie) = clear {
            response
                .headers_mut()
                .insert(header::SET_COOKIE, cookie.parse().unwrap());
        }
        response
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match resolve(&state.db, &parts.headers).await {
            Ok(SessionState::Authenticated(user)) => Ok(CurrentUser(user)),
            Ok(SessionState::Missing) => Err(AuthRejection::Missing),
            Ok(SessionState::Invalid) => Err(AuthRejection::Invalid {
                secure: state.config.production,
            }),
            Err(e) => {
                error!(error = %e, "session lookup failed");
                Err(AuthRejection::Failed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_carries_attributes() {
        let id = Uuid::new_v4();
        let cookie = session_cookie(id, false);
        assert!(cookie.starts_with(&format!("userId={}", id)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn production_cookie_is_secure() {
        assert!(session_cookie(Uuid::new_v4(), true).contains("; Secure"));
        assert!(clear_session_cookie(true).contains("; Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie(false);
        assert!(cookie.starts_with("userId=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn parses_session_id_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "theme=dark; userId=3fa85f64-5717-4562-b3fc-2c963f66afa6; lang=ja"
                .parse()
                .unwrap(),
        );
        assert_eq!(
            session_id_from_headers(&headers).as_deref(),
            Some("3fa85f64-5717-4562-b3fc-2c963f66afa6")
        );
    }

    #[test]
    fn missing_or_empty_cookie_yields_none() {
        assert!(session_id_from_headers(&HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "userId=".parse().unwrap());
        assert!(session_id_from_headers(&headers).is_none());
    }

    #[test]
    fn invalid_session_rejection_clears_cookie() {
        let response = AuthRejection::Invalid { secure: false }.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let set_cookie = response.headers().get(header::SET_COOKIE).unwrap();
        assert!(set_cookie.to_str().unwrap().contains("Max-Age=0"));
    }

    #[test]
    fn missing_session_rejection_has_no_cookie() {
        let response = AuthRejection::Missing.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }
}
