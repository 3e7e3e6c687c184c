//! Session management: turning credentials into authorization headers.
//!
//! Basic-mode credentials need no server round trip; bearer mode logs in,
//! caches the resulting session, and refreshes it shortly before expiry.
//! The cached session is the only shared mutable state in the client, and
//! all access to it goes through the single-flight lock here.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::config::{AuthMode, Credentials};

use super::error::{ApiError, Result};
use super::transport::{Method, Transport, TransportRequest};

/// Seconds before expiry at which a token is refreshed instead of reused.
const REFRESH_MARGIN_SECS: i64 = 30;

/// Session lifetime assumed when the server does not report one.
const DEFAULT_SESSION_SECS: i64 = 15 * 60;

/// Login endpoint, relative to the base URL.
const LOGIN_PATH: &str = "/rest/auth/1/session";

/// A live bearer session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is still usable, leaving the refresh margin.
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + ChronoDuration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    #[serde(default, rename = "expiresIn")]
    expires_in: Option<i64>,
}

/// Owns the session lifecycle for one set of credentials.
pub struct SessionManager<T> {
    credentials: Arc<Credentials>,
    transport: Arc<T>,
    /// Precomputed header for Basic mode; bearer mode leaves this `None`.
    basic_header: Option<String>,
    session: Mutex<Option<Session>>,
}

impl<T: Transport> SessionManager<T> {
    pub fn new(credentials: Arc<Credentials>, transport: Arc<T>) -> Self {
        let basic_header = matches!(credentials.auth_mode(), AuthMode::Basic)
            .then(|| credentials.basic_header());
        Self {
            credentials,
            transport,
            basic_header,
            session: Mutex::new(None),
        }
    }

    /// Returns an `Authorization` header value backed by valid credentials.
    ///
    /// In bearer mode a missing or near-expiry session triggers a login.
    /// The session lock is held across that call, so concurrent callers
    /// wait for the one refresh in flight and reuse its result.
    pub async fn auth_header(&self) -> Result<String> {
        if let Some(header) = &self.basic_header {
            return Ok(header.clone());
        }

        let mut current = self.session.lock().await;
        let now = Utc::now();
        if let Some(session) = current.as_ref() {
            if session.is_fresh(now) {
                return Ok(bearer(&session.token));
            }
            debug!("session expired or inside refresh margin");
        }

        let session = self.login(now).await?;
        let header = bearer(&session.token);
        *current = Some(session);
        Ok(header)
    }

    /// Drop the cached session so the next call logs in again.
    ///
    /// Called after the server rejects a token it previously issued.
    pub async fn invalidate(&self) {
        let mut current = self.session.lock().await;
        if current.take().is_some() {
            debug!("session invalidated");
        }
    }

    /// Perform the login call. Failures surface immediately: a rejected
    /// login means the credentials themselves are wrong, which no retry
    /// will fix.
    #[instrument(skip(self, now))]
    async fn login(&self, now: DateTime<Utc>) -> Result<Session> {
        let request = TransportRequest {
            method: Method::Post,
            url: format!("{}{}", self.credentials.base_url(), LOGIN_PATH),
            auth_header: None,
            body: Some(serde_json::json!({
                "username": self.credentials.principal(),
                "password": self.credentials.secret(),
            })),
        };

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if response.status == 401 || response.status == 403 {
            return Err(ApiError::Unauthorized);
        }
        if !(200..300).contains(&response.status) {
            return Err(ApiError::from_status(response.status, "login"));
        }

        let login: LoginResponse = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Internal(format!("malformed login response: {}", e)))?;

        let lifetime = login.expires_in.unwrap_or(DEFAULT_SESSION_SECS);
        info!(principal = %self.credentials.principal(), "session established");
        Ok(Session {
            token: login.token,
            issued_at: now,
            expires_at: now + ChronoDuration::seconds(lifetime),
        })
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::mock::MockTransport;

    fn bearer_manager(mock: Arc<MockTransport>) -> SessionManager<MockTransport> {
        let credentials = Arc::new(
            Credentials::new(
                "https://tracker.test",
                "user@example.com",
                "secret",
                AuthMode::Bearer,
                None,
            )
            .unwrap(),
        );
        SessionManager::new(credentials, mock)
    }

    #[test]
    fn test_basic_mode_never_calls_the_network() {
        let mock = Arc::new(MockTransport::new());
        let credentials = Arc::new(
            Credentials::new(
                "https://tracker.test",
                "user@example.com",
                "secret",
                AuthMode::Basic,
                None,
            )
            .unwrap(),
        );
        let manager = SessionManager::new(credentials, mock.clone());

        let header = tokio_test::block_on(manager.auth_header()).unwrap();
        assert!(header.starts_with("Basic "));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_bearer_login_and_reuse() {
        let mock = Arc::new(MockTransport::new());
        mock.route_status(
            Method::Post,
            LOGIN_PATH,
            200,
            r#"{"token": "tok-1", "expiresIn": 900}"#,
        );
        let manager = bearer_manager(mock.clone());

        let first = manager.auth_header().await.unwrap();
        assert_eq!(first, "Bearer tok-1");

        // A fresh session is reused without a second login.
        let second = manager.auth_header().await.unwrap();
        assert_eq!(second, "Bearer tok-1");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_login() {
        let mock = Arc::new(MockTransport::new());
        mock.route_status(
            Method::Post,
            LOGIN_PATH,
            200,
            r#"{"token": "tok-1", "expiresIn": 900}"#,
        );
        mock.route_status(
            Method::Post,
            LOGIN_PATH,
            200,
            r#"{"token": "tok-2", "expiresIn": 900}"#,
        );
        let manager = bearer_manager(mock.clone());

        assert_eq!(manager.auth_header().await.unwrap(), "Bearer tok-1");
        manager.invalidate().await;
        assert_eq!(manager.auth_header().await.unwrap(), "Bearer tok-2");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_token_inside_refresh_margin_is_replaced() {
        let mock = Arc::new(MockTransport::new());
        // Lifetime shorter than the refresh margin: never considered fresh.
        mock.route_status(
            Method::Post,
            LOGIN_PATH,
            200,
            r#"{"token": "tok-1", "expiresIn": 5}"#,
        );
        mock.route_status(
            Method::Post,
            LOGIN_PATH,
            200,
            r#"{"token": "tok-2", "expiresIn": 5}"#,
        );
        let manager = bearer_manager(mock.clone());

        assert_eq!(manager.auth_header().await.unwrap(), "Bearer tok-1");
        assert_eq!(manager.auth_header().await.unwrap(), "Bearer tok-2");
    }

    #[tokio::test]
    async fn test_rejected_login_surfaces_unauthorized() {
        let mock = Arc::new(MockTransport::new());
        mock.route_status(Method::Post, LOGIN_PATH, 401, "");
        let manager = bearer_manager(mock.clone());

        let err = manager.auth_header().await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        // No automatic retry of a failed login.
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_login_body_is_internal() {
        let mock = Arc::new(MockTransport::new());
        mock.route_status(Method::Post, LOGIN_PATH, 200, "not json");
        let manager = bearer_manager(mock);

        let err = manager.auth_header().await.unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[tokio::test]
    async fn test_missing_expiry_uses_default_lifetime() {
        let mock = Arc::new(MockTransport::new());
        mock.route_status(Method::Post, LOGIN_PATH, 200, r#"{"token": "tok-1"}"#);
        let manager = bearer_manager(mock.clone());

        assert_eq!(manager.auth_header().await.unwrap(), "Bearer tok-1");
        // Default lifetime is well past the margin, so the session is reused.
        assert_eq!(manager.auth_header().await.unwrap(), "Bearer tok-1");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_login() {
        let mock = Arc::new(MockTransport::new());
        mock.route_status(
            Method::Post,
            LOGIN_PATH,
            200,
            r#"{"token": "tok-1", "expiresIn": 900}"#,
        );
        let manager = Arc::new(bearer_manager(mock.clone()));

        let (a, b) = tokio::join!(manager.auth_header(), manager.auth_header());
        assert_eq!(a.unwrap(), "Bearer tok-1");
        assert_eq!(b.unwrap(), "Bearer tok-1");
        assert_eq!(mock.call_count(), 1);
    }
}
