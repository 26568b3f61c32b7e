//! GoTrue-compatible session oracle
//!
//! Talks to `{backend.url}/auth/v1`. Every request carries the `apikey`
//! header. The current session lives in a [`SessionStorage`] and is
//! refreshed when it is within the configured threshold of expiring.

use std::sync::Arc;

use accountsync_common::auth::PkceChallenge;
use accountsync_core::session::events::{AuthEventHub, AuthSubscription};
use accountsync_core::{OAuthRedirect, SessionOracle};
use accountsync_domain::{
    AccountError, AuthError, AuthEvent, Config, Identity, ProviderError, Session,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};
use url::Url;

use super::storage::{MemorySessionStorage, SessionStorage};
use super::AccessTokenProvider;
use crate::errors::{provider_error_from_status, InfraError};
use crate::http::HttpClient;

/// Session oracle backed by a GoTrue auth server
pub struct GoTrueSessionOracle {
    http: HttpClient,
    auth_url: String,
    anon_key: String,
    redirect_url: Option<String>,
    refresh_threshold_seconds: i64,
    storage: Arc<dyn SessionStorage>,
    pending_verifier: Mutex<Option<String>>,
    refresh_gate: AsyncMutex<()>,
    events: AuthEventHub,
}

impl GoTrueSessionOracle {
    /// Create an oracle for the configured backend.
    ///
    /// # Errors
    /// Returns `AccountError::Config` when the backend URL is not a URL.
    pub fn new(config: &Config, http: HttpClient) -> Result<Self, AccountError> {
        let base = Url::parse(&config.backend.url)
            .map_err(|e| AccountError::Config(format!("Invalid backend URL: {e}")))?;

        Ok(Self {
            http,
            auth_url: format!("{}/auth/v1", base.as_str().trim_end_matches('/')),
            anon_key: config.backend.anon_key.clone(),
            redirect_url: config.auth.redirect_url.clone(),
            refresh_threshold_seconds: config.auth.refresh_threshold_seconds,
            storage: Arc::new(MemorySessionStorage::new()),
            pending_verifier: Mutex::new(None),
            refresh_gate: AsyncMutex::new(()),
            events: AuthEventHub::new(),
        })
    }

    /// Use `storage` for the session, e.g. to restore a previous login.
    pub fn with_storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = storage;
        self
    }

    /// Publisher used for auth transitions.
    pub fn events(&self) -> &AuthEventHub {
        &self.events
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.auth_url, path))
            .header("apikey", &self.anon_key)
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Session, AuthError> {
        debug!(grant_type, "requesting token");
        let request = self.request(Method::POST, "token").query(&[("grant_type", grant_type)]).json(&body);
        // Refresh tokens and auth codes are single use
        let response = self.http.send_once(request).await?;
        let payload: TokenResponse = parse_success(response).await?;
        Ok(payload.into_session())
    }

    fn adopt(&self, session: &Session, event: AuthEvent) {
        self.storage.store(session);
        self.events.publish(event);
    }

    fn drop_session(&self) {
        self.storage.clear();
        self.events.publish(AuthEvent::SignedOut);
    }

    /// Refresh `stale` unless another caller already did.
    async fn refresh(&self, stale: Session) -> Result<Option<Session>, ProviderError> {
        let _gate = self.refresh_gate.lock().await;

        match self.storage.load() {
            Some(current) if current.access_token != stale.access_token => return Ok(Some(current)),
            None => return Ok(None),
            Some(_) => {}
        }

        let Some(refresh_token) = stale.refresh_token.clone() else {
            info!(user_id = %stale.user_id(), "session expired without refresh token");
            self.drop_session();
            return Ok(None);
        };

        match self.token_grant("refresh_token", json!({ "refresh_token": refresh_token })).await {
            Ok(session) => {
                debug!(user_id = %session.user_id(), "session refreshed");
                self.adopt(&session, AuthEvent::TokenRefreshed(session.clone()));
                Ok(Some(session))
            }
            Err(AuthError::Transport(err)) => Err(err),
            Err(err) => {
                info!(user_id = %stale.user_id(), label = err.label(), "refresh rejected; signing out");
                self.drop_session();
                Ok(None)
            }
        }
    }

    fn authorize_url(&self, provider: &str, pkce: &PkceChallenge) -> Result<String, AuthError> {
        let mut params = vec![
            ("provider", provider.to_string()),
            ("code_challenge", pkce.code_challenge.clone()),
            ("code_challenge_method", pkce.challenge_method().to_string()),
        ];
        if let Some(redirect) = &self.redirect_url {
            params.push(("redirect_to", redirect.clone()));
        }

        Url::parse_with_params(&format!("{}/authorize", self.auth_url), &params)
            .map(String::from)
            .map_err(|e| AuthError::Unknown(format!("invalid authorize URL: {e}")))
    }
}

#[async_trait]
impl SessionOracle for GoTrueSessionOracle {
    async fn current_session(&self) -> Result<Option<Session>, ProviderError> {
        match self.storage.load() {
            Some(session) if session.is_expired(self.refresh_threshold_seconds) => {
                self.refresh(session).await
            }
            other => Ok(other),
        }
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let session =
            self.token_grant("password", json!({ "email": email, "password": password })).await?;
        info!(user_id = %session.user_id(), "signed in with password");
        self.adopt(&session, AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_in_with_oauth(&self, provider: &str) -> Result<OAuthRedirect, AuthError> {
        let pkce = PkceChallenge::generate();
        let url = self.authorize_url(provider, &pkce)?;
        *self.pending_verifier.lock() = Some(pkce.code_verifier);
        debug!(provider, "oauth authorization started");
        Ok(OAuthRedirect { provider: provider.to_string(), url })
    }

    async fn complete_oauth(&self, code: &str) -> Result<Session, AuthError> {
        let verifier = self.pending_verifier.lock().take().ok_or_else(|| {
            AuthError::MissingCredentials("no OAuth sign-in in progress".into())
        })?;

        let session = self
            .token_grant("pkce", json!({ "auth_code": code, "code_verifier": verifier }))
            .await?;
        info!(user_id = %session.user_id(), "signed in with oauth");
        self.adopt(&session, AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let body = json!({ "email": email, "password": password, "data": { "email": email } });
        let request = self.request(Method::POST, "signup").json(&body);
        let response = self.http.send_once(request).await?;
        let payload: SignUpResponse = parse_success(response).await?;

        match payload {
            SignUpResponse::Session(tokens) => {
                let session = tokens.into_session();
                info!(user_id = %session.user_id(), "signed up and signed in");
                self.adopt(&session, AuthEvent::SignedIn(session.clone()));
                Ok(session.user)
            }
            SignUpResponse::User(user) => {
                let identity = user.into_identity();
                info!(user_id = %identity.id, "signed up; confirmation pending");
                Ok(identity)
            }
        }
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let Some(session) = self.storage.load() else {
            return Ok(());
        };

        let request =
            self.request(Method::POST, "logout").bearer_auth(&session.access_token);
        let remote = match self.http.send(request).await {
            Ok(response) if response.status().is_success() => Ok(()),
            // An already invalid token is as signed out as it gets
            Ok(response) if matches!(response.status(), StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND) => Ok(()),
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                Err(provider_error_from_status(status, &body))
            }
            Err(err) => Err(err),
        };

        self.drop_session();
        info!(user_id = %session.user_id(), "signed out");
        if let Err(err) = &remote {
            warn!(error = %err, "remote logout failed; local session cleared");
        }
        remote
    }
}

#[async_trait]
impl AccessTokenProvider for GoTrueSessionOracle {
    async fn access_token(&self) -> Result<Option<String>, ProviderError> {
        Ok(self.current_session().await?.map(|session| session.access_token))
    }
}

/* -------------------------------------------------------------------------- */
/* Wire types */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl UserResponse {
    fn into_identity(self) -> Identity {
        // Phone-only users come back with an empty email
        Identity::new(self.id, self.email.filter(|email| !email.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    user: UserResponse,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let mut session = Session::new(
            self.access_token,
            self.refresh_token,
            self.expires_in,
            self.user.into_identity(),
        );
        if let Some(expires_at) = self.expires_at.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)) {
            session.expires_at = Some(expires_at);
        }
        if let Some(token_type) = self.token_type {
            session.token_type = token_type;
        }
        session
    }
}

/// Sign-up answers with a session when the project auto-confirms users and
/// with the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(UserResponse),
}

/// Both error shapes GoTrue has used over time.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

async fn parse_success<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, AuthError> {
    let status = response.status();
    let body = response.text().await.map_err(InfraError::from).map_err(ProviderError::from)?;

    if status.is_success() {
        return serde_json::from_str(&body)
            .map_err(InfraError::from)
            .map_err(|e| AuthError::Transport(e.into()));
    }

    Err(map_error(status, &body))
}

fn map_error(status: StatusCode, body: &str) -> AuthError {
    if status.is_server_error() {
        return AuthError::Transport(provider_error_from_status(status, body));
    }

    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.error_code.or(parsed.error).unwrap_or_default();
    let message = parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .unwrap_or_else(|| status.to_string());

    match code.as_str() {
        _ if status == StatusCode::TOO_MANY_REQUESTS => AuthError::RateLimited,
        "over_request_rate_limit" | "over_email_send_rate_limit" => AuthError::RateLimited,
        "user_already_exists" | "email_exists" => AuthError::AlreadyRegistered,
        "weak_password" => AuthError::WeakSecret(message),
        "invalid_grant" | "invalid_credentials"
            if matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED) =>
        {
            AuthError::InvalidCredentials
        }
        _ if message.contains("already registered") => AuthError::AlreadyRegistered,
        _ => AuthError::Unknown(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_legacy_invalid_grant() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(map_error(StatusCode::BAD_REQUEST, body), AuthError::InvalidCredentials);
    }

    #[test]
    fn maps_error_code_shape() {
        let body = r#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#;
        assert_eq!(map_error(StatusCode::UNPROCESSABLE_ENTITY, body), AuthError::AlreadyRegistered);

        let body = r#"{"code":422,"error_code":"weak_password","msg":"Password should be at least 6 characters."}"#;
        assert!(matches!(map_error(StatusCode::UNPROCESSABLE_ENTITY, body), AuthError::WeakSecret(msg) if msg.contains("6 characters")));
    }

    #[test]
    fn maps_rate_limit_and_server_errors() {
        assert_eq!(map_error(StatusCode::TOO_MANY_REQUESTS, ""), AuthError::RateLimited);
        assert!(matches!(map_error(StatusCode::BAD_GATEWAY, ""), AuthError::Transport(_)));
    }

    #[test]
    fn older_servers_report_registration_in_message() {
        let body = r#"{"code":400,"msg":"User already registered"}"#;
        assert_eq!(map_error(StatusCode::BAD_REQUEST, body), AuthError::AlreadyRegistered);
    }

    #[test]
    fn unknown_errors_keep_message() {
        let body = r#"{"message":"Signups not allowed for this instance"}"#;
        assert_eq!(
            map_error(StatusCode::FORBIDDEN, body),
            AuthError::Unknown("Signups not allowed for this instance".into())
        );
        assert_eq!(map_error(StatusCode::FORBIDDEN, "<html>"), AuthError::Unknown("403 Forbidden".into()));
    }

    #[test]
    fn token_response_uses_server_expiry() {
        let payload: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","token_type":"bearer","expires_in":3600,"expires_at":4102444800,
                "refresh_token":"r","user":{"id":"u1","email":""}}"#,
        )
        .unwrap();
        let session = payload.into_session();

        assert_eq!(session.expires_at.map(|t| t.timestamp()), Some(4_102_444_800));
        assert!(session.user.email.is_none());
    }

    #[test]
    fn sign_up_response_shapes() {
        let user: SignUpResponse =
            serde_json::from_str(r#"{"id":"u1","email":"a@x.com","aud":"authenticated"}"#).unwrap();
        assert!(matches!(user, SignUpResponse::User(_)));

        let session: SignUpResponse = serde_json::from_str(
            r#"{"access_token":"a","expires_in":60,"user":{"id":"u1","email":"a@x.com"}}"#,
        )
        .unwrap();
        assert!(matches!(session, SignUpResponse::Session(_)));
    }
}
