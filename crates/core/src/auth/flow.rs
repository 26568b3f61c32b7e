//! Login screen behaviour on top of the session oracle
//!
//! Every operation answers with a [`Notice`] the screen can show as-is.

use std::sync::Arc;

use accountsync_common::validation::CredentialRules;
use accountsync_domain::constants::{
    MSG_ALREADY_REGISTERED, MSG_LOGIN_SUCCESS, MSG_SIGNUP_SUCCESS, MSG_UNEXPECTED,
    OAUTH_PROVIDER_GOOGLE, OAUTH_PROVIDER_MICROSOFT,
};
use accountsync_domain::{AuthError, Notice, Session};
use tracing::{debug, info, warn};

use crate::session::ports::{OAuthRedirect, SessionOracle};

/// OAuth providers offered next to the password form
pub const OAUTH_PROVIDERS: [&str; 2] = [OAUTH_PROVIDER_GOOGLE, OAUTH_PROVIDER_MICROSOFT];

pub struct AuthFlow {
    oracle: Arc<dyn SessionOracle>,
    rules: CredentialRules,
}

impl AuthFlow {
    pub fn new(oracle: Arc<dyn SessionOracle>, min_password_length: usize) -> Self {
        Self { oracle, rules: CredentialRules::new(min_password_length) }
    }

    /// `true` when a session already exists and the login screen can be
    /// skipped. Provider failures count as "no session".
    pub async fn check_session(&self) -> bool {
        match self.oracle.current_session().await {
            Ok(session) => session.is_some(),
            Err(err) => {
                warn!(error = %err, "session check failed");
                false
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Notice {
        if let Err(err) = self.rules.check_presence(email, password) {
            return Notice::error(err.first_message().unwrap_or_default());
        }

        match self.oracle.sign_in_with_password(email.trim(), password).await {
            Ok(session) => {
                info!(user_id = %session.user_id(), "password sign-in succeeded");
                Notice::success(MSG_LOGIN_SUCCESS)
            }
            Err(err) => {
                warn!(label = err.label(), "password sign-in failed");
                login_error(&err)
            }
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Notice {
        if let Err(err) = self.rules.check_sign_up(email, password) {
            return Notice::error(err.first_message().unwrap_or_default());
        }

        match self.oracle.sign_up(email.trim(), password).await {
            Ok(identity) => {
                info!(user_id = %identity.id, "account created");
                Notice::success(MSG_SIGNUP_SUCCESS)
            }
            Err(AuthError::AlreadyRegistered) => Notice::error(MSG_ALREADY_REGISTERED),
            Err(AuthError::Transport(err)) => {
                warn!(error = %err, "sign-up could not reach the provider");
                Notice::error(MSG_UNEXPECTED)
            }
            Err(err) => {
                warn!(label = err.label(), "sign-up failed");
                Notice::error(format!("Signup error: {err}"))
            }
        }
    }

    /// Start an OAuth sign-in. The caller redirects to the returned URL.
    ///
    /// # Errors
    /// A [`Notice`] describing why the redirect could not be built.
    pub async fn sign_in_with_oauth(&self, provider: &str) -> Result<OAuthRedirect, Notice> {
        if !OAUTH_PROVIDERS.contains(&provider) {
            return Err(Notice::error(format!("{provider} login error: unsupported provider")));
        }

        match self.oracle.sign_in_with_oauth(provider).await {
            Ok(redirect) => {
                debug!(provider, "oauth redirect prepared");
                Ok(redirect)
            }
            Err(AuthError::Transport(err)) => {
                warn!(provider, error = %err, "oauth sign-in could not reach the provider");
                Err(Notice::error(MSG_UNEXPECTED))
            }
            Err(err) => {
                warn!(provider, label = err.label(), "oauth sign-in failed");
                Err(Notice::error(format!("{provider} login error: {err}")))
            }
        }
    }

    /// Finish the OAuth redirect with the authorization code from the
    /// callback. Subscribers observe the resulting `SignedIn`.
    ///
    /// # Errors
    /// A [`Notice`] describing the failed exchange.
    pub async fn complete_oauth(&self, code: &str) -> Result<Session, Notice> {
        if code.trim().is_empty() {
            return Err(Notice::error("Login error: missing authorization code"));
        }

        self.oracle.complete_oauth(code).await.map_err(|err| {
            warn!(label = err.label(), "oauth code exchange failed");
            login_error(&err)
        })
    }

    /// Password reset is not offered.
    ///
    /// # Errors
    /// Always [`AuthError::Unsupported`].
    pub async fn reset_password(&self, _email: &str) -> Result<(), AuthError> {
        Err(AuthError::Unsupported("password reset".into()))
    }
}

fn login_error(err: &AuthError) -> Notice {
    match err {
        AuthError::Transport(_) => Notice::error(MSG_UNEXPECTED),
        other => Notice::error(format!("Login error: {other}")),
    }
}
