//! Conversions from transport errors into the domain taxonomy.

use accountsync_domain::{AccountError, ProviderError, StoreError};
use reqwest::{Error as HttpError, StatusCode};

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub ProviderError);

impl From<InfraError> for ProviderError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<InfraError> for StoreError {
    fn from(value: InfraError) -> Self {
        value.0.into()
    }
}

impl From<InfraError> for AccountError {
    fn from(value: InfraError) -> Self {
        Self::Provider(value.0)
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ProviderError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for InfraError {
    fn from(err: HttpError) -> Self {
        let unreachable = err.is_timeout() || err.is_connect();
        let message = match err.url() {
            Some(url) => format!("{} ({})", err, strip_query(url)),
            None => err.to_string(),
        };

        if unreachable {
            Self(ProviderError::Unreachable(message))
        } else {
            Self(ProviderError::Unknown(message))
        }
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(err: serde_json::Error) -> Self {
        Self(ProviderError::Unknown(format!("invalid response body: {err}")))
    }
}

/// Status codes the adapters do not interpret themselves.
pub fn provider_error_from_status(status: StatusCode, body: &str) -> ProviderError {
    let detail = if body.is_empty() { status.to_string() } else { format!("{status}: {body}") };
    if status.is_server_error() {
        ProviderError::Unreachable(detail)
    } else {
        ProviderError::Unknown(detail)
    }
}

/// Query strings may carry user ids and API keys; keep them out of errors.
fn strip_query(url: &url::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
