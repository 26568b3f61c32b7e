//! Profile repository backed by a PostgREST endpoint
//!
//! Rows live in `{backend.url}/rest/v1/{table}`. Requests act as the signed-in
//! user when a token is available so row-level security applies; otherwise
//! the anon key is used as the bearer.

use std::sync::Arc;

use accountsync_core::ProfileRepository;
use accountsync_domain::{
    AccountError, Config, ProfileRecord, ProfileSeed, StoreError, UserId,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::auth::AccessTokenProvider;
use crate::errors::InfraError;
use crate::http::HttpClient;

/// PostgREST-backed implementation of `ProfileRepository`
pub struct PostgrestProfileRepository {
    http: HttpClient,
    table_url: String,
    anon_key: String,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl PostgrestProfileRepository {
    /// Create a repository for the configured profiles table.
    ///
    /// # Errors
    /// Returns `AccountError::Config` when the backend URL is not a URL.
    pub fn new(
        config: &Config,
        http: HttpClient,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, AccountError> {
        let base = Url::parse(&config.backend.url)
            .map_err(|e| AccountError::Config(format!("Invalid backend URL: {e}")))?;

        Ok(Self {
            http,
            table_url: format!(
                "{}/rest/v1/{}",
                base.as_str().trim_end_matches('/'),
                urlencoding::encode(&config.store.profiles_table)
            ),
            anon_key: config.backend.anon_key.clone(),
            tokens,
        })
    }

    async fn request(&self, method: Method) -> Result<RequestBuilder, StoreError> {
        let bearer = self.tokens.access_token().await?.unwrap_or_else(|| self.anon_key.clone());

        Ok(self
            .http
            .request(method, &self.table_url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer))
    }

    async fn row_from(response: Response) -> Result<ProfileRecord, StoreError> {
        let rows: Vec<ProfileRecord> = parse_rows(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Unknown("store returned no representation".into()))
    }
}

#[async_trait]
impl ProfileRepository for PostgrestProfileRepository {
    async fn find(&self, id: &UserId) -> Result<Option<ProfileRecord>, StoreError> {
        let request = self
            .request(Method::GET)
            .await?
            .query(&[("id", format!("eq.{id}")), ("select", "*".to_string())]);

        let response = self.http.send(request).await?;
        let rows: Vec<ProfileRecord> = parse_rows(response).await?;
        debug!(user_id = %id, found = !rows.is_empty(), "profile lookup");
        Ok(rows.into_iter().next())
    }

    async fn create(&self, id: &UserId, seed: ProfileSeed) -> Result<ProfileRecord, StoreError> {
        let record = ProfileRecord::seeded(id.clone(), seed, Utc::now());
        let request = self
            .request(Method::POST)
            .await?
            .header("Prefer", "return=representation")
            .json(&record);

        // A replayed insert would come back as a conflict for our own row
        let response = self.http.send_once(request).await?;
        let created = Self::row_from(response).await?;
        info!(user_id = %id, "profile row created");
        Ok(created)
    }

    async fn upsert(&self, record: ProfileRecord) -> Result<ProfileRecord, StoreError> {
        let request = self
            .request(Method::POST)
            .await?
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&record);

        let response = self.http.send(request).await?;
        let stored = Self::row_from(response).await?;
        debug!(user_id = %stored.id, "profile row upserted");
        Ok(stored)
    }
}

/// PostgREST error payload.
#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

async fn parse_rows(response: Response) -> Result<Vec<ProfileRecord>, StoreError> {
    let status = response.status();
    let body = response.text().await.map_err(InfraError::from)?;

    if status.is_success() {
        return serde_json::from_str(&body).map_err(|e| InfraError::from(e).into());
    }

    Err(map_error(status, &body))
}

fn map_error(status: StatusCode, body: &str) -> StoreError {
    let parsed: PostgrestError = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message.unwrap_or_else(|| {
        if body.is_empty() { status.to_string() } else { body.to_string() }
    });

    match (status, parsed.code.as_deref()) {
        (StatusCode::CONFLICT, _) | (_, Some("23505")) => StoreError::Conflict(message),
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) | (_, Some("42501")) => {
            StoreError::Unauthorized(message)
        }
        _ => StoreError::Unknown(format!("{status}: {message}")),
    }
}
