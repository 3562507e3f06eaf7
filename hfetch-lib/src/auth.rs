use crate::error::ServiceError;
use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::fmt;

/// Seconds shaved off the server-declared lifetime so a token is never used
/// right at its expiry.
const EXPIRY_MARGIN_SECS: i64 = 2;

/// An API client allowed to make calls: its id and secret key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// `Basic base64(id:secret)`
    pub fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(raw.as_bytes()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Result<Self> {
        let expires_at = response
            .expires_in
            .checked_sub(EXPIRY_MARGIN_SECS)
            .and_then(TimeDelta::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                anyhow!(
                    "Access token lifetime out of range: expires_in = {}",
                    response.expires_in
                )
            })?;
        Ok(Self {
            token: response.access_token,
            expires_at,
        })
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Matches the JSON body of a successful token request
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Exchanges client credentials for an access token.
///
/// Anything but HTTP 200 is reported as [`ServiceError::Authorization`]
/// carrying the status and the response body.
pub async fn fetch_access_token(
    client: &Client,
    access_token_url: &str,
    credentials: &Credentials,
) -> Result<AccessToken> {
    tracing::debug!("Requesting access token from {}", access_token_url);

    let response = client
        .post(access_token_url)
        .header(AUTHORIZATION, credentials.basic_auth_header())
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", access_token_url))?;

    let status = response.status().as_u16();
    if status != 200 {
        let message = response.text().await.unwrap_or_default();
        return Err(ServiceError::Authorization {
            http_code: status,
            message,
        }
        .into());
    }

    let body: TokenResponse = response
        .json()
        .await
        .context("Malformed access token response")?;
    let token = AccessToken::from_response(body, Utc::now())?;
    tracing::debug!("Access token valid until {}", token.expires_at);
    Ok(token)
}
