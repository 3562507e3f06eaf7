//! Client for the SideFX web API.
//!
//! The API exposes RPC-style functions grouped in dotted families, such as
//! `download.get_daily_builds_list`. Every call is a single POST carrying a
//! `json` form field with `[function_name, args, kwargs]`.

use crate::auth::{AccessToken, Credentials, fetch_access_token};
use crate::config::Config;
use crate::error::ServiceError;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub struct Service {
    client: Client,
    endpoint_url: String,
    access_token: AccessToken,
}

impl Service {
    /// Connects to the API described by `config`.
    ///
    /// `cached_token` is reused as long as it has not expired; otherwise a new
    /// token is requested with `credentials`. The token is not refreshed
    /// afterwards.
    pub async fn connect(
        client: Client,
        config: &Config,
        credentials: &Credentials,
        cached_token: Option<AccessToken>,
    ) -> Result<Self> {
        let access_token = match cached_token {
            Some(token) if !token.is_expired() => {
                tracing::debug!("Reusing access token valid until {}", token.expires_at);
                token
            }
            _ => fetch_access_token(&client, &config.access_token_url, credentials).await?,
        };
        Ok(Self::with_token(client, &config.endpoint_url, access_token))
    }

    pub fn with_token(client: Client, endpoint_url: &str, access_token: AccessToken) -> Self {
        Self {
            client,
            endpoint_url: endpoint_url.to_string(),
            access_token,
        }
    }

    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Starts building a call to the API function (or function family) `name`.
    pub fn function(&self, name: &str) -> ApiFunction<'_> {
        ApiFunction {
            service: self,
            name: name.to_string(),
            args: Vec::new(),
            kwargs: Map::new(),
        }
    }

    /// Calls `function_name` and returns the decoded JSON result.
    ///
    /// Anything but HTTP 200 is reported as [`ServiceError::Api`].
    pub async fn call_api(
        &self,
        function_name: &str,
        args: &[Value],
        kwargs: &Map<String, Value>,
    ) -> Result<Value> {
        let payload = encode_call(function_name, args, kwargs)?;
        tracing::debug!("Calling {}", function_name);

        let response = self
            .client
            .post(&self.endpoint_url)
            .bearer_auth(&self.access_token.token)
            .form(&[("json", payload)])
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.endpoint_url))?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                http_code: status,
                message,
            }
            .into());
        }

        response
            .json()
            .await
            .with_context(|| format!("Malformed response from {}", function_name))
    }
}

/// A pending API call. Build the dotted name with [`ApiFunction::attr`], add
/// arguments, then [`ApiFunction::invoke`] it.
#[derive(Clone)]
pub struct ApiFunction<'a> {
    service: &'a Service,
    name: String,
    args: Vec<Value>,
    kwargs: Map<String, Value>,
}

impl<'a> ApiFunction<'a> {
    /// Descends into a member of this function family.
    pub fn attr(mut self, name: &str) -> Self {
        self.name.push('.');
        self.name.push_str(name);
        self
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn kwarg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.to_string(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> Result<String> {
        encode_call(&self.name, &self.args, &self.kwargs)
    }

    pub async fn invoke(self) -> Result<Value> {
        self.service
            .call_api(&self.name, &self.args, &self.kwargs)
            .await
    }

    pub async fn invoke_as<T: DeserializeOwned>(self) -> Result<T> {
        let name = self.name.clone();
        let value = self.invoke().await?;
        serde_json::from_value(value)
            .with_context(|| format!("Unexpected response shape from {}", name))
    }
}

fn encode_call(function_name: &str, args: &[Value], kwargs: &Map<String, Value>) -> Result<String> {
    serde_json::to_string(&(function_name, args, kwargs))
        .with_context(|| format!("Failed to encode call to {}", function_name))
}
