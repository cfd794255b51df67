//! Management API client
//!
//! Bearer-authenticated HTTP client for the tenant management API. Tool
//! handlers use it to execute calls; the environment validator uses it for
//! `GET /environments/{id}`.

use async_trait::async_trait;
use http::StatusCode;
use reqwest::{Client, Method, RequestBuilder};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::ApiConfig;
use crate::domain::{Environment, EnvironmentId};
use crate::errors::{Error, Result};
use crate::validation::{EnvironmentLookup, LookupClientFactory, LookupError, LookupResponse};

/// Raw response from the management API
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Authenticated HTTP client for the management API
#[derive(Debug, Clone)]
pub struct ManagementClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ManagementClient {
    /// Create a new client for `config.base_url` authenticating with `token`
    pub fn new(config: &ApiConfig, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(concat!("envgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request with authentication
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        self.client.request(method, &url).bearer_auth(&self.token)
    }

    /// Send a request and return the status and body, whatever the status
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&serde_json::Value>,
    ) -> std::result::Result<ApiResponse, reqwest::Error> {
        let mut request = self.request(method, path);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            trace!(body = %body, "Request body");
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = %status, body_length = body.len(), "Management API response");

        Ok(ApiResponse { status, body })
    }
}

#[async_trait]
impl EnvironmentLookup for ManagementClient {
    async fn get_environment(
        &self,
        id: EnvironmentId,
    ) -> std::result::Result<LookupResponse, LookupError> {
        let path = format!("/environments/{}", id);
        let response = self
            .send(Method::GET, &path, &[], None)
            .await
            .map_err(|e| LookupError::new(e.status(), format!("request failed: {}", e)))?;

        let status = response.status;
        if !status.is_success() {
            return Err(LookupError::new(
                Some(status),
                format!("HTTP {}: {}", status.as_u16(), response.body.trim()),
            ));
        }

        if response.body.trim().is_empty() {
            return Ok(LookupResponse { environment: None, status });
        }

        let environment: Option<Environment> =
            serde_json::from_str(&response.body).map_err(|e| {
                LookupError::new(Some(status), format!("invalid environment payload: {}", e))
            })?;

        Ok(LookupResponse { environment, status })
    }
}

/// Client factory backed by a token resolved once at startup
#[derive(Debug, Clone)]
pub struct StaticTokenClientFactory {
    client: Option<Arc<ManagementClient>>,
}

impl StaticTokenClientFactory {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = match config.access_token.as_deref() {
            Some(token) => Some(Arc::new(ManagementClient::new(config, token)?)),
            None => None,
        };
        Ok(Self { client })
    }

    /// The management client, or an error when no access token is configured
    pub fn management_client(&self) -> Result<Arc<ManagementClient>> {
        self.client.clone().ok_or_else(|| {
            Error::config("no access token configured (set ENVGATE_ACCESS_TOKEN or --access-token)")
        })
    }
}

#[async_trait]
impl LookupClientFactory for StaticTokenClientFactory {
    async fn client(&self) -> Result<Arc<dyn EnvironmentLookup>> {
        let client: Arc<dyn EnvironmentLookup> = self.management_client()?;
        Ok(client)
    }
}
