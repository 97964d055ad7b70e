//! Keystone v3 authentication and Nova compute client.
//!
//! API Documentation:
//! - Identity: <https://docs.openstack.org/api-ref/identity/v3/>
//! - Compute: <https://docs.openstack.org/api-ref/compute/>

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use super::models::{
    AuthRequest, RebootBody, RebootRequest, Server, ServerListResponse, TokenResponse,
};
use crate::cluster::ComputeApi;
use crate::credentials::AuthOptions;
use crate::error::NodemonError;
use crate::reboot::RebootMethod;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Header carrying a freshly issued token.
const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Header used to present the token.
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Catalog service type of Nova.
const COMPUTE_SERVICE_TYPE: &str = "compute";

/// Authenticated Nova client.
#[derive(Clone)]
pub struct ComputeClient {
    /// HTTP client.
    client: Client,
    /// Compute endpoint from the service catalog.
    endpoint: String,
    /// Keystone token.
    token: String,
}

impl std::fmt::Debug for ComputeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ComputeClient {
    /// Authenticate against Keystone and pick the public compute endpoint.
    ///
    /// # Arguments
    /// * `opts` - Authentication options
    /// * `region` - Compute region; `None` or empty accepts any region
    ///
    /// # Errors
    /// Returns error if authentication fails or the catalog has no matching
    /// compute endpoint.
    pub async fn authenticate(
        opts: &AuthOptions,
        region: Option<&str>,
    ) -> Result<Self, NodemonError> {
        if opts.identity_endpoint.is_empty() {
            return Err(NodemonError::Config(
                "identity endpoint is not set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        let url = tokens_url(&opts.identity_endpoint);
        info!(url = %url, method = opts.identity.method(), "Authenticating with identity service");

        let response = client
            .post(&url)
            .json(&AuthRequest::from(opts))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NodemonError::Auth {
                status: status.as_u16(),
                message: text,
            });
        }

        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(NodemonError::MissingToken)?;

        let text = response.text().await?;
        let body: TokenResponse = serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, "Failed to parse token response");
            NodemonError::Serialization(e)
        })?;

        let region = region.filter(|r| !r.is_empty());
        let endpoint = body
            .token
            .catalog
            .iter()
            .filter(|entry| entry.service_type == COMPUTE_SERVICE_TYPE)
            .flat_map(|entry| entry.endpoints.iter())
            .find(|ep| ep.interface == "public" && ep.in_region(region))
            .map(|ep| ep.url.trim_end_matches('/').to_string())
            .ok_or_else(|| NodemonError::EndpointNotFound {
                service: COMPUTE_SERVICE_TYPE.to_string(),
                region: region.unwrap_or("any").to_string(),
            })?;

        info!(
            endpoint = %endpoint,
            expires_at = body.token.expires_at.as_deref().unwrap_or("unknown"),
            "Authenticated compute client"
        );

        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    /// Build a client from an existing token and compute endpoint.
    #[cfg(test)]
    pub(crate) fn with_token(
        endpoint: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, NodemonError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Compute endpoint in use.
    #[cfg(test)]
    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Make an authenticated GET request to an absolute URL.
    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, NodemonError> {
        debug!(url = %url, "GET request");

        let response = self
            .client
            .get(url)
            .header(AUTH_TOKEN_HEADER, &self.token)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make an authenticated POST request that returns an empty body.
    async fn post_empty<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), NodemonError> {
        let url = format!("{}{path}", self.endpoint);
        debug!(url = %url, "POST request (empty response)");

        let response = self
            .client
            .post(&url)
            .header(AUTH_TOKEN_HEADER, &self.token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(NodemonError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    /// Handle API response, parsing JSON or error.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, NodemonError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, body = %text, "Failed to parse response");
                NodemonError::Serialization(e)
            })
        } else if status == StatusCode::UNAUTHORIZED {
            Err(NodemonError::Auth {
                status: status.as_u16(),
                message: text,
            })
        } else {
            Err(NodemonError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}

#[async_trait]
impl ComputeApi for ComputeClient {
    async fn list_servers(&self) -> Result<Vec<Server>, NodemonError> {
        let mut servers = Vec::new();
        let mut url = format!("{}/servers/detail", self.endpoint);
        let mut visited = HashSet::new();

        loop {
            visited.insert(url.clone());
            let page: ServerListResponse = self.get(&url).await?;
            debug!(count = page.servers.len(), "Fetched server page");

            let next = page.next_page().map(str::to_string);
            servers.extend(page.servers);

            match next {
                Some(next) if !visited.contains(&next) => url = next,
                Some(next) => {
                    warn!(url = %next, "Pagination link already visited, stopping");
                    break;
                }
                None => break,
            }
        }

        info!(count = servers.len(), "Listed compute instances");
        Ok(servers)
    }

    async fn reboot_server(&self, id: &str, method: RebootMethod) -> Result<(), NodemonError> {
        info!(server_id = %id, %method, "Requesting reboot");

        let req = RebootRequest {
            reboot: RebootBody {
                reboot_type: method.nova_type().to_string(),
            },
        };
        self.post_empty(&format!("/servers/{id}/action"), &req).await
    }
}

/// Token request URL for an identity endpoint.
///
/// `/v3` is appended unless the endpoint already ends with it.
fn tokens_url(identity_endpoint: &str) -> String {
    let base = identity_endpoint.trim_end_matches('/');
    if base.ends_with("/v3") {
        format!("{base}/auth/tokens")
    } else {
        format!("{base}/v3/auth/tokens")
    }
}
