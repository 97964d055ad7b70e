//! Error type shared by the credential, cluster and reconcile layers.

use thiserror::Error;

/// Errors that can occur while authenticating, enumerating or rebooting.
#[derive(Error, Debug)]
pub enum NodemonError {
    /// Credentials could not be read from the terminal.
    #[error("unable to read credentials: {0}")]
    Credentials(#[from] dialoguer::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Required OpenStack environment variables are missing.
    #[error("environment error: {0}")]
    Environment(String),

    /// Identity service rejected the authentication request.
    #[error("authentication failed: {status} - {message}")]
    Auth { status: u16, message: String },

    /// Identity service answered without an `X-Subject-Token` header.
    #[error("identity service returned no X-Subject-Token header")]
    MissingToken,

    /// Service catalog has no usable endpoint.
    #[error("no public {service} endpoint found in catalog (region: {region})")]
    EndpointNotFound { service: String, region: String },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Compute API returned an error response.
    #[error("compute API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Kubernetes API call failed.
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_start_lowercase() {
        let errors = [
            NodemonError::Config("no endpoint".to_string()),
            NodemonError::Environment("OS_AUTH_URL is not set".to_string()),
            NodemonError::Auth {
                status: 401,
                message: "denied".to_string(),
            },
            NodemonError::MissingToken,
            NodemonError::Api {
                status: 409,
                message: "conflict".to_string(),
            },
        ];

        for err in errors {
            let msg = err.to_string();
            assert!(msg.starts_with(char::is_lowercase), "{msg}");
        }
    }
}
