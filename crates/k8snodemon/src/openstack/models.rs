//! Keystone v3 and Nova v2.1 request and response models.

use serde::{Deserialize, Serialize};

use crate::credentials::{AuthOptions, DomainRef, Identity, ProjectScope, UserRef};

// ============================================================================
// Identity (Keystone v3)
// ============================================================================

/// Body for `POST /v3/auth/tokens`.
#[derive(Debug, Serialize)]
pub struct AuthRequest {
    pub auth: AuthBody,
}

/// Identity and optional scope.
#[derive(Debug, Serialize)]
pub struct AuthBody {
    pub identity: IdentityBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeBody>,
}

/// Identity methods and their data.
#[derive(Debug, Default, Serialize)]
pub struct IdentityBody {
    pub methods: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<PasswordBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_credential: Option<ApplicationCredentialBody>,
}

/// Password method data.
#[derive(Debug, Serialize)]
pub struct PasswordBody {
    pub user: UserBody,
}

/// User reference with password.
#[derive(Debug, Serialize)]
pub struct UserBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<DomainBody>,
    pub password: String,
}

/// Domain reference.
#[derive(Debug, Serialize)]
pub struct DomainBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Token method data.
#[derive(Debug, Serialize)]
pub struct TokenBody {
    pub id: String,
}

/// Application credential method data.
#[derive(Debug, Serialize)]
pub struct ApplicationCredentialBody {
    pub id: String,
    pub secret: String,
}

/// Token scope.
#[derive(Debug, Serialize)]
pub struct ScopeBody {
    pub project: ProjectBody,
}

/// Project reference.
#[derive(Debug, Serialize)]
pub struct ProjectBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<DomainBody>,
}

impl From<&DomainRef> for DomainBody {
    fn from(domain: &DomainRef) -> Self {
        match domain {
            DomainRef::Id(id) => Self {
                id: Some(id.clone()),
                name: None,
            },
            DomainRef::Name(name) => Self {
                id: None,
                name: Some(name.clone()),
            },
        }
    }
}

impl From<&AuthOptions> for AuthRequest {
    fn from(opts: &AuthOptions) -> Self {
        let mut identity = IdentityBody {
            methods: vec![opts.identity.method().to_string()],
            ..IdentityBody::default()
        };

        match &opts.identity {
            Identity::Password { user, password } => {
                let user = match user {
                    UserRef::Id(id) => UserBody {
                        id: Some(id.clone()),
                        name: None,
                        domain: None,
                        password: password.clone(),
                    },
                    UserRef::Name { name, domain } => UserBody {
                        id: None,
                        name: Some(name.clone()),
                        domain: Some(domain.into()),
                        password: password.clone(),
                    },
                };
                identity.password = Some(PasswordBody { user });
            }
            Identity::Token { id } => {
                identity.token = Some(TokenBody { id: id.clone() });
            }
            Identity::ApplicationCredential { id, secret } => {
                identity.application_credential = Some(ApplicationCredentialBody {
                    id: id.clone(),
                    secret: secret.clone(),
                });
            }
        }

        let scope = opts.scope.as_ref().map(|scope| {
            let project = match scope {
                ProjectScope::Id(id) => ProjectBody {
                    id: Some(id.clone()),
                    name: None,
                    domain: None,
                },
                ProjectScope::Name { name, domain } => ProjectBody {
                    id: None,
                    name: Some(name.clone()),
                    domain: Some(domain.into()),
                },
            };
            ScopeBody { project }
        });

        Self {
            auth: AuthBody { identity, scope },
        }
    }
}

/// Response from `POST /v3/auth/tokens`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token: TokenDetails,
}

/// Token details; only the catalog is used.
#[derive(Debug, Deserialize)]
pub struct TokenDetails {
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

/// Service in the catalog.
#[derive(Debug, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

/// Endpoint of a catalog service.
#[derive(Debug, Deserialize)]
pub struct CatalogEndpoint {
    pub interface: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_id: Option<String>,
    pub url: String,
}

impl CatalogEndpoint {
    /// Whether the endpoint serves `region`; `None` matches every region.
    pub fn in_region(&self, region: Option<&str>) -> bool {
        match region {
            None => true,
            Some(wanted) => {
                self.region.as_deref() == Some(wanted) || self.region_id.as_deref() == Some(wanted)
            }
        }
    }
}

// ============================================================================
// Compute (Nova v2.1)
// ============================================================================

/// A compute instance as returned by `GET /servers/detail`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    /// Instance UUID.
    pub id: String,
    /// Instance name.
    pub name: String,
    /// Nova status (ACTIVE, ERROR, SHUTOFF, ...).
    pub status: String,
    /// Remaining server attributes, kept for verbose dumps.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Response from `GET /servers/detail`.
#[derive(Debug, Deserialize)]
pub struct ServerListResponse {
    #[serde(default)]
    pub servers: Vec<Server>,
    #[serde(default)]
    pub servers_links: Vec<Link>,
}

impl ServerListResponse {
    /// URL of the next page, if any.
    pub fn next_page(&self) -> Option<&str> {
        self.servers_links
            .iter()
            .find(|link| link.rel == "next")
            .map(|link| link.href.as_str())
    }
}

/// Pagination link.
#[derive(Debug, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

/// Body for `POST /servers/{id}/action` carrying a reboot.
#[derive(Debug, Serialize)]
pub struct RebootRequest {
    pub reboot: RebootBody,
}

/// Reboot action.
#[derive(Debug, Serialize)]
pub struct RebootBody {
    /// "SOFT" or "HARD".
    #[serde(rename = "type")]
    pub reboot_type: String,
}
