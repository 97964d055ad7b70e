//! Credential collection and authentication option selection.
//!
//! Credentials arrive from command-line flags, an interactive prompt, or the
//! standard `OS_*` environment variables. [`CredentialFlags::resolve`] turns
//! them into the [`AuthOptions`] handed to the identity service.

use std::fmt;

use dialoguer::{Input, Password};
use tracing::debug;

use crate::error::NodemonError;

/// Domain used for users and projects when none is given.
pub const DEFAULT_DOMAIN_ID: &str = "default";

/// Raw credential inputs as given on the command line.
#[derive(Clone, Default)]
pub struct CredentialFlags {
    /// Identity service URL.
    pub endpoint: String,
    /// Pre-issued token.
    pub token: String,
    /// Application credential id.
    pub appid: String,
    /// Username.
    pub name: String,
    /// Password, or application credential secret when `appid` is set.
    pub password: String,
    /// Project name used for scoping.
    pub project: String,
    /// Take everything from the `OS_*` environment.
    pub env: bool,
}

impl fmt::Debug for CredentialFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialFlags")
            .field("endpoint", &self.endpoint)
            .field("token", &redact(&self.token))
            .field("appid", &self.appid)
            .field("name", &self.name)
            .field("password", &redact(&self.password))
            .field("project", &self.project)
            .field("env", &self.env)
            .finish()
    }
}

impl CredentialFlags {
    /// Whether username and password must be asked for interactively.
    ///
    /// True when no username and no token were given and the environment is
    /// not used, even if an application credential id is present.
    pub fn needs_prompt(&self) -> bool {
        self.name.is_empty() && self.token.is_empty() && !self.env
    }

    /// Ask for username and password on the terminal.
    ///
    /// The password is read without echo. Both values are trimmed.
    pub fn prompt(&mut self) -> Result<(), NodemonError> {
        let username: String = Input::new()
            .with_prompt("Enter Username")
            .allow_empty(true)
            .interact_text()?;
        let password = Password::new()
            .with_prompt("Enter Password")
            .allow_empty_password(true)
            .interact()?;

        self.name = username.trim().to_string();
        self.password = password.trim().to_string();
        Ok(())
    }

    /// Select the authentication method.
    ///
    /// Precedence is application credential, then token, then environment,
    /// then username and password. `lookup` reads environment variables and
    /// is only consulted when `env` is set.
    pub fn resolve<F>(&self, lookup: F) -> Result<AuthOptions, NodemonError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let project_scope = || {
            Some(ProjectScope::Name {
                name: self.project.clone(),
                domain: DomainRef::Id(DEFAULT_DOMAIN_ID.to_string()),
            })
        };

        let options = if !self.appid.is_empty() {
            AuthOptions {
                identity_endpoint: self.endpoint.clone(),
                identity: Identity::ApplicationCredential {
                    id: self.appid.clone(),
                    secret: self.password.clone(),
                },
                scope: None,
            }
        } else if !self.token.is_empty() {
            AuthOptions {
                identity_endpoint: self.endpoint.clone(),
                identity: Identity::Token {
                    id: self.token.clone(),
                },
                scope: project_scope(),
            }
        } else if self.env {
            AuthOptions::from_env(lookup)?
        } else {
            AuthOptions {
                identity_endpoint: self.endpoint.clone(),
                identity: Identity::Password {
                    user: UserRef::Name {
                        name: self.name.clone(),
                        domain: DomainRef::Id(DEFAULT_DOMAIN_ID.to_string()),
                    },
                    password: self.password.clone(),
                },
                scope: project_scope(),
            }
        };

        debug!(method = options.identity.method(), "Selected authentication method");
        Ok(options)
    }
}

/// Everything needed to request a token from the identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOptions {
    /// Identity service URL.
    pub identity_endpoint: String,
    /// How to prove identity.
    pub identity: Identity,
    /// Project to scope the token to, if any.
    pub scope: Option<ProjectScope>,
}

impl AuthOptions {
    /// Build options from the standard OpenStack environment variables.
    ///
    /// Empty variables count as unset. `OS_AUTH_URL` is always required;
    /// without an application credential a user (name or id) and a password
    /// are required as well.
    pub fn from_env<F>(lookup: F) -> Result<Self, NodemonError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let first = |keys: &[&str]| keys.iter().find_map(|&k| var(k));

        let identity_endpoint = var("OS_AUTH_URL").ok_or_else(|| {
            NodemonError::Environment("OS_AUTH_URL is not set".to_string())
        })?;

        let domain = match (var("OS_DOMAIN_ID"), var("OS_DOMAIN_NAME")) {
            (Some(id), _) => DomainRef::Id(id),
            (None, Some(name)) => DomainRef::Name(name),
            (None, None) => DomainRef::Id(DEFAULT_DOMAIN_ID.to_string()),
        };

        let scope = if let Some(id) = first(&["OS_PROJECT_ID", "OS_TENANT_ID"]) {
            Some(ProjectScope::Id(id))
        } else {
            first(&["OS_PROJECT_NAME", "OS_TENANT_NAME"]).map(|name| ProjectScope::Name {
                name,
                domain: domain.clone(),
            })
        };

        let app_id = var("OS_APPLICATION_CREDENTIAL_ID");
        let app_secret = var("OS_APPLICATION_CREDENTIAL_SECRET");
        if let (Some(id), Some(secret)) = (app_id, app_secret) {
            return Ok(Self {
                identity_endpoint,
                identity: Identity::ApplicationCredential { id, secret },
                scope: None,
            });
        }

        let user = match (var("OS_USERID"), var("OS_USERNAME")) {
            (Some(id), _) => UserRef::Id(id),
            (None, Some(name)) => UserRef::Name { name, domain },
            (None, None) => {
                return Err(NodemonError::Environment(
                    "OS_USERNAME or OS_USERID is not set".to_string(),
                ))
            }
        };
        let password = var("OS_PASSWORD")
            .ok_or_else(|| NodemonError::Environment("OS_PASSWORD is not set".to_string()))?;

        Ok(Self {
            identity_endpoint,
            identity: Identity::Password { user, password },
            scope,
        })
    }
}

/// Identity proof sent to Keystone.
#[derive(Clone, PartialEq, Eq)]
pub enum Identity {
    /// Username or user id with password.
    Password { user: UserRef, password: String },
    /// Existing token.
    Token { id: String },
    /// Application credential id and secret.
    ApplicationCredential { id: String, secret: String },
}

impl Identity {
    /// Keystone method name.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::Token { .. } => "token",
            Self::ApplicationCredential { .. } => "application_credential",
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { user, password } => f
                .debug_struct("Password")
                .field("user", user)
                .field("password", &redact(password))
                .finish(),
            Self::Token { id } => f.debug_struct("Token").field("id", &redact(id)).finish(),
            Self::ApplicationCredential { id, secret } => f
                .debug_struct("ApplicationCredential")
                .field("id", id)
                .field("secret", &redact(secret))
                .finish(),
        }
    }
}

/// User reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Id(String),
    Name { name: String, domain: DomainRef },
}

/// Domain reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainRef {
    Id(String),
    Name(String),
}

/// Project scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectScope {
    Id(String),
    Name { name: String, domain: DomainRef },
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "***"
    }
}
