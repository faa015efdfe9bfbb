//! # Auth Context
//!
//! Opaque authentication context carried by the envelope. This layer never
//! mints or verifies credentials; it only checks expiry and answers
//! allow-list questions against the carried capabilities.
//!
//! ## Capability Model
//!
//! Capabilities are a pure allow-list: there are no deny rules. A capability
//! grants `actions` on a `resource_type`, optionally narrowed to a single
//! `resource_id` and optionally bounded by its own expiry.

use crate::hlc::UnixMillis;
use serde::{Deserialize, Serialize};

/// Who the message is acting on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Principal {
    User { id: String },
    Service { name: String },
    Machine { id: String },
    Anonymous,
    System,
}

impl Principal {
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }
}

/// How the principal authenticated upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthMethod {
    #[default]
    None,
    ApiKey,
    BearerToken,
    MutualTls,
    Session,
    Internal,
}

/// Resource categories a capability can reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Channel,
    Topic,
    Queue,
    Message,
    Config,
    AuditLog,
    Custom(String),
}

/// Operations a capability can allow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Read,
    Write,
    Delete,
    Publish,
    Subscribe,
    Execute,
    Admin,
    Custom(String),
}

/// A single allow-list grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub resource_type: ResourceType,
    pub actions: Vec<Action>,
    /// `None` covers every resource of `resource_type`.
    pub resource_id: Option<String>,
    /// `None` never expires.
    pub expires_at: Option<UnixMillis>,
}

impl Capability {
    /// A capability over every resource of a type, without expiry.
    #[must_use]
    pub fn new(resource_type: ResourceType, actions: Vec<Action>) -> Self {
        Self {
            resource_type,
            actions,
            resource_id: None,
            expires_at: None,
        }
    }

    #[must_use]
    pub fn for_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    #[must_use]
    pub fn expiring_at(mut self, expires_at: UnixMillis) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Returns true if the capability has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: UnixMillis) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Returns true if this grant covers the requested access.
    #[must_use]
    pub fn allows(
        &self,
        resource_type: &ResourceType,
        action: &Action,
        resource_id: Option<&str>,
        now: UnixMillis,
    ) -> bool {
        if self.is_expired(now) || &self.resource_type != resource_type {
            return false;
        }
        if !self.actions.contains(action) {
            return false;
        }
        match (&self.resource_id, resource_id) {
            (None, _) => true,
            (Some(granted), Some(requested)) => granted == requested,
            // A narrowed grant never covers "all resources".
            (Some(_), None) => false,
        }
    }
}

/// A free-form claim asserted about the principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    pub name: String,
    pub value: String,
}

impl Claim {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Authentication context attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub principal: Principal,
    pub auth_method: AuthMethod,
    pub authenticated_at: UnixMillis,
    /// A message is rejected once `expires_at <= now`.
    pub expires_at: UnixMillis,
    pub capabilities: Vec<Capability>,
    pub tenant_id: Option<String>,
    pub claims: Vec<Claim>,
}

impl AuthContext {
    /// Creates a context with no capabilities, claims or tenant.
    #[must_use]
    pub fn new(
        principal: Principal,
        auth_method: AuthMethod,
        authenticated_at: UnixMillis,
        expires_at: UnixMillis,
    ) -> Self {
        Self {
            principal,
            auth_method,
            authenticated_at,
            expires_at,
            capabilities: Vec::new(),
            tenant_id: None,
            claims: Vec::new(),
        }
    }

    /// Context for internally generated traffic.
    #[must_use]
    pub fn system(authenticated_at: UnixMillis, expires_at: UnixMillis) -> Self {
        Self::new(Principal::System, AuthMethod::Internal, authenticated_at, expires_at)
    }

    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    #[must_use]
    pub fn with_claim(mut self, claim: Claim) -> Self {
        self.claims.push(claim);
        self
    }

    #[must_use]
    pub fn is_expired(&self, now: UnixMillis) -> bool {
        self.expires_at <= now
    }

    /// Allow-list check across every carried capability.
    ///
    /// An expired context permits nothing.
    #[must_use]
    pub fn permits(
        &self,
        resource_type: &ResourceType,
        action: &Action,
        resource_id: Option<&str>,
        now: UnixMillis,
    ) -> bool {
        !self.is_expired(now)
            && self
                .capabilities
                .iter()
                .any(|cap| cap.allows(resource_type, action, resource_id, now))
    }

    /// Looks up the first claim with the given name.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }
}
