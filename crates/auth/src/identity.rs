use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Claims, Role};

/// Raw bearer credential as issued by the event API.
///
/// `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Credential(<{} bytes>)", self.0.len())
    }
}

/// Persisted form of a guest session: `{ "role": "guest", "name": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestDescriptor {
    role: Role,
    name: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuestDescriptorError {
    #[error("guest descriptor is not valid JSON: {0}")]
    Json(String),

    #[error("guest descriptor carries role '{0}', expected 'guest'")]
    WrongRole(String),

    #[error("guest descriptor has an empty name")]
    EmptyName,
}

impl GuestDescriptor {
    pub const DEFAULT_NAME: &'static str = "Guest User";

    /// A blank name falls back to [`Self::DEFAULT_NAME`], so every descriptor
    /// built here passes [`parse`](Self::parse) once stored.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            Self::DEFAULT_NAME.to_string()
        } else {
            name
        };

        Self {
            role: Role::GUEST,
            name,
        }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parse a stored descriptor, rejecting anything that is not a guest.
    pub fn parse(stored: &str) -> Result<Self, GuestDescriptorError> {
        let descriptor: Self =
            serde_json::from_str(stored).map_err(|e| GuestDescriptorError::Json(e.to_string()))?;

        if !descriptor.role.is_guest() {
            return Err(GuestDescriptorError::WrongRole(descriptor.role.to_string()));
        }
        if descriptor.name.trim().is_empty() {
            return Err(GuestDescriptorError::EmptyName);
        }
        Ok(descriptor)
    }

    pub fn to_json(&self) -> String {
        // A struct of two strings always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Default for GuestDescriptor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NAME)
    }
}

/// Who the current user is, as far as the UI is concerned.
///
/// Replaced wholesale on every change; never partially updated.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Identity {
    /// No stored credential and no guest marker.
    #[default]
    Anonymous,

    /// Locally fabricated identity, never backed by the server.
    Guest(GuestDescriptor),

    /// Identity decoded from a server-issued credential.
    Authenticated { credential: Credential, claims: Claims },
}

/// Fieldless discriminant of [`Identity`], handy for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityKind {
    Anonymous,
    Guest,
    Authenticated,
}

impl core::fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            IdentityKind::Anonymous => write!(f, "anonymous"),
            IdentityKind::Guest => write!(f, "guest"),
            IdentityKind::Authenticated => write!(f, "authenticated"),
        }
    }
}

impl Identity {
    pub fn kind(&self) -> IdentityKind {
        match self {
            Identity::Anonymous => IdentityKind::Anonymous,
            Identity::Guest(_) => IdentityKind::Guest,
            Identity::Authenticated { .. } => IdentityKind::Authenticated,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    /// Role of the identity; `None` when anonymous.
    pub fn role(&self) -> Option<&Role> {
        match self {
            Identity::Anonymous => None,
            Identity::Guest(guest) => Some(guest.role()),
            Identity::Authenticated { claims, .. } => Some(&claims.role),
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            Identity::Anonymous => None,
            Identity::Guest(guest) => Some(guest.name()),
            Identity::Authenticated { claims, .. } => Some(claims.label()),
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        match self {
            Identity::Authenticated { credential, .. } => Some(credential),
            _ => None,
        }
    }

    pub fn claims(&self) -> Option<&Claims> {
        match self {
            Identity::Authenticated { claims, .. } => Some(claims),
            _ => None,
        }
    }
}
