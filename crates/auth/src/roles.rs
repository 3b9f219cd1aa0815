use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier carried by an identity.
///
/// Roles are opaque strings issued by the event API. The only role this
/// layer interprets is [`Role::GUEST`], which marks locally fabricated
/// identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Role marker of a guest session.
    pub const GUEST: Role = Role(Cow::Borrowed("guest"));

    /// Role assumed for credentials that carry no `role` claim.
    pub const USER: Role = Role(Cow::Borrowed("user"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_guest(&self) -> bool {
        self.as_str() == Self::GUEST.as_str()
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::USER
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guest_marker_is_recognised_regardless_of_construction() {
        assert!(Role::GUEST.is_guest());
        assert!(Role::new("guest").is_guest());
        assert!(Role::new(String::from("guest")).is_guest());
        assert!(!Role::USER.is_guest());
        assert!(!Role::new("Guest").is_guest());
    }

    #[test]
    fn role_serializes_as_plain_string() {
        let json = serde_json::to_string(&Role::new("admin")).unwrap();
        assert_eq!(json, "\"admin\"");

        let role: Role = serde_json::from_str("\"organizer\"").unwrap();
        assert_eq!(role.as_str(), "organizer");
    }
}
