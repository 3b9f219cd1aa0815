//! Route access policy and the guard decision.
//!
//! The guard is a UI gate, not an enforcement point: every protected API call
//! is re-validated by the server.

use crate::Identity;

/// Access policy declared by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoutePolicy {
    pub requires_identity: bool,
    pub allow_guest_role: bool,
}

impl RoutePolicy {
    /// Reachable by everyone, including anonymous visitors.
    pub const PUBLIC: RoutePolicy = RoutePolicy {
        requires_identity: false,
        allow_guest_role: true,
    };

    /// Requires an identity; guests are welcome.
    pub const GUEST_ALLOWED: RoutePolicy = RoutePolicy {
        requires_identity: true,
        allow_guest_role: true,
    };

    /// Requires an identity whose role is not guest.
    pub const MEMBERS_ONLY: RoutePolicy = RoutePolicy {
        requires_identity: true,
        allow_guest_role: false,
    };
}

/// Where a denied navigation is sent instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectTarget {
    /// The login view.
    LoginView,
    /// The landing view for signed-in users.
    DefaultAuthenticatedView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardDecision {
    Allow,
    RedirectTo(RedirectTarget),
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

/// Decide whether `identity` may enter a view declaring `policy`.
///
/// - No IO
/// - No state (callers re-evaluate on every navigation)
/// - Role based: any identity whose role is guest is treated as a guest
pub fn evaluate(identity: &Identity, policy: RoutePolicy) -> GuardDecision {
    if !policy.requires_identity {
        return GuardDecision::Allow;
    }

    let Some(role) = identity.role() else {
        return GuardDecision::RedirectTo(RedirectTarget::LoginView);
    };

    if role.is_guest() && !policy.allow_guest_role {
        return GuardDecision::RedirectTo(RedirectTarget::DefaultAuthenticatedView);
    }

    GuardDecision::Allow
}
