//! `eventhub-auth`: pure identity and access-control primitives.
//!
//! This crate is intentionally decoupled from HTTP and storage. Decoded claims
//! are UI hints only: signatures are never verified here, and the event API
//! re-validates every bearer credential it receives.

pub mod claims;
pub mod guard;
pub mod identity;
pub mod roles;

pub use claims::{Claims, ClaimsValidationError, MalformedCredentialError, decode, validate_claims};
pub use guard::{GuardDecision, RedirectTarget, RoutePolicy, evaluate};
pub use identity::{Credential, GuestDescriptor, GuestDescriptorError, Identity, IdentityKind};
pub use roles::Role;
