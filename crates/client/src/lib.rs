//! `eventhub-client`
//!
//! **Responsibility:** Client-side session shell for the event API.
//!
//! This crate provides:
//! - The identity store (restore, login, guest login, logout) with change notification
//! - Durable session storage (in-memory and file backed)
//! - The HTTP auth gateway
//! - The route table, guarded navigation and the navbar model
//!
//! The client is a **thin shell**: decoded claims only drive UI decisions and
//! the API remains the authority on every request.

pub mod config;
pub mod gateway;
pub mod navbar;
pub mod navigation;
pub mod storage;
pub mod store;
pub mod subscription;

#[cfg(test)]
mod testing;

pub use config::{ClientConfig, ConfigError};
pub use gateway::{AuthGateway, GatewayError, HttpAuthGateway, LoginResponse};
pub use navbar::{NavAction, NavItem, Navbar};
pub use navigation::{Navigation, Navigator, View};
pub use storage::{DurableStorage, FileStorage, MemoryStorage, StorageError};
pub use store::{AuthError, CorruptStoredStateError, IdentityStore};
pub use subscription::{ListenerRegistry, Subscription};
