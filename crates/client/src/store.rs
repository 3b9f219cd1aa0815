//! Identity store: the single authoritative current [`Identity`].
//!
//! One store is built by the shell at startup and handed (cloned) to whoever
//! needs it. It owns both the live identity and its durable record; every
//! other component reads through [`IdentityStore::current_identity`] or a
//! subscription.
//!
//! Ordering rules:
//! - storage is written before listeners are notified
//! - operations are last-write-wins against each other
//! - at most one `login` is in flight at a time
//! - a transition (storage writes, commit, notification) runs under one
//!   commit lock, so listeners observe commits in the order they landed
//! - listeners run synchronously, outside the identity lock, and must not call
//!   the store's mutating operations

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use thiserror::Error;

use eventhub_auth::{
    ClaimsValidationError, Credential, GuestDescriptor, GuestDescriptorError, Identity,
    MalformedCredentialError, decode, validate_claims,
};

use crate::gateway::{AuthGateway, GatewayError};
use crate::storage::{CREDENTIAL_KEY, DurableStorage, GUEST_KEY, StorageError};
use crate::subscription::{ListenerRegistry, Subscription};

/// Message shown when the API gives no reason for a failed login.
pub const GENERIC_LOGIN_FAILURE: &str = "Login failed.";

/// Errors surfaced by [`IdentityStore::login`]. The store is unchanged
/// whenever one is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The API refused the credentials; `message` is the server's text or
    /// [`GENERIC_LOGIN_FAILURE`].
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Login failed.")]
    Unreachable { detail: String },

    #[error("No token received from the server")]
    NoCredentialReturned,

    #[error("server issued a malformed credential: {0}")]
    MalformedCredential(#[from] MalformedCredentialError),

    #[error("a login is already in progress")]
    LoginInProgress,
}

impl From<GatewayError> for AuthError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected { status, message } => AuthError::Rejected {
                status,
                message: message.unwrap_or_else(|| GENERIC_LOGIN_FAILURE.to_string()),
            },
            GatewayError::Network(detail) | GatewayError::Setup(detail) => {
                AuthError::Unreachable { detail }
            }
        }
    }
}

/// Why a stored record was ignored during [`IdentityStore::restore`].
///
/// Recovered locally; only ever logged.
#[derive(Debug, Error)]
pub enum CorruptStoredStateError {
    #[error("stored credential is malformed: {0}")]
    MalformedCredential(#[from] MalformedCredentialError),

    #[error("stored credential is no longer valid: {0}")]
    ExpiredCredential(#[from] ClaimsValidationError),

    #[error("stored guest descriptor is invalid: {0}")]
    InvalidGuest(#[from] GuestDescriptorError),

    #[error("durable storage could not be read: {0}")]
    Unreadable(#[from] StorageError),
}

impl CorruptStoredStateError {
    /// Unreadable storage is left alone; bad records are removed.
    fn should_clear(&self) -> bool {
        !matches!(self, CorruptStoredStateError::Unreadable(_))
    }
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

struct Inner {
    storage: Arc<dyn DurableStorage>,
    gateway: Arc<dyn AuthGateway>,
    current: RwLock<Identity>,
    commit_lock: Mutex<()>,
    listeners: Arc<ListenerRegistry<Identity>>,
    login_in_flight: AtomicBool,
    clock: Clock,
}

/// Cheap-to-clone handle to the process-wide identity store.
#[derive(Clone)]
pub struct IdentityStore {
    inner: Arc<Inner>,
}

impl core::fmt::Debug for IdentityStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdentityStore")
            .field("identity", &self.current_identity().kind())
            .field("login_in_flight", &self.is_login_in_flight())
            .finish()
    }
}

impl IdentityStore {
    /// Build a store in the `Anonymous` state. Call [`restore`](Self::restore)
    /// once before handing it out.
    pub fn new(storage: Arc<dyn DurableStorage>, gateway: Arc<dyn AuthGateway>) -> Self {
        Self::with_clock(storage, gateway, Arc::new(Utc::now))
    }

    /// Like [`new`](Self::new), with the clock used for expiry checks.
    pub fn with_clock(
        storage: Arc<dyn DurableStorage>,
        gateway: Arc<dyn AuthGateway>,
        clock: Clock,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                storage,
                gateway,
                current: RwLock::new(Identity::Anonymous),
                commit_lock: Mutex::new(()),
                listeners: ListenerRegistry::new(),
                login_in_flight: AtomicBool::new(false),
                clock,
            }),
        }
    }

    pub fn current_identity(&self) -> Identity {
        self.inner
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register a listener invoked with every newly committed identity.
    ///
    /// The listener may read [`current_identity`](Self::current_identity) but
    /// must not log in, log out or start a guest session.
    pub fn subscribe(&self, listener: impl Fn(&Identity) + Send + Sync + 'static) -> Subscription {
        self.inner.listeners.subscribe(listener)
    }

    pub fn is_login_in_flight(&self) -> bool {
        self.inner.login_in_flight.load(Ordering::Acquire)
    }

    /// Rebuild the identity from durable storage. Never fails.
    ///
    /// Credential first; a corrupt or expired credential is removed and the
    /// guest descriptor is consulted instead.
    pub fn restore(&self) -> Identity {
        let _serial = self.serialize();

        let identity = match self.restore_credential() {
            Ok(Some(identity)) => identity,
            Ok(None) => self.restore_guest(),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring stored credential");
                if err.should_clear() {
                    self.clear(CREDENTIAL_KEY);
                }
                self.restore_guest()
            }
        };

        self.commit(identity.clone());
        identity
    }

    fn restore_credential(&self) -> Result<Option<Identity>, CorruptStoredStateError> {
        let Some(raw) = self.inner.storage.get(CREDENTIAL_KEY)? else {
            return Ok(None);
        };

        let claims = decode(&raw)?;
        validate_claims(&claims, (self.inner.clock)())?;

        Ok(Some(Identity::Authenticated {
            credential: Credential::new(raw),
            claims,
        }))
    }

    fn restore_guest(&self) -> Identity {
        let loaded: Result<Option<GuestDescriptor>, CorruptStoredStateError> = self
            .inner
            .storage
            .get(GUEST_KEY)
            .map_err(CorruptStoredStateError::from)
            .and_then(|stored| {
                stored
                    .map(|s| GuestDescriptor::parse(&s).map_err(CorruptStoredStateError::from))
                    .transpose()
            });

        match loaded {
            Ok(Some(guest)) => Identity::Guest(guest),
            Ok(None) => Identity::Anonymous,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring stored guest descriptor");
                if err.should_clear() {
                    self.clear(GUEST_KEY);
                }
                Identity::Anonymous
            }
        }
    }

    /// Exchange email + password for a credential and commit `Authenticated`.
    ///
    /// A second call while one is pending fails with
    /// [`AuthError::LoginInProgress`]. Dropping the returned future before it
    /// completes commits nothing.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let _in_flight =
            InFlight::acquire(&self.inner.login_in_flight).ok_or(AuthError::LoginInProgress)?;

        let response = self.inner.gateway.login(email, password).await.map_err(|err| {
            tracing::info!(error = %err, "login failed");
            AuthError::from(err)
        })?;

        let raw = response
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or(AuthError::NoCredentialReturned)?;

        let claims = decode(&raw).inspect_err(|err| {
            tracing::error!(error = %err, "server issued an undecodable credential");
        })?;

        let _serial = self.serialize();
        self.persist(CREDENTIAL_KEY, &raw);
        self.clear(GUEST_KEY);

        let identity = Identity::Authenticated {
            credential: Credential::new(raw),
            claims,
        };
        self.commit(identity.clone());
        Ok(identity)
    }

    /// Start a guest session under the default guest name.
    pub fn guest_login(&self) -> Identity {
        self.guest_login_as(GuestDescriptor::DEFAULT_NAME)
    }

    /// Start a guest session. No network involved.
    pub fn guest_login_as(&self, name: &str) -> Identity {
        let guest = GuestDescriptor::new(name);

        let _serial = self.serialize();
        self.persist(GUEST_KEY, &guest.to_json());
        self.clear(CREDENTIAL_KEY);

        let identity = Identity::Guest(guest);
        self.commit(identity.clone());
        identity
    }

    /// Clear both stored records and commit `Anonymous`. Idempotent, never fails.
    pub fn logout(&self) {
        let _serial = self.serialize();
        self.clear(CREDENTIAL_KEY);
        self.clear(GUEST_KEY);
        self.commit(Identity::Anonymous);
    }

    fn serialize(&self) -> MutexGuard<'_, ()> {
        self.inner
            .commit_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // Storage writes are best-effort: a failed write leaves the session valid
    // until the next restart.
    fn persist(&self, key: &str, value: &str) {
        if let Err(err) = self.inner.storage.set(key, value) {
            tracing::error!(key, error = %err, "failed to persist identity record");
        }
    }

    fn clear(&self, key: &str) {
        if let Err(err) = self.inner.storage.remove(key) {
            tracing::warn!(key, error = %err, "failed to clear identity record");
        }
    }

    fn commit(&self, identity: Identity) {
        {
            let mut current = self
                .inner
                .current
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *current = identity.clone();
        }

        tracing::info!(identity = %identity.kind(), "identity committed");
        self.inner.listeners.notify(&identity);
    }
}

/// Holds the in-flight flag for the duration of one login.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
