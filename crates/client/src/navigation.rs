//! Route table and guarded navigation.
//!
//! Every navigation re-reads the live identity and runs the route guard; no
//! decision is cached. The navigator also re-guards the current view whenever
//! the identity changes, so logging out while on a members-only view leaves it
//! immediately.

use std::sync::{Arc, Mutex, PoisonError};

use eventhub_auth::{GuardDecision, Identity, RedirectTarget, RoutePolicy, evaluate};

use crate::navbar::NavAction;
use crate::store::{AuthError, IdentityStore};
use crate::subscription::Subscription;

/// Views of the event client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum View {
    Home,
    Login,
    Register,
    Dashboard,
    CreateEvent,
    EditEvent { event_id: String },
}

impl View {
    /// Parse a path such as `/edit-event/42?tab=1`. Unknown paths yield `None`.
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Some(View::Home),
            ["login"] => Some(View::Login),
            ["register"] => Some(View::Register),
            ["dashboard"] => Some(View::Dashboard),
            ["create-event"] => Some(View::CreateEvent),
            ["edit-event", id] => Some(View::EditEvent {
                event_id: (*id).to_string(),
            }),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            View::Home => "/".to_string(),
            View::Login => "/login".to_string(),
            View::Register => "/register".to_string(),
            View::Dashboard => "/dashboard".to_string(),
            View::CreateEvent => "/create-event".to_string(),
            View::EditEvent { event_id } => format!("/edit-event/{event_id}"),
        }
    }

    pub fn policy(&self) -> RoutePolicy {
        match self {
            View::Home | View::Login | View::Register => RoutePolicy::PUBLIC,
            View::Dashboard => RoutePolicy::GUEST_ALLOWED,
            View::CreateEvent | View::EditEvent { .. } => RoutePolicy::MEMBERS_ONLY,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            View::Home => "Home",
            View::Login => "Login",
            View::Register => "Register",
            View::Dashboard => "Dashboard",
            View::CreateEvent => "Create Event",
            View::EditEvent { .. } => "Edit Event",
        }
    }
}

/// Catch-all: unknown paths land on the home view.
pub fn resolve(path: &str) -> View {
    View::from_path(path).unwrap_or(View::Home)
}

pub fn redirect_view(target: RedirectTarget) -> View {
    match target {
        RedirectTarget::LoginView => View::Login,
        RedirectTarget::DefaultAuthenticatedView => View::Dashboard,
    }
}

/// Outcome of one navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub requested: View,
    pub view: View,
    pub decision: GuardDecision,
}

impl Navigation {
    pub fn was_redirected(&self) -> bool {
        !self.decision.is_allowed()
    }
}

/// Guard `requested` against `identity`.
///
/// Redirect targets are always reachable by the identity that was redirected
/// (login is public; the dashboard admits any identity), so one hop suffices.
pub fn guard(requested: View, identity: &Identity) -> Navigation {
    let decision = evaluate(identity, requested.policy());
    let view = match decision {
        GuardDecision::Allow => requested.clone(),
        GuardDecision::RedirectTo(target) => redirect_view(target),
    };

    Navigation {
        requested,
        view,
        decision,
    }
}

/// Session-scoped navigator bound to one identity store.
pub struct Navigator {
    store: IdentityStore,
    current: Arc<Mutex<View>>,
    _identity_changes: Subscription,
}

impl core::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Navigator")
            .field("current", &self.current())
            .field("store", &self.store)
            .finish()
    }
}

impl Navigator {
    pub fn new(store: IdentityStore) -> Self {
        let current = Arc::new(Mutex::new(View::Home));

        let watched = Arc::clone(&current);
        let identity_changes = store.subscribe(move |identity| {
            let mut view = watched.lock().unwrap_or_else(PoisonError::into_inner);
            let navigation = guard(view.clone(), identity);
            if navigation.was_redirected() {
                tracing::debug!(
                    from = %navigation.requested.path(),
                    to = %navigation.view.path(),
                    "identity change redirected current view"
                );
                *view = navigation.view;
            }
        });

        Self {
            store,
            current,
            _identity_changes: identity_changes,
        }
    }

    pub fn store(&self) -> &IdentityStore {
        &self.store
    }

    pub fn current(&self) -> View {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn navigate(&self, path: &str) -> Navigation {
        self.go(resolve(path))
    }

    pub fn go(&self, requested: View) -> Navigation {
        let navigation = guard(requested, &self.store.current_identity());

        if navigation.was_redirected() {
            tracing::debug!(
                from = %navigation.requested.path(),
                to = %navigation.view.path(),
                "navigation redirected"
            );
        }

        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = navigation.view.clone();
        navigation
    }

    /// Log in and land on the dashboard. On failure the current view is kept.
    pub async fn submit_login(&self, email: &str, password: &str) -> Result<Navigation, AuthError> {
        self.store.login(email, password).await?;
        Ok(self.go(View::Dashboard))
    }

    pub fn continue_as_guest(&self) -> Navigation {
        self.store.guest_login();
        self.go(View::Dashboard)
    }

    pub fn logout(&self) -> Navigation {
        self.store.logout();
        self.go(View::Login)
    }

    /// Perform a navbar action.
    pub fn activate(&self, action: &NavAction) -> Navigation {
        match action {
            NavAction::Open(view) => self.go(view.clone()),
            NavAction::Logout => self.logout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventhub_auth::GuestDescriptor;
    use serde_json::json;

    use crate::gateway::GatewayError;
    use crate::storage::MemoryStorage;
    use crate::testing::{ScriptedGateway, mint};

    fn member_token() -> String {
        mint(json!({ "sub": "u-7", "role": "user", "name": "Ana" }))
    }

    fn navigator(gateway: Arc<ScriptedGateway>) -> Navigator {
        let store = IdentityStore::new(Arc::new(MemoryStorage::new()), gateway);
        store.restore();
        Navigator::new(store)
    }

    #[test]
    fn paths_resolve_to_views() {
        assert_eq!(resolve("/"), View::Home);
        assert_eq!(resolve(""), View::Home);
        assert_eq!(resolve("/login"), View::Login);
        assert_eq!(resolve("/dashboard/"), View::Dashboard);
        assert_eq!(resolve("/create-event?draft=1"), View::CreateEvent);
        assert_eq!(
            resolve("/edit-event/abc123#details"),
            View::EditEvent { event_id: "abc123".to_string() }
        );
        assert_eq!(View::from_path("/edit-event"), None);
        assert_eq!(View::from_path("/nope"), None);
        assert_eq!(resolve("/nope/at/all"), View::Home);
    }

    #[test]
    fn view_paths_round_trip() {
        for view in [
            View::Home,
            View::Login,
            View::Register,
            View::Dashboard,
            View::CreateEvent,
            View::EditEvent { event_id: "e-1".to_string() },
        ] {
            assert_eq!(View::from_path(&view.path()), Some(view));
        }
    }

    #[test]
    fn anonymous_visitor_is_sent_to_login() {
        let navigator = navigator(ScriptedGateway::offline());

        let navigation = navigator.navigate("/dashboard");
        assert!(navigation.was_redirected());
        assert_eq!(navigation.view, View::Login);
        assert_eq!(navigator.current(), View::Login);

        assert_eq!(navigator.navigate("/register").view, View::Register);
    }

    #[test]
    fn guest_reaches_dashboard_but_not_event_editor() {
        let navigator = navigator(ScriptedGateway::offline());

        let landed = navigator.continue_as_guest();
        assert_eq!(landed.view, View::Dashboard);

        let navigation = navigator.navigate("/create-event");
        assert_eq!(
            navigation.decision,
            GuardDecision::RedirectTo(RedirectTarget::DefaultAuthenticatedView)
        );
        assert_eq!(navigation.view, View::Dashboard);
        assert_eq!(navigator.navigate("/edit-event/9").view, View::Dashboard);
    }

    #[tokio::test]
    async fn member_reaches_every_view() {
        let navigator = navigator(ScriptedGateway::token(&member_token()));

        let landed = navigator.submit_login("ana@example.com", "s3cret").await.unwrap();
        assert_eq!(landed.view, View::Dashboard);

        for path in ["/create-event", "/edit-event/9", "/dashboard", "/"] {
            let navigation = navigator.navigate(path);
            assert!(!navigation.was_redirected(), "{path} redirected");
        }
    }

    #[tokio::test]
    async fn failed_login_keeps_the_login_view() {
        let navigator = navigator(ScriptedGateway::outcome(Err(GatewayError::Rejected {
            status: 401,
            message: Some("Invalid credentials".to_string()),
        })));
        navigator.navigate("/login");

        let err = navigator.submit_login("a@b.com", "bad").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(navigator.current(), View::Login);
        assert!(navigator.store().current_identity().is_anonymous());
    }

    #[tokio::test]
    async fn logout_takes_effect_on_the_very_next_navigation() {
        let navigator = navigator(ScriptedGateway::token(&member_token()));
        navigator.submit_login("ana@example.com", "s3cret").await.unwrap();
        assert_eq!(navigator.navigate("/create-event").view, View::CreateEvent);

        let navigation = navigator.logout();
        assert_eq!(navigation.view, View::Login);

        assert_eq!(navigator.navigate("/create-event").view, View::Login);
    }

    #[tokio::test]
    async fn identity_change_re_guards_the_current_view() {
        let navigator = navigator(ScriptedGateway::token(&member_token()));
        navigator.submit_login("ana@example.com", "s3cret").await.unwrap();
        navigator.navigate("/create-event");

        // Switching to a guest session bounces off the members-only view.
        navigator.store().guest_login();
        assert_eq!(navigator.current(), View::Dashboard);

        navigator.store().logout();
        assert_eq!(navigator.current(), View::Login);
    }

    #[test]
    fn navbar_actions_drive_navigation() {
        let navigator = navigator(ScriptedGateway::offline());
        navigator.continue_as_guest();

        let navbar = crate::navbar::Navbar::for_identity(&navigator.store().current_identity());
        let create = &navbar.items[1].action;
        assert_eq!(navigator.activate(create).view, View::Dashboard);

        let logout = &navbar.items[2].action;
        assert_eq!(navigator.activate(logout).view, View::Login);
        assert!(navigator.store().current_identity().is_anonymous());
    }

    #[test]
    fn guard_is_pure_over_identity_and_view() {
        let guest = Identity::Guest(GuestDescriptor::default());

        assert_eq!(guard(View::Home, &Identity::Anonymous).view, View::Home);
        assert_eq!(guard(View::Dashboard, &guest).view, View::Dashboard);
        assert_eq!(guard(View::CreateEvent, &guest).view, View::Dashboard);
        assert_eq!(guard(View::CreateEvent, &Identity::Anonymous).view, View::Login);
    }
}
