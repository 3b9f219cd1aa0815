//! Navigation bar model: which links and actions the shell shows for an identity.

use eventhub_auth::Identity;

use crate::navigation::View;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavAction {
    Open(View),
    /// Log out, then open the login view.
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub action: NavAction,
}

impl NavItem {
    fn open(label: &'static str, view: View) -> Self {
        Self {
            label,
            action: NavAction::Open(view),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navbar {
    pub brand: NavItem,
    pub items: Vec<NavItem>,
    /// Name of the signed-in identity, if any.
    pub signed_in_as: Option<String>,
}

impl Navbar {
    pub const BRAND: &'static str = "Event Management";

    /// Anonymous visitors get Login/Register; any identity (guests included)
    /// gets Dashboard, Create Event and Logout. Create Event stays visible to
    /// guests; the route guard bounces them.
    pub fn for_identity(identity: &Identity) -> Self {
        let items = if identity.is_anonymous() {
            vec![
                NavItem::open("Login", View::Login),
                NavItem::open("Register", View::Register),
            ]
        } else {
            vec![
                NavItem::open("Dashboard", View::Dashboard),
                NavItem::open("Create Event", View::CreateEvent),
                NavItem {
                    label: "Logout",
                    action: NavAction::Logout,
                },
            ]
        };

        Self {
            brand: NavItem::open(Self::BRAND, View::Home),
            items,
            signed_in_as: identity.display_name().map(str::to_string),
        }
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.items.iter().map(|item| item.label).collect()
    }
}
