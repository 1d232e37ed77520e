//! Route guards.

use serde::Serialize;

use super::session::SessionState;

/// Who may open a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectTo {
    Login,
    Home,
}

impl RedirectTo {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Home => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    Allow,
    /// Auth state not settled yet; show a loading indicator.
    Loading,
    Redirect(RedirectTo),
}

pub fn guard(access: Access, state: &SessionState) -> GuardOutcome {
    if access == Access::Public {
        return GuardOutcome::Allow;
    }
    if state.loading {
        return GuardOutcome::Loading;
    }
    if !state.is_authenticated() {
        return GuardOutcome::Redirect(RedirectTo::Login);
    }
    if access == Access::Admin && !state.is_admin() {
        return GuardOutcome::Redirect(RedirectTo::Home);
    }
    GuardOutcome::Allow
}
