//! Per-user session context: current session, profile and a loading flag,
//! with change listeners.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use arc_swap::ArcSwap;
use models::Profile;
use tracing::{debug, instrument};

use super::domain::{AuthEvent, Session};
use crate::errors::ServiceError;
use crate::services::ProfileService;

/// Snapshot of the auth state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    /// True while the profile for `session` is still being fetched.
    pub loading: bool,
}

impl SessionState {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(&self) -> Option<&super::domain::AuthUser> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.profile.as_ref().is_some_and(|p| p.is_admin)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.access_token.as_str())
    }
}

type Listener = Arc<dyn Fn(&SessionState) + Send + Sync>;

struct Shared {
    state: ArcSwap<SessionState>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

impl Shared {
    fn listeners(&self) -> MutexGuard<'_, Vec<(u64, Listener)>> {
        self.listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Cloneable handle; clones observe the same state.
#[derive(Clone)]
pub struct SessionContext {
    shared: Arc<Shared>,
}

/// Keeps a listener registered. Dropping it unsubscribes.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.listeners().retain(|(id, _)| *id != self.id);
        }
    }
}

impl SessionContext {
    /// A context restored from `session`; with a session the profile is
    /// pending until [`SessionContext::set_profile`] or a refresh.
    pub fn new(session: Option<Session>) -> Self {
        let loading = session.is_some();
        let state = SessionState { session, profile: None, loading };
        Self {
            shared: Arc::new(Shared {
                state: ArcSwap::from_pointee(state),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn state(&self) -> Arc<SessionState> {
        self.shared.state.load_full()
    }

    pub fn get_session(&self) -> Option<Session> {
        self.state().session.clone()
    }

    pub fn is_admin(&self) -> bool {
        self.state().is_admin()
    }

    /// Register `listener`; it runs after every state change until the
    /// returned guard is dropped. For long-lived contexts held by an
    /// embedding client; the HTTP shell resolves a fresh context per request
    /// and does not subscribe.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.shared.listeners().push((id, Arc::new(listener)));
        Subscription { id, shared: Arc::downgrade(&self.shared) }
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners().len()
    }

    /// Fold an auth event into the state. Sign-out clears everything; any
    /// other event replaces the session and marks the profile as loading.
    /// The previous profile is kept only when the user did not change.
    pub fn apply(&self, event: &AuthEvent) {
        debug!(event = event.name(), "auth_event");
        self.update(|current| match event.session() {
            None => SessionState::anonymous(),
            Some(session) => {
                let same_user = current.user().is_some_and(|u| u.id == session.user.id);
                SessionState {
                    session: Some(session.clone()),
                    profile: if same_user { current.profile.clone() } else { None },
                    loading: true,
                }
            }
        });
    }

    pub fn sign_in(&self, session: Session) {
        self.apply(&AuthEvent::SignedIn(session))
    }

    pub fn sign_out(&self) {
        self.apply(&AuthEvent::SignedOut)
    }

    /// Finish loading with `profile`.
    pub fn set_profile(&self, profile: Option<Profile>) {
        self.update(|current| SessionState {
            session: current.session.clone(),
            profile: profile.clone(),
            loading: false,
        });
    }

    /// Reload the profile for the current user. Anonymous contexts just stop
    /// loading. On failure the profile is cleared and the error returned.
    #[instrument(skip_all)]
    pub async fn refresh_profile(&self, profiles: &ProfileService) -> Result<(), ServiceError> {
        let Some(session) = self.get_session() else {
            self.set_profile(None);
            return Ok(());
        };
        match profiles.get_profile(&session.user).await {
            Ok(profile) => {
                self.set_profile(Some(profile));
                Ok(())
            }
            Err(err) => {
                self.set_profile(None);
                Err(err)
            }
        }
    }

    /// Derive the next state from the latest one; retried if another clone
    /// swapped in between.
    fn update(&self, next: impl Fn(&SessionState) -> SessionState) {
        self.shared.state.rcu(|current| next(current.as_ref()));
        let snapshot = self.state();
        let listeners: Vec<Listener> = self.shared.listeners().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(None)
    }
}
