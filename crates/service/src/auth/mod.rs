//! Auth: platform session types, the auth service, session context and
//! route guards.

pub mod domain;
pub mod guard;
pub mod service;
pub mod session;

pub use guard::{guard, Access, GuardOutcome, RedirectTo};
pub use service::AuthService;
pub use session::{SessionContext, SessionState, Subscription};
