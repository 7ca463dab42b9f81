//! Request middleware: rate limiting, credential verification, session
//! resolution.
//!
//! Each middleware produces an explicit, typed context struct and inserts it
//! into request extensions for downstream handlers; request data is never
//! extended dynamically.

pub mod auth;
pub mod rate_limit;
pub mod session_guard;

pub use auth::{require_auth, RequestIdentity};
pub use rate_limit::enforce_rate_limit;
pub use session_guard::{require_session, SessionContext};
