//! Access-credential claims.
//!
//! Contains the claims carried by signed access credentials. The `sub` field
//! is redacted in Debug output to prevent exposure in logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed purpose tag for authentication credentials. A credential carrying
/// any other purpose is invalid for request authorization, not merely
/// different.
pub const PURPOSE_AUTH: &str = "auth";

/// Wildcard audience: credentials are honored by every service behind the
/// gateway.
pub const AUDIENCE_ANY: &str = "*";

/// Claims carried by an access credential.
///
/// The credential is bound to the presenting client's declared agent string;
/// verification rejects a credential presented from a different agent
/// context even when the signature is valid. This mitigates token replay
/// across client contexts at the cost of breaking legitimate agent-string
/// changes (a documented limitation).
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user id) - redacted in Debug output.
    pub sub: String,

    /// Declared agent string of the client the credential was issued to.
    pub agent: String,

    /// Audience; always [`AUDIENCE_ANY`].
    pub aud: String,

    /// Purpose tag; always [`PURPOSE_AUTH`] for credentials this service
    /// issues.
    pub purpose: String,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,
}

/// Custom Debug implementation that redacts the `sub` field.
impl fmt::Debug for AccessClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessClaims")
            .field("sub", &"[REDACTED]")
            .field("agent", &self.agent)
            .field("aud", &self.aud)
            .field("purpose", &self.purpose)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish()
    }
}
