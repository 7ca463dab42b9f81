//! Cookie construction and parsing for the two cookies the gateway owns.
//!
//! The access credential travels as an HTTP-only, Secure, SameSite=Lax
//! cookie; the session id the same way. Refresh handles deliberately do
//! NOT use cookies; they ride in response bodies and `Authorization`
//! headers so the two credentials never share a transport.

use std::time::Duration;

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

/// Cookie carrying the signed access credential.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Cookie carrying the server-side session id.
pub const SESSION_COOKIE: &str = "sid";

/// Render a Set-Cookie value with the gateway's hardening attributes.
#[must_use]
pub fn build_cookie(name: &str, value: &str, max_age: Duration) -> String {
    format!(
        "{name}={value}; Max-Age={}; Path=/; HttpOnly; Secure; SameSite=Lax",
        max_age.as_secs()
    )
}

/// Render a Set-Cookie value that clears `name`.
#[must_use]
pub fn clear_cookie(name: &str) -> String {
    format!("{name}=; Max-Age=0; Path=/; HttpOnly; Secure; SameSite=Lax")
}

/// Extract a cookie value from the request's `Cookie` header.
#[must_use]
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?.to_str().ok()?;

    header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}
