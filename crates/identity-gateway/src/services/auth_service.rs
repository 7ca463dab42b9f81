//! Registration, login, refresh, and logout orchestration.
//!
//! Handlers peel the HTTP layer off and call in here with plain values; this
//! module decides, in one place, how the token issuer, refresh registry,
//! session manager, and user directory compose.

use tracing::{info, instrument, warn};

use crate::auth::{RefreshRegistry, TokenIssuer};
use crate::crypto;
use crate::errors::IgError;
use crate::repositories::users::{NewUser, UserDirectory, UserRecord};
use crate::session::{SessionManager, SESSION_TTL};

/// Everything a successful registration or login produces.
pub struct IssuedSession {
    pub user: UserRecord,
    pub session_id: String,
    pub access_token: String,
    pub refresh_handle: String,
}

/// Register a new account and establish its first session.
///
/// # Errors
///
/// - `IgError::BadRequest` for malformed input
/// - `IgError::Conflict` when the email is already registered
/// - `IgError::Store` / `IgError::Internal` on infrastructure failure
#[expect(clippy::too_many_arguments)] // the four components plus the four request fields
#[instrument(skip_all)]
pub async fn register(
    users: &dyn UserDirectory,
    issuer: &TokenIssuer,
    registry: &RefreshRegistry,
    sessions: &SessionManager,
    email: &str,
    display_name: &str,
    password: &str,
    agent: &str,
) -> Result<IssuedSession, IgError> {
    validate_registration(email, display_name, password)?;

    let digest = crypto::hash_password(password)?;

    let user = users
        .create(NewUser {
            email: email.to_string(),
            display_name: display_name.to_string(),
            password_digest: digest,
        })
        .await?;

    info!(target: "ig.services.auth", "Registered new account");
    issue_for_user(issuer, registry, sessions, user, agent).await
}

/// Authenticate an account and establish a session.
///
/// # Errors
///
/// - `IgError::NotFound` when no account matches the email
/// - `IgError::AuthInvalid` when the password does not verify
/// - `IgError::Store` / `IgError::Internal` on infrastructure failure
#[instrument(skip_all)]
pub async fn login(
    users: &dyn UserDirectory,
    issuer: &TokenIssuer,
    registry: &RefreshRegistry,
    sessions: &SessionManager,
    email: &str,
    password: &str,
    agent: &str,
) -> Result<IssuedSession, IgError> {
    let user = match users.find_by_email(email).await? {
        Some(user) => user,
        None => {
            // Burn a bcrypt verification anyway so a miss costs the same as
            // a hit (timing-attack resistance).
            let _ = crypto::verify_password(password, crypto::DUMMY_DIGEST)?;
            return Err(IgError::NotFound(
                "No account matches this email".to_string(),
            ));
        }
    };

    if !crypto::verify_password(password, &user.password_digest)? {
        warn!(target: "ig.services.auth", "Login failed: password mismatch");
        return Err(IgError::AuthInvalid("Invalid email or password".to_string()));
    }

    info!(target: "ig.services.auth", "Login succeeded");
    issue_for_user(issuer, registry, sessions, user, agent).await
}

/// Exchange a refresh handle for a fresh access credential bound to the
/// *current* agent string, sliding the session's expiry forward.
///
/// The handle is not rotated; it stays valid until revoked or expired.
///
/// # Errors
///
/// - `IgError::AuthInvalid` when the handle is unknown or expired
/// - `IgError::Store` / `IgError::Internal` on infrastructure failure
#[instrument(skip_all)]
pub async fn refresh(
    issuer: &TokenIssuer,
    registry: &RefreshRegistry,
    sessions: &SessionManager,
    handle: &str,
    agent: &str,
    session_id: Option<&str>,
) -> Result<String, IgError> {
    let record = registry
        .resolve(handle)
        .await?
        .ok_or_else(|| IgError::AuthInvalid("Unknown or expired refresh handle".to_string()))?;

    let access_token = issuer.issue(&record.user_id, agent)?;

    // Sliding session expiry. The credential above is already minted; a
    // failed extend degrades session lifetime, it does not fail the refresh.
    if let Some(sid) = session_id {
        match sessions.extend(sid, SESSION_TTL).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(target: "ig.services.auth", "Refresh for an already-expired session");
            }
            Err(e) => {
                warn!(target: "ig.services.auth", error = %e, "Failed to extend session on refresh");
            }
        }
    }

    info!(target: "ig.services.auth", "Issued refreshed credential");
    Ok(access_token)
}

/// Revoke the presented handle and destroy the session.
///
/// Best-effort by contract: session destruction and cookie clearing must
/// proceed even if handle deletion fails, so every failure here is logged
/// and swallowed.
#[instrument(skip_all)]
pub async fn logout(
    registry: &RefreshRegistry,
    sessions: &SessionManager,
    handle: Option<&str>,
    session_id: Option<&str>,
) {
    if let Some(handle) = handle {
        if let Err(e) = registry.revoke(handle).await {
            warn!(target: "ig.services.auth", error = %e, "Failed to revoke refresh handle on logout");
        }
    }

    if let Some(sid) = session_id {
        match sessions.destroy(sid).await {
            Ok(_) => {}
            Err(e) => {
                warn!(target: "ig.services.auth", error = %e, "Failed to destroy session on logout");
            }
        }
    }

    info!(target: "ig.services.auth", "Logout complete");
}

async fn issue_for_user(
    issuer: &TokenIssuer,
    registry: &RefreshRegistry,
    sessions: &SessionManager,
    user: UserRecord,
    agent: &str,
) -> Result<IssuedSession, IgError> {
    let access_token = issuer.issue(&user.user_id, agent)?;
    let refresh_handle = registry.issue_handle(&user.user_id, &access_token).await?;
    let session_id = sessions.create(&user.user_id).await?;

    Ok(IssuedSession {
        user,
        session_id,
        access_token,
        refresh_handle,
    })
}

fn validate_registration(email: &str, display_name: &str, password: &str) -> Result<(), IgError> {
    if email.is_empty() || !email.contains('@') {
        return Err(IgError::BadRequest("A valid email is required".to_string()));
    }
    if display_name.trim().is_empty() {
        return Err(IgError::BadRequest("A display name is required".to_string()));
    }
    if password.len() < 8 {
        return Err(IgError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}
