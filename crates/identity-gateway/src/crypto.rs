//! Cryptographic helpers: password digests and refresh-handle entropy.
//!
//! Password hashing is consumed as a black box: `hash_password` /
//! `verify_password` wrap bcrypt and nothing else in the gateway inspects
//! digests.

use ring::rand::{SecureRandom, SystemRandom};
use tracing::error;

use crate::errors::IgError;

/// bcrypt cost factor for new digests.
pub const BCRYPT_COST: u32 = 12;

/// Entropy of a refresh handle in raw bytes (rendered as hex, so handles are
/// twice this many characters). Large enough that collision probability is
/// negligible and guessing is hopeless.
pub const REFRESH_HANDLE_BYTES: usize = 256;

/// A well-formed bcrypt digest matching no real password.
///
/// Verified against when an account lookup misses so that the login path
/// costs the same with and without a matching account (timing-attack
/// resistance).
pub const DUMMY_DIGEST: &str = "$2b$12$LQv3c1yqBWVHxkd0LHAkCOYz6TtxMQJqhN8/LewY5GyYqExt7YD3a";

/// Hash a password with bcrypt.
///
/// # Errors
///
/// Returns `IgError::Internal` if bcrypt fails (malformed input, OS RNG
/// failure).
pub fn hash_password(password: &str) -> Result<String, IgError> {
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| {
        error!(target: "ig.crypto", error = %e, "bcrypt hash failed");
        IgError::Internal
    })
}

/// Verify a password against a stored digest.
///
/// # Errors
///
/// Returns `IgError::Internal` if the digest is malformed.
pub fn verify_password(password: &str, digest: &str) -> Result<bool, IgError> {
    bcrypt::verify(password, digest).map_err(|e| {
        error!(target: "ig.crypto", error = %e, "bcrypt verify failed");
        IgError::Internal
    })
}

/// Generate an opaque refresh handle: [`REFRESH_HANDLE_BYTES`] bytes from the
/// system CSPRNG, hex-encoded.
///
/// # Errors
///
/// Returns `IgError::Internal` if the CSPRNG fails.
pub fn generate_refresh_handle() -> Result<String, IgError> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; REFRESH_HANDLE_BYTES];

    rng.fill(&mut bytes).map_err(|e| {
        error!(target: "ig.crypto", error = %e, "CSPRNG fill failed");
        IgError::Internal
    })?;

    Ok(hex::encode(bytes))
}
