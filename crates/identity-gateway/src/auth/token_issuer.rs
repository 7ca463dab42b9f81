//! Access-credential issuance and verification.
//!
//! The gateway both issues and verifies its own credentials, so a single
//! HMAC key covers the whole lifecycle; there is no key distribution step.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Expiration and issued-at claims are validated with clock skew tolerance
//! - The credential must be presented from the agent context it was issued
//!   to, with the `auth` purpose tag; any mismatch is invalid
//! - Generic error messages prevent information leakage

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::instrument;

use common::jwt::{check_size, validate_iat, DEFAULT_CLOCK_SKEW};

use crate::auth::claims::{AccessClaims, AUDIENCE_ANY, PURPOSE_AUTH};
use crate::errors::IgError;

/// Access credentials live for one hour.
pub const ACCESS_TOKEN_TTL_SECONDS: i64 = 3600;

/// Client-facing message for every verification failure. One message for
/// all causes so callers cannot probe which check failed.
const GENERIC_INVALID: &str = "The access credential is invalid or expired";

/// Issues and verifies signed access credentials.
///
/// Purely computational: no shared mutable state, safe under unlimited
/// concurrency.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock_skew: Duration,
}

impl TokenIssuer {
    /// Create an issuer from the 32-byte signing key.
    #[must_use]
    pub fn new(signing_key: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(signing_key),
            decoding_key: DecodingKey::from_secret(signing_key),
            clock_skew: DEFAULT_CLOCK_SKEW,
        }
    }

    /// Issue a credential for `subject` bound to `agent_context`.
    ///
    /// # Errors
    ///
    /// Returns `IgError::Internal` if signing fails.
    pub fn issue(&self, subject: &str, agent_context: &str) -> Result<String, IgError> {
        self.issue_at(subject, agent_context, Utc::now().timestamp())
    }

    /// Deterministic issuance against an explicit `now` timestamp.
    ///
    /// Prefer [`TokenIssuer::issue`] in production code. This variant exists
    /// so that expiry behavior can be unit-tested without wall-clock
    /// dependence.
    pub fn issue_at(
        &self,
        subject: &str,
        agent_context: &str,
        now: i64,
    ) -> Result<String, IgError> {
        let claims = AccessClaims {
            sub: subject.to_string(),
            agent: agent_context.to_string(),
            aud: AUDIENCE_ANY.to_string(),
            purpose: PURPOSE_AUTH.to_string(),
            iat: now,
            exp: now + ACCESS_TOKEN_TTL_SECONDS,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(target: "ig.auth.token", error = %e, "Credential signing failed");
            IgError::Internal
        })
    }

    /// Verify a credential presented from `agent_context` and return its
    /// claims.
    ///
    /// # Security Checks
    ///
    /// 1. Size check - reject oversized tokens before parsing
    /// 2. Verify HMAC signature and exp claim
    /// 3. Validate iat claim with clock skew tolerance
    /// 4. Require the `auth` purpose tag
    /// 5. Require the presenting agent to match the bound agent
    ///
    /// # Errors
    ///
    /// Returns `IgError::AuthInvalid` for all validation failures with a
    /// generic message to prevent information leakage.
    #[instrument(skip_all)]
    pub fn verify(&self, token: &str, agent_context: &str) -> Result<AccessClaims, IgError> {
        check_size(token).map_err(|e| {
            tracing::debug!(target: "ig.auth.token", error = ?e, "Token size check failed");
            IgError::AuthInvalid(GENERIC_INVALID.to_string())
        })?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // The audience is a wildcard; agent binding below is the real check.
        validation.validate_aud = false;

        let token_data =
            decode::<AccessClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                tracing::debug!(target: "ig.auth.token", error = %e, "Credential verification failed");
                IgError::AuthInvalid(GENERIC_INVALID.to_string())
            })?;
        let claims = token_data.claims;

        if let Err(e) = validate_iat(claims.iat, self.clock_skew) {
            tracing::debug!(target: "ig.auth.token", error = ?e, "Credential iat validation failed");
            return Err(IgError::AuthInvalid(GENERIC_INVALID.to_string()));
        }

        if claims.purpose != PURPOSE_AUTH {
            tracing::debug!(
                target: "ig.auth.token",
                purpose = %claims.purpose,
                "Credential rejected: unexpected purpose tag"
            );
            return Err(IgError::AuthInvalid(GENERIC_INVALID.to_string()));
        }

        if claims.agent != agent_context {
            tracing::debug!(
                target: "ig.auth.token",
                "Credential rejected: agent context mismatch"
            );
            return Err(IgError::AuthInvalid(GENERIC_INVALID.to_string()));
        }

        tracing::debug!(target: "ig.auth.token", "Credential validated successfully");
        Ok(claims)
    }
}
