//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Use these types
//! for all sensitive values: passwords, password digests, refresh handles,
//! and signing-key material.
//!
//! `SecretBox<T>` and `SecretString` implement `Debug` with redaction, so any
//! struct that derives `Debug` while holding one of these cannot leak the
//! wrapped value through `{:?}` formatting or tracing fields. Secrets are
//! zeroized on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct LoginRequest {
//!     email: String,
//!     password: SecretString,
//! }
//!
//! let req = LoginRequest {
//!     email: "alice@example.org".to_string(),
//!     password: SecretString::from("hunter2"),
//! };
//!
//! // Debug output redacts the password.
//! let rendered = format!("{req:?}");
//! assert!(!rendered.contains("hunter2"));
//!
//! // Access requires an explicit expose_secret() call.
//! let password: &str = req.password.expose_secret();
//! # let _ = password;
//! ```
//!
//! # Beacon usage guidelines
//!
//! Use `SecretString` for user passwords, bcrypt digests, and refresh handles
//! in transit through the service layer. Use `SecretBox<Vec<u8>>` for binary
//! key material such as the credential signing key.

// Re-export the main types from secrecy
pub use secrecy::{ExposeSecret, SecretBox, SecretString};
