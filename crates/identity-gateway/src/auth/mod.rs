//! Access-credential and refresh-handle lifecycle.

pub mod claims;
pub mod refresh;
pub mod token_issuer;

pub use claims::AccessClaims;
pub use refresh::{RefreshRecord, RefreshRegistry};
pub use token_issuer::TokenIssuer;
