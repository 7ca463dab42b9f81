//! Persistence boundaries consumed by the gateway.

pub mod users;
