//! Business logic layer between HTTP handlers and the core components.

pub mod auth_service;
