//! API handlers for the PolyLab auth service.
//!
//! `auth` holds the security core (credentials, sessions, tokens, CSRF,
//! rate limiting); the remaining modules are thin endpoints composed from
//! it.

pub mod auth;
pub mod headers;
pub mod health;
pub mod instructor_requests;
pub mod me;
pub mod root;
