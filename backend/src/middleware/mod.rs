//! Middleware for the Reseller Ledger platform

pub mod auth;

pub use auth::{auth_middleware, AuthUser, CurrentUser};
