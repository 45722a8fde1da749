//! Admin endpoints — liveness, metrics, and the cache debug surface.
//!
//! The debug routes are gated by the `AdminGuard` extractor (see
//! `guard.rs`), which checks a bearer token against `admin_token_hash`.
//! If no token is configured, the guard passes every request (dev mode).

mod guard;
mod health;

pub use guard::AdminGuard;
pub use health::{admin_debug_user, admin_models, admin_restart, health, metrics};
