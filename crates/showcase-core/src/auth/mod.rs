//! Authentication module for managing the client-side session.
//!
//! This module provides:
//! - `SessionManager`: restore, login, logout, role checks and expiry handling
//! - `TokenClaims`: bearer token payload decoding
//! - `ExpiryMonitor`: periodic token liveness check
//! - `SessionEvent`: notifications for the UI layer (expiry notice, redirects)
//!
//! The session is persisted to a `KeyValueStore` as two entries and is
//! torn down as soon as the token is confirmed expired.

pub mod backend;
pub mod claims;
pub mod error;
pub mod events;
pub mod manager;
pub mod monitor;
pub mod session;

pub use backend::{AuthBackend, Credentials, LoginResponse};
pub use claims::{is_token_expired, DecodeError, TokenClaims, EXPIRY_BUFFER_SECS};
pub use error::AuthError;
pub use events::SessionEvent;
pub use manager::{SessionManager, SessionOptions};
pub use monitor::ExpiryMonitor;
pub use session::{Session, SessionState, UserProfile};
