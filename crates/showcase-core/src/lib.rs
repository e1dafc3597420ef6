//! Core library for the showcase content portal.
//!
//! This crate provides:
//! - `auth`: the session manager (token storage, expiry detection,
//!   periodic monitoring, coordinated logout)
//! - `api`: HTTP clients for the auth and content endpoints
//! - `storage`: durable key-value stores backing the session
//! - `models`: content API data types
//! - `config`: application configuration

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod models;
pub mod storage;

pub use api::{ApiClient, ApiError, AuthApi};
pub use auth::{AuthError, Credentials, SessionEvent, SessionManager, SessionOptions, SessionState};
pub use config::Config;
