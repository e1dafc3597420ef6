//! REST API client module for the showcase backend.
//!
//! This module provides:
//! - `AuthApi`: the login/logout endpoints behind `SessionManager`
//! - `ApiClient`: content endpoints (introduce cards and images)
//! - `SessionInterceptor`: attaches the bearer token to every request and
//!   reports 401 responses back to the session
//!
//! Both clients share one `reqwest::Client` connection pool.

pub mod auth;
pub mod client;
pub mod error;
pub mod interceptor;

use std::time::Duration;

pub use auth::AuthApi;
pub use client::ApiClient;
pub use error::ApiError;
pub use interceptor::SessionInterceptor;

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Build the shared HTTP client.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, ApiError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}
