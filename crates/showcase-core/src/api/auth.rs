use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::error::{check_response, ApiError};
use crate::auth::{AuthBackend, Credentials, LoginResponse};

/// Path of the authentication endpoints below the API base URL.
const AUTH_PATH: &str = "/api/v1/auth";

/// Login/logout endpoints.
#[derive(Clone)]
pub struct AuthApi {
    client: Client,
    base_url: String,
}

impl AuthApi {
    pub fn new(client: Client, api_url: &str) -> Self {
        Self {
            client,
            base_url: format!("{}{}", api_url.trim_end_matches('/'), AUTH_PATH),
        }
    }
}

#[async_trait]
impl AuthBackend for AuthApi {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let url = format!("{}/login", self.base_url);
        debug!(url = %url, username = %credentials.username, "Sending login request");

        let response = self.client.post(&url).json(credentials).send().await?;
        let response = check_response(response).await?;

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse login response: {}", e)))
    }

    async fn logout(&self, token: &str) -> Result<(), ApiError> {
        let url = format!("{}/logout", self.base_url);
        debug!(url = %url, "Sending logout request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }
}
