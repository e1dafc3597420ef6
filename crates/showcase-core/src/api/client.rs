//! API client for the showcase content endpoints.
//!
//! Reads are public; create, update, status and delete calls are guarded by
//! `SessionManager::validate_token` before anything goes on the wire.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::{check_response, ApiError};
use super::interceptor::SessionInterceptor;
use crate::auth::SessionManager;
use crate::models::{Image, ImageUpload, Introduce, IntroduceUpdate, NewIntroduce, Status};

// ============================================================================
// Constants
// ============================================================================

/// Public introduce endpoints
const INTRODUCE_PATH: &str = "/api/v1/introduce";

/// Image endpoints
const IMAGE_PATH: &str = "/api/v1/image";

/// Admin introduce endpoints (require a session)
const ADMIN_INTRODUCE_PATH: &str = "/api/v1/admin/introduce";

/// API client for the content endpoints.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    interceptor: SessionInterceptor,
}

impl ApiClient {
    pub fn new(client: Client, api_url: &str, session: SessionManager) -> Self {
        Self {
            client,
            base_url: api_url.trim_end_matches('/').to_string(),
            interceptor: SessionInterceptor::new(session),
        }
    }

    pub fn session(&self) -> &SessionManager {
        self.interceptor.session()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.interceptor.authorize(request).send().await?;
        self.interceptor.inspect(&response);
        check_response(response).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
    }

    /// Pre-flight check for calls that change data.
    fn require_session(&self) -> Result<(), ApiError> {
        if self.session().validate_token() {
            Ok(())
        } else {
            warn!("Refusing request: session expired or missing");
            Err(ApiError::SessionExpired)
        }
    }

    // ===== Public reads =====

    /// Fetch every card in server order
    pub async fn fetch_introduces(&self) -> Result<Vec<Introduce>, ApiError> {
        let url = self.url(&format!("{}/all", INTRODUCE_PATH));
        let introduces: Vec<Introduce> = self.send_json(self.client.get(&url), "introduce list").await?;
        debug!(count = introduces.len(), "Fetched introduces");
        Ok(introduces)
    }

    pub async fn fetch_introduce(&self, id: &str) -> Result<Introduce, ApiError> {
        let url = self.url(&format!(
            "{}/get-by-title/{}",
            INTRODUCE_PATH,
            urlencoding::encode(id)
        ));
        self.send_json(self.client.get(&url), "introduce").await
    }

    pub async fn fetch_image(&self, id: &str) -> Result<Image, ApiError> {
        let url = self.url(&format!(
            "{}/get-image-by-id/{}",
            IMAGE_PATH,
            urlencoding::encode(id)
        ));
        self.send_json(self.client.get(&url), "image").await
    }

    /// Cards whose title contains `query`, ignoring case.
    /// A failed fetch yields an empty list.
    pub async fn search_introduces(&self, query: &str) -> Vec<Introduce> {
        match self.fetch_introduces().await {
            Ok(introduces) => introduces
                .into_iter()
                .filter(|introduce| introduce.title_matches(query))
                .collect(),
            Err(e) => {
                warn!(error = %e, query = query, "Error searching introduces");
                Vec::new()
            }
        }
    }

    // ===== Admin writes =====

    pub async fn create_introduce(
        &self,
        introduce: &NewIntroduce,
        image: Option<ImageUpload>,
    ) -> Result<Introduce, ApiError> {
        self.require_session()?;

        let mut form = Form::new()
            .text("title", introduce.title.clone())
            .text("description", introduce.description.clone())
            .text("tag", introduce.tag.clone().unwrap_or_default())
            .text("url", introduce.url.clone())
            .text("status", introduce.status.as_str());
        if let Some(image) = image {
            form = form.part("file", image_part(image)?);
        }

        let url = self.url(&format!("{}/create", ADMIN_INTRODUCE_PATH));
        debug!(title = %introduce.title, "Creating introduce");
        self.send_json(self.client.post(&url).multipart(form), "created introduce").await
    }

    pub async fn update_introduce(
        &self,
        id: &str,
        update: &IntroduceUpdate,
        image: Option<ImageUpload>,
    ) -> Result<Introduce, ApiError> {
        self.require_session()?;

        let mut form = Form::new().text("id", id.to_string());
        let fields = [
            ("title", &update.title),
            ("description", &update.description),
            ("tag", &update.tag),
            ("url", &update.url),
        ];
        for (name, value) in fields {
            if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
                form = form.text(name, value.clone());
            }
        }
        form = form.text("status", update.status.as_str());
        if let Some(image) = image {
            form = form.part("file", image_part(image)?);
        }

        let url = self.url(&format!("{}/update", ADMIN_INTRODUCE_PATH));
        debug!(id = id, "Updating introduce");
        self.send_json(self.client.put(&url).multipart(form), "updated introduce").await
    }

    pub async fn update_introduce_status(
        &self,
        id: &str,
        status: Status,
    ) -> Result<Introduce, ApiError> {
        self.require_session()?;

        let url = self.url(&format!(
            "{}/update-status/{}",
            ADMIN_INTRODUCE_PATH,
            urlencoding::encode(id)
        ));
        let request = self.client.put(&url).query(&[("status", status.as_str())]);
        debug!(id = id, status = %status, "Updating introduce status");
        self.send_json(request, "introduce").await
    }

    pub async fn delete_introduce(&self, id: &str) -> Result<Introduce, ApiError> {
        self.require_session()?;

        let url = self.url(&format!(
            "{}/delete/{}",
            ADMIN_INTRODUCE_PATH,
            urlencoding::encode(id)
        ));
        debug!(id = id, "Deleting introduce");
        self.send_json(self.client.delete(&url), "deleted introduce").await
    }
}

fn image_part(image: ImageUpload) -> Result<Part, ApiError> {
    Ok(Part::bytes(image.bytes)
        .file_name(image.file_name)
        .mime_str(&image.content_type)?)
}
