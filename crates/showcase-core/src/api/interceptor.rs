use reqwest::{RequestBuilder, Response, StatusCode};

use crate::auth::SessionManager;

/// Per-request hook wired into `ApiClient` at construction.
///
/// The bearer token is read from the session at call time rather than
/// configured on the HTTP client, and every 401 is reported back to the
/// session whatever endpoint produced it.
#[derive(Clone)]
pub struct SessionInterceptor {
    session: SessionManager,
}

impl SessionInterceptor {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub fn inspect(&self, response: &Response) {
        if response.status() == StatusCode::UNAUTHORIZED {
            self.session.handle_unauthorized();
        }
    }
}
