//! Session manager: the single owner of authentication state.
//!
//! Construct one `SessionManager` at startup and hand clones to whatever
//! needs it (the API client's interceptor, the UI layer). Clones share the
//! same state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::backend::{AuthBackend, Credentials};
use super::claims::{is_token_expired, TokenClaims};
use super::error::AuthError;
use super::events::SessionEvent;
use super::monitor::{ExpiryMonitor, DEFAULT_MONITOR_INTERVAL};
use super::session::{Session, SessionState, UserProfile};
use crate::clock::{Clock, SystemClock};
use crate::storage::KeyValueStore;

/// Default login entry point for redirects.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Buffered session events per subscriber.
const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub monitor_interval: Duration,
    pub login_path: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}

struct Inner {
    session: Mutex<Session>,
    store: Arc<dyn KeyValueStore>,
    backend: Arc<dyn AuthBackend>,
    clock: Arc<dyn Clock>,
    monitor: ExpiryMonitor,
    events: broadcast::Sender<SessionEvent>,
    notice_active: AtomicBool,
    login_path: String,
}

/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn AuthBackend>,
        options: SessionOptions,
    ) -> Self {
        Self::with_clock(store, backend, options, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn AuthBackend>,
        options: SessionOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                session: Mutex::new(Session::default()),
                store,
                backend,
                clock,
                monitor: ExpiryMonitor::new(options.monitor_interval),
                events,
                notice_active: AtomicBool::new(false),
                login_path: options.login_path,
            }),
        }
    }

    /// Receive expiry notices and redirects.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    // ===== Lifecycle =====

    /// Restore the session from durable storage.
    ///
    /// Returns whether a valid session now exists. Storage and decode
    /// failures degrade to "not authenticated" and clear the stored record.
    pub fn initialize(&self) -> bool {
        let now = self.now();
        match Session::load(self.inner.store.as_ref(), now) {
            Ok(Some(session)) => {
                let roles = session.profile.as_ref().map(|p| p.roles.len()).unwrap_or(0);
                *self.inner.session.lock() = session;
                self.start_monitor();
                info!(roles, "Restored session from storage");
                true
            }
            Ok(None) => {
                debug!("No valid stored session, clearing auth data");
                self.clear_auth_data();
                false
            }
            Err(e) => {
                warn!(error = %e, "Failed to restore session");
                self.clear_auth_data();
                false
            }
        }
    }

    /// Authenticate with the server and start a session.
    ///
    /// Nothing is mutated unless the server returns a live token.
    pub async fn login(&self, credentials: &Credentials) -> Result<SessionState, AuthError> {
        let response = self.inner.backend.login(credentials).await.map_err(|e| {
            warn!(error = %e, "Login request failed");
            AuthError::from(e)
        })?;

        if response.access_token.is_empty() {
            warn!("Login response carried an empty token");
            return Err(AuthError::InvalidResponse);
        }

        let claims = match TokenClaims::decode(&response.access_token) {
            Ok(claims) if !claims.is_expired_at(self.now()) => claims,
            _ => {
                warn!("Received expired token from server");
                return Err(AuthError::ExpiredToken);
            }
        };

        let profile = UserProfile::merge(response.user, claims.roles());
        let session = Session::authenticated(response.access_token, profile);

        let state = {
            let mut current = self.inner.session.lock();
            if let Err(e) = session.save(self.inner.store.as_ref()) {
                warn!(error = %e, "Failed to persist session, it will not survive a restart");
                // Never leave half a record for the next start to find
                if let Err(e) = Session::clear_store(self.inner.store.as_ref()) {
                    warn!(error = %e, "Failed to clear partially stored session");
                }
            }
            *current = session;
            current.state()
        };

        self.inner.notice_active.store(false, Ordering::SeqCst);
        self.start_monitor();
        info!(username = %credentials.username, "Login successful");
        Ok(state)
    }

    /// End the session. Always completes locally.
    ///
    /// The monitor is stopped before the server is notified, and a failed
    /// notification is logged and ignored.
    pub async fn logout(&self) {
        self.stop_monitor();

        let token = self.inner.session.lock().token.clone();
        if let Some(token) = token {
            if !is_token_expired(&token, self.now()) {
                if let Err(e) = self.inner.backend.logout(&token).await {
                    warn!(error = %e, "Logout request failed");
                }
            }
        }

        self.clear_auth_data();
        let location = format!(
            "{}?t={}",
            self.inner.login_path,
            self.now().timestamp_millis()
        );
        self.emit(SessionEvent::Redirect { location });
        info!("Logged out");
    }

    /// The expiry notice's only action: dismiss it and log out.
    pub async fn relogin(&self) {
        self.inner.notice_active.store(false, Ordering::SeqCst);
        self.logout().await;
    }

    // ===== Accessors =====

    pub fn get_state(&self) -> SessionState {
        self.inner.session.lock().state()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.inner.session.lock().profile.clone()
    }

    /// Exact, case-sensitive role membership. False when unauthenticated.
    pub fn has_role(&self, name: &str) -> bool {
        self.inner.session.lock().has_role(name)
    }

    /// Re-checks token expiry on every call. No side effects.
    pub fn is_authenticated(&self) -> bool {
        self.inner.session.lock().is_valid(self.now())
    }

    /// Token to attach as `Authorization: Bearer` on outgoing requests.
    pub fn bearer_token(&self) -> Option<String> {
        let session = self.inner.session.lock();
        if session.authenticated {
            session.token.clone()
        } else {
            None
        }
    }

    /// Pre-flight guard for state-changing calls.
    ///
    /// Like `is_authenticated`, but an expired token ends the session and
    /// raises the expiry notice.
    pub fn validate_token(&self) -> bool {
        let now = self.now();
        let mut session = self.inner.session.lock();
        if !session.authenticated || session.token.is_none() {
            return false;
        }
        if session.is_valid(now) {
            return true;
        }

        info!("Token expired before request, ending session");
        self.teardown(&mut session);
        drop(session);
        self.notify_expired();
        false
    }

    /// React to a 401 from any endpoint.
    ///
    /// If the token is locally expired the user gets the expiry notice;
    /// otherwise the server revoked a token we considered valid and the
    /// user is sent straight to the login page. Credentials are cleared in
    /// both cases.
    pub fn handle_unauthorized(&self) {
        let now = self.now();
        let mut session = self.inner.session.lock();
        let expired = session.is_stale(now);
        self.teardown(&mut session);
        drop(session);

        if expired {
            info!("Received 401 with an expired token");
            self.notify_expired();
        } else {
            warn!("Received 401 with a token that looked valid, forcing logout");
            self.emit(SessionEvent::Redirect {
                location: self.inner.login_path.clone(),
            });
        }
    }

    // ===== Monitoring =====

    /// Start (or restart) the periodic expiry check.
    pub fn start_monitor(&self) {
        // The task holds a weak reference so it never keeps the manager alive
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.monitor.start(move || match weak.upgrade() {
            Some(inner) => SessionManager { inner }.check_expiry(),
            None => true,
        });
    }

    pub fn stop_monitor(&self) {
        self.inner.monitor.stop();
    }

    pub fn is_monitoring(&self) -> bool {
        self.inner.monitor.is_running()
    }

    /// Monitor tick. Returns `true` once the session has ended.
    fn check_expiry(&self) -> bool {
        let now = self.now();
        let mut session = self.inner.session.lock();
        if !session.is_stale(now) {
            return false;
        }

        info!("Token expired, ending session");
        self.teardown(&mut session);
        drop(session);
        self.notify_expired();
        true
    }

    // ===== Internals =====

    fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    fn clear_auth_data(&self) {
        let mut session = self.inner.session.lock();
        self.teardown(&mut session);
    }

    /// Stop monitoring and drop in-memory and durable state together.
    /// Runs under the session lock so a concurrent login cannot interleave.
    fn teardown(&self, session: &mut Session) {
        self.inner.monitor.stop();
        *session = Session::default();
        if let Err(e) = Session::clear_store(self.inner.store.as_ref()) {
            warn!(error = %e, "Failed to clear stored session");
        }
    }

    /// Raise the expiry notice unless one is already showing.
    fn notify_expired(&self) {
        if self.inner.notice_active.swap(true, Ordering::SeqCst) {
            debug!("Expiry notice already active");
            return;
        }
        self.emit(SessionEvent::Expired);
    }

    fn emit(&self, event: SessionEvent) {
        if self.inner.events.send(event).is_err() {
            debug!("No subscribers for session event");
        }
    }
}
