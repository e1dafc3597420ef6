// Allow dead code: not every test file uses every helper
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};

use showcase_core::auth::{AuthBackend, Credentials, LoginResponse};
use showcase_core::clock::Clock;
use showcase_core::storage::{KeyValueStore, MemoryStore};
use showcase_core::{ApiError, SessionManager, SessionOptions};

pub const START: i64 = 1_700_000_000;

/// Unsigned token whose payload carries `exp` and realm roles.
pub fn token(exp: i64, roles: &[&str]) -> String {
    token_with_exp(json!(exp), roles)
}

/// Like `token`, but `exp` may be any JSON value.
pub fn token_with_exp(exp: Value, roles: &[&str]) -> String {
    let header = URL_SAFE_NO_PAD.encode(json!({"alg": "RS256", "typ": "JWT"}).to_string());
    let payload = URL_SAFE_NO_PAD.encode(
        json!({
            "exp": exp,
            "sub": "user-1",
            "realm_access": { "roles": roles },
        })
        .to_string(),
    );
    format!("{}.{}.signature", header, payload)
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.timestamp_opt(START, 0).unwrap()),
        }
    }

    pub fn timestamp(&self) -> i64 {
        self.now.lock().unwrap().timestamp()
    }

    pub fn advance(&self, secs: i64) {
        *self.now.lock().unwrap() += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Backend that answers logins from a canned response.
#[derive(Default)]
pub struct FakeBackend {
    pub response: Mutex<Option<(String, Option<Value>)>>,
    pub fail_logout: bool,
    pub logins: AtomicUsize,
    pub logouts: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn issuing(token: String, user: Option<Value>) -> Self {
        Self {
            response: Mutex::new(Some((token, user))),
            ..Self::default()
        }
    }

    pub fn set_response(&self, token: String, user: Option<Value>) {
        *self.response.lock().unwrap() = Some((token, user));
    }

    pub fn logout_count(&self) -> usize {
        self.logouts.lock().unwrap().len()
    }
}

#[async_trait]
impl AuthBackend for FakeBackend {
    async fn login(&self, _credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        match self.response.lock().unwrap().clone() {
            Some((access_token, user)) => Ok(LoginResponse { access_token, user }),
            None => Err(ApiError::BadRequest(
                r#"{"message":"Invalid user credentials"}"#.to_string(),
            )),
        }
    }

    async fn logout(&self, token: &str) -> Result<(), ApiError> {
        self.logouts.lock().unwrap().push(token.to_string());
        if self.fail_logout {
            Err(ApiError::ServerError("logout failed".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Store that refuses writes to one key.
pub struct FailingStore {
    pub inner: MemoryStore,
    pub failing_key: &'static str,
}

impl FailingStore {
    pub fn failing_on(failing_key: &'static str) -> Self {
        Self {
            inner: MemoryStore::new(),
            failing_key,
        }
    }
}

impl KeyValueStore for FailingStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        if key == self.failing_key {
            anyhow::bail!("disk full");
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.inner.remove(key)
    }
}

pub struct Harness {
    pub manager: SessionManager,
    pub store: Arc<MemoryStore>,
    pub backend: Arc<FakeBackend>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new(backend: FakeBackend) -> Self {
        Self::with_store(backend, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(backend: FakeBackend, store: Arc<MemoryStore>) -> Self {
        let backend = Arc::new(backend);
        let clock = Arc::new(ManualClock::new());
        let manager = SessionManager::with_clock(
            store.clone(),
            backend.clone(),
            SessionOptions::default(),
            clock.clone(),
        );
        Self {
            manager,
            store,
            backend,
            clock,
        }
    }

    /// Token valid for an hour from the harness clock.
    pub fn fresh_token(&self, roles: &[&str]) -> String {
        token(self.clock.timestamp() + 3600, roles)
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("alice", "secret")
}
