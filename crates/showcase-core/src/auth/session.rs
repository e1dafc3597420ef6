use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::claims::{is_token_expired, TokenClaims};
use crate::storage::{KeyValueStore, ACCESS_TOKEN_KEY, USER_INFO_KEY};

/// User attributes from the login response merged with the token's roles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserProfile {
    /// Merge a server `user` object with token roles. The token is
    /// authoritative for roles; anything that is not an object contributes
    /// no attributes.
    pub fn merge(user: Option<Value>, roles: Vec<String>) -> Self {
        let mut attributes = match user {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        attributes.remove("roles");
        Self { attributes, roles }
    }

    /// Rebuild a profile from its stored form. A missing or unparseable
    /// entry yields a profile holding only the token roles.
    pub fn restore(stored: Option<&str>, roles: Vec<String>) -> Self {
        let user = stored.and_then(|raw| match serde_json::from_str::<Value>(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "Stored user profile is corrupt, ignoring it");
                None
            }
        });
        Self::merge(user, roles)
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|role| role == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// Read-only snapshot handed to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub authenticated: bool,
    pub user_info: Option<UserProfile>,
    pub access_token: Option<String>,
}

/// In-memory session. `authenticated` implies `token` is present and was
/// unexpired when last checked.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub authenticated: bool,
    pub token: Option<String>,
    pub profile: Option<UserProfile>,
}

impl Session {
    pub fn authenticated(token: String, profile: UserProfile) -> Self {
        Self {
            authenticated: true,
            token: Some(token),
            profile: Some(profile),
        }
    }

    /// Load a session from the store. Returns `None` when no token is stored
    /// or the stored token is expired or undecodable.
    pub fn load(store: &dyn KeyValueStore, now: DateTime<Utc>) -> Result<Option<Self>> {
        let token = match store.get(ACCESS_TOKEN_KEY).context("Failed to read stored token")? {
            Some(token) => token,
            None => return Ok(None),
        };

        let claims = match TokenClaims::decode(&token) {
            Ok(claims) if !claims.is_expired_at(now) => claims,
            _ => return Ok(None),
        };

        // The profile entry is optional: a crash between the two writes can
        // leave only the token behind
        let stored_profile = match store.get(USER_INFO_KEY) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to read stored user profile");
                None
            }
        };
        let profile = UserProfile::restore(stored_profile.as_deref(), claims.roles());

        Ok(Some(Self::authenticated(token, profile)))
    }

    /// Persist token and profile.
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        if let Some(ref token) = self.token {
            store.set(ACCESS_TOKEN_KEY, token).context("Failed to store token")?;
        }
        if let Some(ref profile) = self.profile {
            let contents = serde_json::to_string(profile)?;
            store.set(USER_INFO_KEY, &contents).context("Failed to store user profile")?;
        }
        Ok(())
    }

    /// Remove the durable record.
    pub fn clear_store(store: &dyn KeyValueStore) -> Result<()> {
        let token = store.remove(ACCESS_TOKEN_KEY).context("Failed to remove stored token");
        let profile = store.remove(USER_INFO_KEY).context("Failed to remove stored user profile");
        token.and(profile)
    }

    /// Check if session is valid (authenticated with an unexpired token)
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.authenticated
            && self
                .token
                .as_deref()
                .map(|token| !is_token_expired(token, now))
                .unwrap_or(false)
    }

    /// Authenticated, but the token has run out.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.authenticated && self.token.is_some() && !self.is_valid(now)
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.authenticated
            && self
                .profile
                .as_ref()
                .map(|profile| profile.has_role(name))
                .unwrap_or(false)
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            authenticated: self.authenticated,
            user_info: self.profile.clone(),
            access_token: self.token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn token(exp_offset: i64, roles: &[&str]) -> String {
        let payload = json!({
            "exp": now().timestamp() + exp_offset,
            "realm_access": { "roles": roles },
        });
        format!("h.{}.s", URL_SAFE_NO_PAD.encode(payload.to_string()))
    }

    #[test]
    fn test_merge_replaces_server_roles() {
        let profile = UserProfile::merge(
            Some(json!({"name": "A", "roles": ["ignored"]})),
            vec!["admin".into()],
        );
        assert_eq!(profile.attribute("name"), Some(&json!("A")));
        assert_eq!(profile.roles, vec!["admin".to_string()]);
        assert_eq!(
            serde_json::to_value(&profile).unwrap(),
            json!({"name": "A", "roles": ["admin"]})
        );
    }

    #[test]
    fn test_merge_non_object_user() {
        let profile = UserProfile::merge(Some(json!("alice")), vec![]);
        assert!(profile.attributes.is_empty());
        let profile = UserProfile::merge(None, vec!["user".into()]);
        assert_eq!(profile, UserProfile { attributes: Map::new(), roles: vec!["user".into()] });
    }

    #[test]
    fn test_role_match_is_exact() {
        let profile = UserProfile::merge(None, vec!["Admin".into()]);
        assert!(profile.has_role("Admin"));
        assert!(!profile.has_role("admin"));
        assert!(!profile.has_role("Adm"));
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        let session = Session::authenticated(
            token(3600, &["editor"]),
            UserProfile::merge(Some(json!({"name": "A"})), vec!["editor".into()]),
        );
        session.save(&store).unwrap();

        let loaded = Session::load(&store, now()).unwrap().unwrap();
        assert!(loaded.authenticated);
        assert_eq!(loaded.token, session.token);
        assert_eq!(loaded.profile, session.profile);
    }

    #[test]
    fn test_load_without_token() {
        let store = MemoryStore::new();
        store.set(USER_INFO_KEY, "{}").unwrap();
        assert!(Session::load(&store, now()).unwrap().is_none());
    }

    #[test]
    fn test_load_expired_token() {
        let store = MemoryStore::new();
        store.set(ACCESS_TOKEN_KEY, &token(30, &[])).unwrap();
        assert!(Session::load(&store, now()).unwrap().is_none());

        store.set(ACCESS_TOKEN_KEY, "garbage").unwrap();
        assert!(Session::load(&store, now()).unwrap().is_none());
    }

    #[test]
    fn test_load_with_corrupt_profile() {
        let store = MemoryStore::new();
        store.set(ACCESS_TOKEN_KEY, &token(3600, &["viewer"])).unwrap();
        store.set(USER_INFO_KEY, "{\"name\": \"A\"").unwrap();

        let loaded = Session::load(&store, now()).unwrap().unwrap();
        let profile = loaded.profile.unwrap();
        assert!(profile.attributes.is_empty());
        assert_eq!(profile.roles, vec!["viewer".to_string()]);
    }

    #[test]
    fn test_clear_store() {
        let store = MemoryStore::new();
        store.set(ACCESS_TOKEN_KEY, "t").unwrap();
        store.set(USER_INFO_KEY, "{}").unwrap();
        Session::clear_store(&store).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_validity() {
        let session = Session::authenticated(token(3600, &[]), UserProfile::default());
        assert!(session.is_valid(now()));
        assert!(!session.is_stale(now()));

        let session = Session::authenticated(token(10, &[]), UserProfile::default());
        assert!(!session.is_valid(now()));
        assert!(session.is_stale(now()));

        assert!(!Session::default().is_valid(now()));
        assert!(!Session::default().is_stale(now()));
    }
}
