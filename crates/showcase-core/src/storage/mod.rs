//! Durable key-value storage for the session record.
//!
//! The session persists two string entries: the raw bearer token and the
//! serialized user profile. Backends:
//! - `FileStore`: a JSON file in the cache directory
//! - `KeyringStore`: OS-level credential storage via keyring
//! - `MemoryStore`: process-local, for tests and ephemeral sessions

pub mod file;
pub mod keychain;
pub mod memory;

use anyhow::Result;

pub use self::file::FileStore;
pub use self::keychain::KeyringStore;
pub use self::memory::MemoryStore;

/// Key holding the raw bearer token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Key holding the serialized user profile.
pub const USER_INFO_KEY: &str = "user_info";

/// String key-value storage that survives process restarts.
///
/// There is no transactional guarantee across keys.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
