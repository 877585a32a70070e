//! API key storage and lookup.
//!
//! The key used for completions comes from, in order: the `api_key` setting,
//! the system keyring entry written by `liunian auth`, and the
//! `OPENAI_API_KEY` environment variable.

use std::error::Error;
use std::fmt;

use keyring::Entry;
use tracing::{debug, warn};

use crate::core::config::Settings;

const KEYRING_SERVICE: &str = "liunian";
const KEYRING_USER: &str = "api-key";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Failures when talking to the system keyring.
///
/// `Unavailable` covers a backend that is locked or unreachable; `Keyring`
/// is any other failure reported by the platform store.
#[derive(Debug)]
pub enum AuthError {
    EmptyKey,
    Unavailable(keyring::Error),
    Keyring(keyring::Error),
}

impl From<keyring::Error> for AuthError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                AuthError::Unavailable(err)
            }
            other => AuthError::Keyring(other),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::EmptyKey => write!(f, "API key must not be empty"),
            AuthError::Unavailable(err) => write!(f, "System keyring unavailable: {err}"),
            AuthError::Keyring(err) => write!(f, "Keyring error: {err}"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AuthError::EmptyKey => None,
            AuthError::Unavailable(err) | AuthError::Keyring(err) => Some(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Settings,
    Keyring,
    Environment,
}

impl KeySource {
    pub fn describe(self) -> &'static str {
        match self {
            KeySource::Settings => "config file",
            KeySource::Keyring => "system keyring",
            KeySource::Environment => API_KEY_ENV,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    pub key: String,
    pub source: KeySource,
}

pub struct AuthManager {
    use_keyring: bool,
}

impl AuthManager {
    pub fn new() -> Self {
        Self::new_with_keyring(true)
    }

    pub fn new_with_keyring(use_keyring: bool) -> Self {
        Self { use_keyring }
    }

    pub fn store_key(&self, key: &str) -> Result<(), AuthError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(AuthError::EmptyKey);
        }
        if !self.use_keyring {
            return Ok(());
        }
        Entry::new(KEYRING_SERVICE, KEYRING_USER)?.set_password(key)?;
        debug!("api key stored in keyring");
        Ok(())
    }

    pub fn get_key(&self) -> Result<Option<String>, AuthError> {
        if !self.use_keyring {
            return Ok(None);
        }
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        match entry.get_password() {
            Ok(key) => Ok(Some(key)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove the stored key. Returns whether one existed.
    pub fn remove_key(&self) -> Result<bool, AuthError> {
        if !self.use_keyring {
            return Ok(false);
        }
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        match entry.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Pick the key to send. A keyring failure is logged and skipped.
    pub fn resolve(&self, settings: &Settings) -> Option<ResolvedKey> {
        let settings_key = settings.api_key.trim();
        if !settings_key.is_empty() {
            return Some(ResolvedKey {
                key: settings_key.to_string(),
                source: KeySource::Settings,
            });
        }
        resolve_fallback(self.get_key(), std::env::var(API_KEY_ENV).ok())
    }
}

impl Default for AuthManager {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_fallback(
    keyring: Result<Option<String>, AuthError>,
    env: Option<String>,
) -> Option<ResolvedKey> {
    match keyring {
        Ok(Some(key)) if !key.trim().is_empty() => {
            return Some(ResolvedKey {
                key: key.trim().to_string(),
                source: KeySource::Keyring,
            })
        }
        Ok(_) => {}
        Err(err) => warn!(error = %err, "keyring lookup failed"),
    }
    env.map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .map(|key| ResolvedKey {
            key,
            source: KeySource::Environment,
        })
}
