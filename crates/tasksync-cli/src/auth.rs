//! Linear API key lookup with secure keychain persistence.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use tasksync_core::util::normalize_text_option;

use crate::error::CliError;

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "tasksync-cli";
const API_KEY_ENV: &str = "LINEAR_API_KEY";

/// Where the API key in use came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Environment,
    Keychain,
}

impl KeySource {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Environment => API_KEY_ENV,
            Self::Keychain => "keychain",
        }
    }
}

#[derive(Clone)]
pub struct ApiKeyStore {
    username: String,
}

impl ApiKeyStore {
    pub fn new(profile_name: &str) -> Self {
        Self {
            username: format!("linear_api_key:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> Result<Entry, CliError> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| CliError::Auth(error.to_string()))
    }

    #[cfg(not(test))]
    pub fn load(&self) -> Result<Option<String>, CliError> {
        match self.entry()?.get_password() {
            Ok(key) => Ok(normalize_text_option(Some(key))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(CliError::Auth(error.to_string())),
        }
    }

    #[cfg(test)]
    pub fn load(&self) -> Result<Option<String>, CliError> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| CliError::Auth(error.to_string()))?;
        Ok(guard.get(&self.username).cloned())
    }

    #[cfg(not(test))]
    pub fn save(&self, api_key: &str) -> Result<(), CliError> {
        self.entry()?
            .set_password(api_key)
            .map_err(|error| CliError::Auth(error.to_string()))
    }

    #[cfg(test)]
    pub fn save(&self, api_key: &str) -> Result<(), CliError> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| CliError::Auth(error.to_string()))?;
        guard.insert(self.username.clone(), api_key.to_string());
        Ok(())
    }

    #[cfg(not(test))]
    pub fn clear(&self) -> Result<(), CliError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(CliError::Auth(error.to_string())),
        }
    }

    #[cfg(test)]
    pub fn clear(&self) -> Result<(), CliError> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| CliError::Auth(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

/// API key from `LINEAR_API_KEY`, falling back to the profile's keychain entry.
pub fn find_api_key(profile_name: &str) -> Result<Option<(String, KeySource)>, CliError> {
    if let Some(key) = normalize_text_option(std::env::var(API_KEY_ENV).ok()) {
        return Ok(Some((key, KeySource::Environment)));
    }
    Ok(ApiKeyStore::new(profile_name)
        .load()?
        .map(|key| (key, KeySource::Keychain)))
}

pub fn require_api_key(profile_name: &str) -> Result<String, CliError> {
    find_api_key(profile_name)?
        .map(|(key, _)| key)
        .ok_or_else(|| CliError::MissingApiKey(profile_name.to_string()))
}

/// Show only the tail of a key
pub fn mask_api_key(api_key: &str) -> String {
    let tail = api_key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<String>();
    if api_key.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("****{tail}")
    }
}
