use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

const SERVICE_NAME: &str = "wayfare";

/// Remembered passwords in the OS keychain, one set per travel backend.
///
/// Keychain accounts are `username@backend`, where the backend is the API
/// base URL without its scheme. Signing in to a staging server through
/// `WAYFARE_API_URL` therefore never reads or replaces the password saved
/// for production.
pub struct CredentialStore {
    backend: String,
}

impl CredentialStore {
    pub fn for_backend(api_base_url: &str) -> Self {
        Self {
            backend: backend_label(api_base_url),
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Keychain account name used for `username` on this backend.
    pub fn account(&self, username: &str) -> String {
        format!("{}@{}", username, self.backend)
    }

    fn entry(&self, username: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account(username))
            .with_context(|| format!("Failed to open keychain entry for {}", self.account(username)))
    }

    /// Save the password used for a successful sign-in.
    pub fn remember(&self, username: &str, password: &str) -> Result<()> {
        self.entry(username)?
            .set_password(password)
            .context("Failed to save password to keychain")?;
        debug!(account = %self.account(username), "Remembered password");
        Ok(())
    }

    /// The remembered password, or `None` if this backend has none for
    /// `username`.
    pub fn recall(&self, username: &str) -> Result<Option<String>> {
        match self.entry(username)?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read password from keychain"),
        }
    }

    /// Forget the password for `username`. Returns false if none was saved.
    pub fn forget(&self, username: &str) -> Result<bool> {
        match self.entry(username)?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(e).context("Failed to remove password from keychain"),
        }
    }
}

/// `https://API.wayfare.app/v1/` -> `api.wayfare.app/v1`
fn backend_label(api_base_url: &str) -> String {
    let url = api_base_url.trim().trim_end_matches('/');
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    match without_scheme.split_once('/') {
        Some((host, path)) => format!("{}/{}", host.to_ascii_lowercase(), path),
        None => without_scheme.to_ascii_lowercase(),
    }
}
