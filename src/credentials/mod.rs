//! Credential resolution for the root account
//!
//! The password comes from an environment variable when one is set (CI
//! runs), and from the OS keyring otherwise (local runs). Both lookups sit
//! behind small seams so the resolution order can be tested without touching
//! the real environment or keyring.

use crate::config::AccountConfig;
use crate::ConfigError;

/// Where a resolved password came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    SecretStore,
}

/// A local secret store keyed by service and user
pub trait SecretStore {
    /// Returns the stored secret, or `Ok(None)` if there is no entry
    fn get_secret(&self, service: &str, user: &str) -> Result<Option<String>, ConfigError>;
}

/// Secret store backed by the platform keyring
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringStore;

impl SecretStore for KeyringStore {
    fn get_secret(&self, service: &str, user: &str) -> Result<Option<String>, ConfigError> {
        let entry = keyring::Entry::new(service, user)
            .map_err(|e| ConfigError::SecretStore(e.to_string()))?;

        match entry.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(ConfigError::SecretStore(e.to_string())),
        }
    }
}

/// Resolves the root account password from the process environment or the keyring
pub fn resolve_password(account: &AccountConfig) -> Result<(String, CredentialSource), ConfigError> {
    resolve_password_with(account, |name| std::env::var(name).ok(), &KeyringStore)
}

/// Resolves the password using the given environment lookup and secret store
///
/// Empty values are treated as absent in both sources.
pub fn resolve_password_with<E, S>(
    account: &AccountConfig,
    env: E,
    store: &S,
) -> Result<(String, CredentialSource), ConfigError>
where
    E: Fn(&str) -> Option<String>,
    S: SecretStore + ?Sized,
{
    if let Some(password) = env(&account.password_env).filter(|p| !p.is_empty()) {
        tracing::info!("Using password from ${}", account.password_env);
        return Ok((password, CredentialSource::Environment));
    }

    tracing::info!(
        "Using keyring entry {}/{} for password",
        account.keyring_service,
        account.root_handle
    );

    match store.get_secret(&account.keyring_service, &account.root_handle)? {
        Some(password) if !password.is_empty() => Ok((password, CredentialSource::SecretStore)),
        _ => Err(ConfigError::MissingCredentials {
            handle: account.root_handle.clone(),
            env_var: account.password_env.clone(),
        }),
    }
}
