//! Credential loading from an optional `.env` file and the process environment.
//!
//! Only the phone service access key is looked up here; it is handed to the
//! phone client and never reaches the contact engine.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

/// Runtime credentials.
#[derive(Clone, Default)]
pub struct Credentials {
    vars: BTreeMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a key-value map.
    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    /// Returns a credential value for a key. Blank values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Overlay `key` from `env` when it is set there.
    pub fn overlay(&mut self, key: &str, env: impl Fn(&str) -> Option<String>) {
        if let Some(value) = env(key) {
            self.vars.insert(key.to_owned(), value);
        }
    }
}

/// Load credentials from a `.env` file.
///
/// # Errors
///
/// Returns an error if the file does not exist, permissions are too broad,
/// or parsing fails.
pub fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "credentials file does not exist: {}",
            path.display()
        ));
    }

    validate_private_permissions(path)?;

    let mut vars = BTreeMap::new();
    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read credentials at {}", path.display()))?;

    for item in iter {
        let (key, value) = item.with_context(|| {
            format!(
                "failed to parse key-value entry in credentials file {}",
                path.display()
            )
        })?;
        vars.insert(key, value);
    }

    Ok(Credentials { vars })
}

/// Load the credential named `key` from `env_file` (if present) and the
/// process environment, which wins.
///
/// # Errors
///
/// Returns an error if `env_file` exists but is unreadable or malformed.
pub fn load_service_credentials(env_file: &Path, key: &str) -> anyhow::Result<Credentials> {
    load_service_credentials_with(env_file, key, |k| std::env::var(k).ok())
}

/// [`load_service_credentials`] with a custom env resolver (for testing).
///
/// # Errors
///
/// Same as [`load_service_credentials`].
pub fn load_service_credentials_with(
    env_file: &Path,
    key: &str,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Credentials> {
    let mut credentials = if env_file.exists() {
        load_credentials(env_file)?
    } else {
        debug!(path = %env_file.display(), "no credentials file, using process environment");
        Credentials::default()
    };
    credentials.overlay(key, env);
    Ok(credentials)
}

#[cfg(unix)]
fn validate_private_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path)
        .with_context(|| format!("failed to inspect credentials file {}", path.display()))?;
    let mode = metadata.permissions().mode() & 0o777;

    if mode & 0o077 != 0 {
        return Err(anyhow::anyhow!(
            "credentials file {} must be 0600, found {:o}",
            path.display(),
            mode
        ));
    }

    Ok(())
}

#[cfg(not(unix))]
fn validate_private_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}
