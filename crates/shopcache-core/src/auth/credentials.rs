use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

const SERVICE_NAME: &str = "shopcache";

/// Keychain slot for one login email.
pub struct CredentialStore {
    email: String,
}

impl CredentialStore {
    pub fn for_account(email: &str) -> Self {
        Self {
            email: email.to_string(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.email).context("Failed to open keychain entry")
    }

    pub fn save(&self, password: &str) -> Result<()> {
        self.entry()?
            .set_password(password)
            .context("Failed to store password in keychain")
    }

    /// Stored password, or `None` when nothing is stored for this email
    pub fn password(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read password from keychain"),
        }
    }

    /// Remove the stored password. Forgetting an absent entry is not an error.
    pub fn forget(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(email = %self.email, "Keychain entry removed");
                Ok(())
            }
            Err(e) => Err(e).context("Failed to delete password from keychain"),
        }
    }
}
