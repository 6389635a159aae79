//! Keyring-based credential storage for the Subsonic server

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use keyring::Entry;
use tracing::{debug, info};

use crate::session::Credentials;
use crate::subsonic::SubsonicClient;

const KEYRING_SERVICE: &str = "coverdrop";

/// Server address plus account
#[derive(Clone)]
pub struct ServerCredentials {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl ServerCredentials {
    pub fn account(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// Manages authentication credentials storage
pub struct AuthManager;

impl AuthManager {
    /// Prompt for whatever is missing, verify against the server and store
    /// the result in the keyring. Stored credentials are reused unless
    /// `force` is set.
    pub async fn authenticate(
        url: Option<String>,
        username: Option<String>,
        password: Option<String>,
        force: bool,
    ) -> Result<ServerCredentials> {
        if !force {
            if let Ok(creds) = Self::load() {
                info!("Found existing credentials in keyring");
                return Ok(creds);
            }
        } else {
            debug!("Force flag set, ignoring stored credentials");
        }

        let url = match url {
            Some(url) => url,
            None => Input::new()
                .with_prompt("Subsonic server URL")
                .interact_text()
                .context("Failed to read URL")?,
        };
        let username = match username {
            Some(username) => username,
            None => Input::new()
                .with_prompt("Username")
                .interact_text()
                .context("Failed to read username")?,
        };
        let password = match password {
            Some(password) => password,
            None => Password::new()
                .with_prompt("Password")
                .interact()
                .context("Failed to read password")?,
        };

        let creds = ServerCredentials {
            url: url.trim_end_matches('/').to_string(),
            username,
            password,
        };

        Self::verify(&creds).await?;
        Self::store(&creds)?;
        info!("Credentials stored in keyring");

        Ok(creds)
    }

    /// Fill the gaps in command line credentials from the keyring
    pub fn resolve(
        url: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<ServerCredentials> {
        if let (Some(url), Some(username), Some(password)) = (&url, &username, &password) {
            return Ok(ServerCredentials {
                url: url.clone(),
                username: username.clone(),
                password: password.clone(),
            });
        }

        let stored = Self::load().context(
            "Missing server URL, username or password. Pass them as options, \
             set COVERDROP_URL/COVERDROP_USER/COVERDROP_PASS, or run `coverdrop auth`",
        )?;
        Ok(ServerCredentials {
            url: url.unwrap_or(stored.url),
            username: username.unwrap_or(stored.username),
            password: password.unwrap_or(stored.password),
        })
    }

    pub fn load() -> Result<ServerCredentials> {
        let url = Self::get_entry("url")?
            .get_password()
            .context("No server URL in keyring")?;

        let username = Self::get_entry("username")?
            .get_password()
            .context("No username in keyring")?;

        let password = Self::get_entry("password")?
            .get_password()
            .context("No password in keyring")?;

        Ok(ServerCredentials {
            url,
            username,
            password,
        })
    }

    pub fn store(creds: &ServerCredentials) -> Result<()> {
        Self::get_entry("url")?
            .set_password(&creds.url)
            .context("Failed to store URL in keyring")?;

        Self::get_entry("username")?
            .set_password(&creds.username)
            .context("Failed to store username in keyring")?;

        Self::get_entry("password")?
            .set_password(&creds.password)
            .context("Failed to store password in keyring")?;

        Ok(())
    }

    async fn verify(creds: &ServerCredentials) -> Result<()> {
        debug!("Verifying credentials against {}", creds.url);

        let client = SubsonicClient::new(&creds.url, &creds.username, &creds.password)?;
        client.ping().await.context("Failed to verify credentials")?;

        info!("Credentials verified successfully");
        Ok(())
    }

    fn get_entry(key: &str) -> Result<Entry> {
        Entry::new(KEYRING_SERVICE, &format!("subsonic:{}", key))
            .context("Failed to access keyring")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_command_line() {
        let creds = AuthManager::resolve(
            Some("https://music.example.com".into()),
            Some("user".into()),
            Some("pass".into()),
        )
        .unwrap();
        assert_eq!(creds.url, "https://music.example.com");
        assert_eq!(creds.account().username, "user");
        assert_eq!(creds.account().password, "pass");
    }
}
