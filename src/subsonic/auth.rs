//! Subsonic salted-token authentication
//!
//! Each request carries `t = md5(password + salt)` with a fresh random salt,
//! so the password itself never goes over the wire (API 1.13.0+).

use md5::{Digest, Md5};
use rand::Rng;

/// API version to use for requests
pub const API_VERSION: &str = "1.16.1";

/// Client identifier
pub const CLIENT_NAME: &str = "coverdrop";

const SALT_LEN: usize = 16;

/// Authentication parameters for one request
#[derive(Debug, Clone)]
pub struct TokenAuth {
    username: String,
    salt: String,
    token: String,
}

impl TokenAuth {
    /// Derive a token with a fresh salt
    pub fn new(username: &str, password: &str) -> Self {
        let salt = random_salt();
        let token = salted_token(password, &salt);
        Self {
            username: username.to_string(),
            salt,
            token,
        }
    }

    /// Query pairs to append to every request
    pub fn query_pairs(&self) -> [(&str, &str); 6] {
        [
            ("u", self.username.as_str()),
            ("t", self.token.as_str()),
            ("s", self.salt.as_str()),
            ("v", API_VERSION),
            ("c", CLIENT_NAME),
            ("f", "json"),
        ]
    }
}

fn random_salt() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect()
}

fn salted_token(password: &str, salt: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    format!("{:x}", hasher.finalize())
}
