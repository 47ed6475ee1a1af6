//! Credential wrappers that keep API keys out of logs and debug output

use secrecy::{CloneableSecret, DebugSecret, Secret};
use zeroize::Zeroize;

#[derive(Clone, Zeroize)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}

impl SecretValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// String secret; `Debug` prints `[REDACTED]` and memory is wiped on drop
pub type SecretString = Secret<SecretValue>;

pub fn secret_string(value: impl Into<String>) -> SecretString {
    Secret::new(SecretValue(value.into()))
}

/// API key pair sent with every registration attempt
#[derive(Clone, Debug)]
pub struct Credentials {
    pub api_key: SecretString,
    pub api_secret: SecretString,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: secret_string(api_key),
            api_secret: secret_string(api_secret),
        }
    }
}
