// Extraction service token lookup
//
// Tokens are read from:
// 1. System keychain (preferred)
// 2. Environment variable (fallback for CI/headless)
//
// Tokens are NEVER stored in tila.toml or the cache.

use std::env;

use crate::error::ConfigError;

const KEYCHAIN_SERVICE: &str = "tila";
const KEYCHAIN_ACCOUNT: &str = "extraction/token";

/// Where a token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Keychain,
    Environment,
    None,
}

impl TokenSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenSource::Keychain => "keychain",
            TokenSource::Environment => "environment",
            TokenSource::None => "none",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenLookup {
    pub token: Option<String>,
    pub source: TokenSource,
}

impl TokenLookup {
    /// The token, or [`ConfigError::MissingToken`] naming `env_name`.
    pub fn require(self, env_name: &str) -> Result<String, ConfigError> {
        self.token
            .ok_or_else(|| ConfigError::MissingToken(env_name.to_string()))
    }
}

/// Look up the extraction service token.
///
/// Checks the keychain first, then `env_name`.
pub fn lookup_token(env_name: &str) -> TokenLookup {
    #[cfg(feature = "keychain")]
    {
        if let Ok(entry) = keyring::Entry::new(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT) {
            if let Ok(token) = entry.get_password() {
                return TokenLookup {
                    token: Some(token),
                    source: TokenSource::Keychain,
                };
            }
        }
    }

    match env_token(env_name) {
        Some(token) => TokenLookup {
            token: Some(token),
            source: TokenSource::Environment,
        },
        None => TokenLookup {
            token: None,
            source: TokenSource::None,
        },
    }
}

/// Non-empty value of `env_name`.
pub fn env_token(env_name: &str) -> Option<String> {
    env::var(env_name).ok().filter(|t| !t.trim().is_empty())
}

#[cfg(feature = "keychain")]
pub fn set_token(token: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT)
        .map_err(|e| ConfigError::Io(format!("Failed to create keychain entry: {}", e)))?;
    entry
        .set_password(token)
        .map_err(|e| ConfigError::Io(format!("Failed to store token in keychain: {}", e)))
}

#[cfg(not(feature = "keychain"))]
pub fn set_token(_token: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Io(
        "Keychain support not enabled. Set TILA_API_TOKEN instead.".to_string(),
    ))
}

#[cfg(feature = "keychain")]
pub fn delete_token() -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT)
        .map_err(|e| ConfigError::Io(format!("Failed to access keychain entry: {}", e)))?;
    entry
        .delete_credential()
        .map_err(|e| ConfigError::Io(format!("Failed to delete token from keychain: {}", e)))
}

#[cfg(not(feature = "keychain"))]
pub fn delete_token() -> Result<(), ConfigError> {
    Err(ConfigError::Io("Keychain support not enabled.".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_token_ignores_blank() {
        env::set_var("TILA_TEST_TOKEN_BLANK", "  ");
        assert_eq!(env_token("TILA_TEST_TOKEN_BLANK"), None);
        env::set_var("TILA_TEST_TOKEN_SET", "abc");
        assert_eq!(env_token("TILA_TEST_TOKEN_SET").as_deref(), Some("abc"));
        assert_eq!(env_token("TILA_TEST_TOKEN_UNSET"), None);
    }

    #[test]
    fn require_names_env_var() {
        let lookup = TokenLookup { token: None, source: TokenSource::None };
        let err = lookup.require("MY_TOKEN").unwrap_err();
        assert!(err.to_string().contains("$MY_TOKEN"));
    }
}
