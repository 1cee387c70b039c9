/// Error type for configuration, cache and token lookup.
#[derive(Debug)]
pub enum ConfigError {
    /// File could not be read or written
    Io(String),
    /// TOML or JSON could not be parsed
    Parse(String),
    /// Parsed but semantically invalid
    Validation(String),
    /// No API token in keychain or environment
    MissingToken(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::Validation(msg) => write!(f, "Invalid config: {}", msg),
            ConfigError::MissingToken(env) => {
                write!(f, "No API token found (keychain or ${})", env)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
