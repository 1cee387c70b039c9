//! Run configuration (TOML).
//!
//! ```toml
//! cache_dir = ".tila-cache"
//!
//! [[documents]]
//! path = "tila/100.pdf"
//! name = "Loan 100"
//!
//! [[spreadsheets]]
//! path = "loans.xlsx"
//! name = "April bookings"
//!
//! [service]
//! endpoint = "https://generativelanguage.googleapis.com"
//! model = "gemini-1.5-flash-latest"
//! timeout_secs = 60
//!
//! [policy]
//! not_available = "skip"
//! ```
//!
//! Relative paths resolve against the directory holding the config file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tila_recon::ReconPolicy;

use crate::error::ConfigError;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_TOKEN_ENV: &str = "TILA_API_TOKEN";
pub const CONFIG_FILE: &str = "tila.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub documents: Vec<FileEntry>,
    #[serde(default)]
    pub spreadsheets: Vec<FileEntry>,
    #[serde(default)]
    pub loan_documents: Vec<FileEntry>,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub policy: ReconPolicy,
    #[serde(default)]
    pub notify: Option<NotifyConfig>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Directory relative paths resolve against. Set by [`AppConfig::load`].
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// One input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileEntry {
    pub path: PathBuf,
    /// Display name. Defaults to the file name.
    #[serde(default)]
    pub name: Option<String>,
}

impl FileEntry {
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.path.display().to_string())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Environment variable holding the API token.
    pub token_env: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            token_env: DEFAULT_TOKEN_ENV.to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    /// Mail relay URL messages are POSTed to.
    pub endpoint: String,
    pub recipient: String,
    pub sender: String,
    /// Environment variable holding the relay token, if the relay needs one.
    #[serde(default)]
    pub token_env: Option<String>,
}

impl AppConfig {
    /// Parse and validate. Relative paths stay relative until `base_dir` is set.
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let mut config = Self::from_toml(&input)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        log::debug!(
            "loaded {}: {} document(s), {} spreadsheet(s), {} loan document(s)",
            path.display(),
            config.documents.len(),
            config.spreadsheets.len(),
            config.loan_documents.len(),
        );
        Ok(config)
    }

    /// `./tila.toml` if present, else `<config dir>/tila/tila.toml`.
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return local;
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tila")
            .join(CONFIG_FILE)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "service.timeout_secs must be greater than 0".into(),
            ));
        }
        check_url("service.endpoint", &self.service.endpoint)?;
        if self.service.model.trim().is_empty() {
            return Err(ConfigError::Validation("service.model must not be empty".into()));
        }
        if self.service.token_env.trim().is_empty() {
            return Err(ConfigError::Validation(
                "service.token_env must not be empty".into(),
            ));
        }

        for (list, entries) in [
            ("documents", &self.documents),
            ("spreadsheets", &self.spreadsheets),
            ("loan_documents", &self.loan_documents),
        ] {
            let mut seen = HashSet::new();
            for entry in entries {
                if entry.path.as_os_str().is_empty() {
                    return Err(ConfigError::Validation(format!("{list}: empty path")));
                }
                if !seen.insert(&entry.path) {
                    return Err(ConfigError::Validation(format!(
                        "{list}: duplicate path '{}'",
                        entry.path.display()
                    )));
                }
            }
        }

        if let Some(notify) = &self.notify {
            check_url("notify.endpoint", &notify.endpoint)?;
            for (key, addr) in [("notify.recipient", &notify.recipient), ("notify.sender", &notify.sender)] {
                if !addr.contains('@') {
                    return Err(ConfigError::Validation(format!(
                        "{key}: '{addr}' is not an e-mail address"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Resolve a config-relative path.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Configured cache directory, or the per-user cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => self.resolve(dir),
            None => dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tila"),
        }
    }

    /// Look up a spreadsheet entry by display name or path, or take the first.
    pub fn spreadsheet(&self, name: Option<&str>) -> Option<&FileEntry> {
        match name {
            None => self.spreadsheets.first(),
            Some(name) => self
                .spreadsheets
                .iter()
                .find(|e| e.display_name() == name || e.path == Path::new(name)),
        }
    }
}

fn check_url(key: &str, url: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "{key}: '{url}' must start with http:// or https://"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tila_recon::{NotAvailablePolicy, UnmatchedPolicy};

    const FULL: &str = r#"
cache_dir = "cache"

[[documents]]
path = "tila/100.pdf"
name = "Loan 100"

[[documents]]
path = "tila/200.pdf"

[[spreadsheets]]
path = "loans.xlsx"
name = "April"

[service]
model = "gemini-2.0-flash"
timeout_secs = 30

[policy]
not_available = "skip"
unmatched = "report"

[notify]
endpoint = "https://relay.example.com/send"
recipient = "ops@example.com"
sender = "tila@example.com"
"#;

    #[test]
    fn parses_full_config() {
        let config = AppConfig::from_toml(FULL).unwrap();
        assert_eq!(config.documents.len(), 2);
        assert_eq!(config.documents[0].display_name(), "Loan 100");
        assert_eq!(config.documents[1].display_name(), "200.pdf");
        assert_eq!(config.service.model, "gemini-2.0-flash");
        assert_eq!(config.service.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.service.timeout(), Duration::from_secs(30));
        assert_eq!(config.policy.not_available, NotAvailablePolicy::Skip);
        assert_eq!(config.policy.unmatched, UnmatchedPolicy::Report);
        assert!(config.notify.is_some());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert!(config.documents.is_empty());
        assert_eq!(config.service, ServiceConfig::default());
        assert_eq!(config.policy, ReconPolicy::default());
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = AppConfig::from_toml("[service]\ntimeout_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn rejects_bad_endpoint() {
        let err = AppConfig::from_toml("[service]\nendpoint = \"ftp://x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_duplicate_paths() {
        let toml = "[[documents]]\npath = \"a.pdf\"\n[[documents]]\npath = \"a.pdf\"\n";
        let err = AppConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("duplicate path"));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = AppConfig::from_toml("[[documents]]\npath = \"a.pdf\"\ncolour = \"red\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_bad_policy() {
        let err = AppConfig::from_toml("[policy]\nnot_available = \"ignore\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_bad_recipient() {
        let toml = "[notify]\nendpoint = \"https://r\"\nrecipient = \"ops\"\nsender = \"a@b\"\n";
        let err = AppConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("notify.recipient"));
    }

    #[test]
    fn load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tila.toml");
        std::fs::write(&path, FULL).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.resolve(&config.documents[0].path), dir.path().join("tila/100.pdf"));
        assert_eq!(config.cache_dir(), dir.path().join("cache"));
        assert_eq!(config.spreadsheet(Some("April")).unwrap().path, PathBuf::from("loans.xlsx"));
        assert!(config.spreadsheet(Some("May")).is_none());
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
