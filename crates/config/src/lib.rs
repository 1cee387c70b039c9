// Configuration loading, extraction cache and token lookup

pub mod cache;
pub mod error;
pub mod settings;
pub mod token;

pub use cache::{hash_bytes, hash_file, CacheStats, ExtractionCache};
pub use error::ConfigError;
pub use settings::{AppConfig, FileEntry, NotifyConfig, ServiceConfig};
pub use token::{lookup_token, TokenLookup, TokenSource};
