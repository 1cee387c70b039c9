//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `tila` exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain      | Description                                |
//! |---------|-------------|--------------------------------------------|
//! | 0       | Universal   | Success                                    |
//! | 1       | Universal   | General error (unspecified)                |
//! | 2       | Universal   | CLI usage error (bad args, unknown name)   |
//! | 3-9     | reconcile   | Reconciliation outcome and state codes     |
//! | 10-19   | config      | Config file and cache codes                |
//! | 20-29   | extract     | Extraction service and batch codes         |
//! | 30-39   | notify      | Notification relay codes                   |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use tila_client::{ExtractError, NotifyError};
use tila_config::ConfigError;
use tila_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unknown document or category name.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Reconcile (3-9)
// =============================================================================

/// Reconciliation ran and found at least one account with incorrect data.
pub const EXIT_RECON_MISMATCH: u8 = 3;

/// Required records not loaded (no documents, no spreadsheet rows, or no
/// loan documents for a three-way run).
pub const EXIT_RECON_PREREQUISITE: u8 = 4;

/// Another reconciliation run holds the run slot.
pub const EXIT_RECON_BUSY: u8 = 5;

/// Field mapping or record payload does not fit the record schema.
pub const EXIT_RECON_SCHEMA: u8 = 6;

/// The requested document has no counterpart to compare against.
pub const EXIT_RECON_UNMATCHED: u8 = 7;

// =============================================================================
// Config (10-19)
// =============================================================================

/// Config file missing or unreadable.
pub const EXIT_CONFIG_IO: u8 = 10;

/// Config file is not valid TOML or has unknown keys.
pub const EXIT_CONFIG_PARSE: u8 = 11;

/// Config parsed but failed validation.
pub const EXIT_CONFIG_INVALID: u8 = 12;

/// API token not found in the keychain or environment.
pub const EXIT_CONFIG_MISSING_TOKEN: u8 = 13;

// =============================================================================
// Extract (20-29)
// =============================================================================

/// Extraction service unreachable.
pub const EXIT_EXTRACT_NETWORK: u8 = 20;

/// Extraction service answered with a non-success status.
pub const EXIT_EXTRACT_HTTP: u8 = 21;

/// No response within `service.timeout_secs`.
pub const EXIT_EXTRACT_TIMEOUT: u8 = 22;

/// Response had no usable structured payload.
pub const EXIT_EXTRACT_PAYLOAD: u8 = 23;

/// Input document or spreadsheet could not be read.
pub const EXIT_EXTRACT_INPUT: u8 = 24;

/// Batch finished but some documents failed or were cancelled.
pub const EXIT_EXTRACT_PARTIAL: u8 = 25;

// =============================================================================
// Notify (30-39)
// =============================================================================

/// No `[notify]` section in the config.
pub const EXIT_NOTIFY_NOT_CONFIGURED: u8 = 30;

/// Relay unreachable or rejected the message.
pub const EXIT_NOTIFY_SEND: u8 = 31;

// =============================================================================
// Error mapping
// =============================================================================

pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::MissingPrerequisite(_) => EXIT_RECON_PREREQUISITE,
        ReconError::Busy => EXIT_RECON_BUSY,
        ReconError::Schema { .. } | ReconError::UnknownField { .. } => EXIT_RECON_SCHEMA,
    }
}

pub fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::Io(_) => EXIT_CONFIG_IO,
        ConfigError::Parse(_) => EXIT_CONFIG_PARSE,
        ConfigError::Validation(_) => EXIT_CONFIG_INVALID,
        ConfigError::MissingToken(_) => EXIT_CONFIG_MISSING_TOKEN,
    }
}

pub fn extract_exit_code(err: &ExtractError) -> u8 {
    match err {
        ExtractError::Network(_) => EXIT_EXTRACT_NETWORK,
        ExtractError::Http(..) => EXIT_EXTRACT_HTTP,
        ExtractError::Timeout(_) => EXIT_EXTRACT_TIMEOUT,
        ExtractError::Cancelled => EXIT_EXTRACT_PARTIAL,
        ExtractError::NoStructuredBlock | ExtractError::InvalidJson(_) => EXIT_EXTRACT_PAYLOAD,
        ExtractError::Schema(_) => EXIT_RECON_SCHEMA,
        ExtractError::Io(_) | ExtractError::Sheet(_) => EXIT_EXTRACT_INPUT,
    }
}

pub fn notify_exit_code(_err: &NotifyError) -> u8 {
    EXIT_NOTIFY_SEND
}
