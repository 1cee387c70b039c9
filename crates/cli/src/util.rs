//! Shared plumbing: config, cache and state loading, JSON output.

use std::path::Path;

use serde::Serialize;
use tila_config::{AppConfig, ExtractionCache, FileEntry};
use tila_recon::AppState;

use crate::exit_codes::EXIT_CONFIG_INVALID;
use crate::CliError;

pub fn load_config(path: Option<&Path>) -> Result<AppConfig, CliError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(AppConfig::default_path);
    AppConfig::load(&path).map_err(CliError::config)
}

pub fn open_cache(config: &AppConfig) -> Result<ExtractionCache, CliError> {
    ExtractionCache::open(&config.cache_dir()).map_err(CliError::config)
}

/// Cache key of a configured file: its resolved path.
pub fn source_key(config: &AppConfig, entry: &FileEntry) -> String {
    config.resolve(&entry.path).display().to_string()
}

/// Load cached records into a fresh state.
///
/// `sheet` names a configured spreadsheet; `None` takes the first one.
pub fn load_state(
    config: &AppConfig,
    cache: &ExtractionCache,
    sheet: Option<&str>,
) -> Result<AppState, CliError> {
    let source = match config.spreadsheet(sheet) {
        Some(entry) => Some(source_key(config, entry)),
        None => match sheet {
            Some(name) => {
                let names: Vec<String> =
                    config.spreadsheets.iter().map(FileEntry::display_name).collect();
                return Err(CliError::usage(format!("unknown spreadsheet: \"{}\"", name))
                    .with_hint(format!("configured spreadsheets: {}", names.join(", "))));
            }
            None => None,
        },
    };

    let mut state = AppState::new();
    cache.populate(&mut state, source.as_deref());
    log::info!(
        "loaded {} document(s), {} spreadsheet row(s), {} loan document(s)",
        state.documents().len(),
        state.spreadsheet().len(),
        state.loan_documents().len(),
    );
    Ok(state)
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))
}

pub fn write_output(path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(config: &AppConfig) -> Result<(), CliError> {
    let mut missing = Vec::new();
    for (list, entries) in [
        ("documents", &config.documents),
        ("spreadsheets", &config.spreadsheets),
        ("loan_documents", &config.loan_documents),
    ] {
        for entry in entries {
            let path = config.resolve(&entry.path);
            if !path.is_file() {
                missing.push(format!("{list}: {}", path.display()));
            }
        }
    }

    if !missing.is_empty() {
        for line in &missing {
            eprintln!("  missing {}", line);
        }
        return Err(CliError::new(
            EXIT_CONFIG_INVALID,
            format!("{} configured file(s) not found", missing.len()),
        ));
    }

    eprintln!(
        "ok: {} document(s), {} spreadsheet(s), {} loan document(s)",
        config.documents.len(),
        config.spreadsheets.len(),
        config.loan_documents.len(),
    );
    eprintln!("  service: {} ({})", config.service.endpoint, config.service.model);
    eprintln!(
        "  policy:  not_available={}, unmatched={}",
        config.policy.not_available, config.policy.unmatched
    );
    eprintln!("  cache:   {}", config.cache_dir().display());
    if let Some(notify) = &config.notify {
        eprintln!("  notify:  {} -> {}", notify.sender, notify.recipient);
    }
    Ok(())
}
