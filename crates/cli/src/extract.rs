//! `tila extract` - fill the extraction cache from the configured files.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tila_client::{
    extract_batch, load_sheets, CancelToken, DocumentExtractor, DocumentSource, ExtractError,
    HeaderRowExtractor, LlmClient, LlmExtractor, SpreadsheetExtractor,
};
use tila_config::{hash_file, lookup_token, AppConfig, ConfigError, ExtractionCache, FileEntry};
use tila_recon::{Record, RecordKind};

use crate::exit_codes::{extract_exit_code, EXIT_EXTRACT_PARTIAL};
use crate::util::{open_cache, source_key, to_json};
use crate::{CliError, SourceArg};

#[derive(Debug, Default, Serialize)]
struct SectionCounts {
    extracted: usize,
    cached: usize,
    failed: usize,
}

#[derive(Debug, Serialize)]
struct Failure {
    source: String,
    error: String,
    #[serde(skip)]
    code: u8,
}

#[derive(Debug, Default, Serialize)]
struct ExtractSummary {
    documents: SectionCounts,
    loan_documents: SectionCounts,
    spreadsheets: SectionCounts,
    failures: Vec<Failure>,
}

impl ExtractSummary {
    fn counts(&mut self, kind: RecordKind) -> &mut SectionCounts {
        match kind {
            RecordKind::TilaDocument => &mut self.documents,
            RecordKind::LoanDocument => &mut self.loan_documents,
            RecordKind::SpreadsheetRow => &mut self.spreadsheets,
        }
    }

    fn fail(&mut self, kind: RecordKind, source: String, error: &ExtractError) {
        // One notification per failed file, as it happens.
        eprintln!("failed: {}: {}", source, error);
        self.counts(kind).failed += 1;
        self.failures.push(Failure {
            source,
            error: error.to_string(),
            code: extract_exit_code(error),
        });
    }
}

/// A file that missed the cache.
struct Pending {
    name: String,
    source: String,
    hash: String,
}

/// Cancels the batch after the first extraction failure.
struct FailFast<'a, E> {
    inner: &'a E,
    cancel: &'a CancelToken,
}

impl<E: DocumentExtractor> DocumentExtractor for FailFast<'_, E> {
    fn extract_document(
        &self,
        source: &str,
        bytes: &[u8],
        kind: RecordKind,
    ) -> Result<Record, ExtractError> {
        let result = self.inner.extract_document(source, bytes, kind);
        if result.is_err() {
            self.cancel.cancel();
        }
        result
    }
}

pub fn cmd_extract(
    config: &AppConfig,
    only: Option<SourceArg>,
    offline: bool,
    refresh: bool,
    fail_fast: bool,
    json: bool,
) -> Result<(), CliError> {
    let mut cache = open_cache(config)?;
    let mut summary = ExtractSummary::default();
    let wants = |arg: SourceArg| only.map_or(true, |o| o == arg);

    let mut pending: Vec<(RecordKind, Vec<Pending>)> = Vec::new();
    for (arg, entries) in [
        (SourceArg::Documents, &config.documents),
        (SourceArg::Loan, &config.loan_documents),
        (SourceArg::Sheets, &config.spreadsheets),
    ] {
        if !wants(arg) {
            continue;
        }
        let kind = arg.kind();
        let misses = cache_misses(config, &cache, kind, entries, refresh, &mut summary);
        pending.push((kind, misses));
    }

    let needs_service = !offline && pending.iter().any(|(_, files)| !files.is_empty());
    let service = if needs_service {
        Some(service_extractor(config)?)
    } else {
        None
    };

    let cancel = CancelToken::new();
    for (kind, files) in pending {
        if files.is_empty() {
            continue;
        }
        match kind {
            RecordKind::SpreadsheetRow => match &service {
                Some(service) => extract_sheets(service, files, &mut cache, &mut summary),
                None => extract_sheets(&HeaderRowExtractor, files, &mut cache, &mut summary),
            },
            _ => match &service {
                Some(service) => extract_documents(
                    service, kind, files, fail_fast, &cancel, &mut cache, &mut summary,
                ),
                None => {
                    for file in files {
                        eprintln!("skipped (offline, not cached): {}", file.source);
                        summary.counts(kind).failed += 1;
                        summary.failures.push(Failure {
                            source: file.source,
                            error: "not cached and --offline given".to_string(),
                            code: EXIT_EXTRACT_PARTIAL,
                        });
                    }
                }
            },
        }
    }

    cache.save().map_err(CliError::config)?;

    if json {
        println!("{}", to_json(&summary)?);
    } else {
        for (label, counts) in [
            ("documents", &summary.documents),
            ("loan documents", &summary.loan_documents),
            ("spreadsheets", &summary.spreadsheets),
        ] {
            eprintln!(
                "{:<15} {} extracted, {} cached, {} failed",
                label, counts.extracted, counts.cached, counts.failed
            );
        }
    }

    match summary.failures.first() {
        None => Ok(()),
        Some(first) => {
            let code = if summary.failures.iter().all(|f| f.code == first.code) {
                first.code
            } else {
                EXIT_EXTRACT_PARTIAL
            };
            Err(CliError::new(
                code,
                format!("{} file(s) could not be extracted", summary.failures.len()),
            ))
        }
    }
}

/// Hash each configured file and keep the ones whose cache entry is missing
/// or stale. Unreadable files are recorded as failures.
fn cache_misses(
    config: &AppConfig,
    cache: &ExtractionCache,
    kind: RecordKind,
    entries: &[FileEntry],
    refresh: bool,
    summary: &mut ExtractSummary,
) -> Vec<Pending> {
    let mut misses = Vec::new();
    for entry in entries {
        let source = source_key(config, entry);
        let hash = match hash_file(&config.resolve(&entry.path)) {
            Ok(hash) => hash,
            Err(ConfigError::Io(msg)) => {
                summary.fail(kind, source, &ExtractError::Io(msg));
                continue;
            }
            Err(e) => {
                summary.fail(kind, source, &ExtractError::Io(e.to_string()));
                continue;
            }
        };

        let hit = match kind {
            RecordKind::SpreadsheetRow => cache.spreadsheet(&source, &hash).is_some(),
            _ => cache.document(kind, &source, &hash).is_some(),
        };
        if hit && !refresh {
            log::debug!("{}: cache hit", source);
            summary.counts(kind).cached += 1;
        } else {
            misses.push(Pending {
                name: entry.display_name(),
                source,
                hash,
            });
        }
    }
    misses
}

fn service_extractor(config: &AppConfig) -> Result<LlmExtractor, CliError> {
    let token = lookup_token(&config.service.token_env)
        .require(&config.service.token_env)
        .map_err(CliError::config)?;
    let client = LlmClient::new(
        &config.service.endpoint,
        &config.service.model,
        &token,
        config.service.timeout(),
    )
    .map_err(CliError::extract)?;
    Ok(LlmExtractor::new(client))
}

fn extract_documents<E: DocumentExtractor>(
    extractor: &E,
    kind: RecordKind,
    files: Vec<Pending>,
    fail_fast: bool,
    cancel: &CancelToken,
    cache: &mut ExtractionCache,
    summary: &mut ExtractSummary,
) {
    let sources: Vec<DocumentSource> = files
        .iter()
        .map(|f| DocumentSource {
            name: f.name.clone(),
            path: f.source.clone().into(),
        })
        .collect();

    let outcome = if fail_fast {
        extract_batch(&FailFast { inner: extractor, cancel }, kind, &sources, cancel)
    } else {
        extract_batch(extractor, kind, &sources, cancel)
    };

    let by_source: HashMap<&str, &Pending> =
        files.iter().map(|f| (f.source.as_str(), f)).collect();
    for record in outcome.records {
        match by_source.get(record.source.as_str()) {
            Some(file) => {
                cache.put_document(&file.name, file.hash.clone(), record);
                summary.counts(kind).extracted += 1;
            }
            None => log::warn!("{}: extracted record has no pending entry", record.source),
        }
    }
    for failure in outcome.failures {
        summary.fail(kind, failure.source, &failure.error);
    }
}

fn extract_sheets<E: SpreadsheetExtractor>(
    extractor: &E,
    files: Vec<Pending>,
    cache: &mut ExtractionCache,
    summary: &mut ExtractSummary,
) {
    let kind = RecordKind::SpreadsheetRow;
    for file in files {
        log::info!("extracting spreadsheet {}", file.name);
        let rows = load_sheets(Path::new(&file.source))
            .and_then(|grids| extractor.extract_rows(&grids));
        match rows {
            Ok(rows) if rows.is_empty() => {
                summary.fail(
                    kind,
                    file.source,
                    &ExtractError::Sheet("no rows with a loan identifier".to_string()),
                );
            }
            Ok(rows) => {
                log::info!("{}: {} row(s)", file.name, rows.len());
                cache.put_spreadsheet(&file.source, &file.name, file.hash, rows);
                summary.counts(kind).extracted += 1;
            }
            Err(error) => summary.fail(kind, file.source, &error),
        }
    }
}
