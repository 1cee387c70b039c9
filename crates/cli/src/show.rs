//! `tila show` - one extracted TILA document, alone or against its row.

use std::path::Path;

use tila_config::AppConfig;
use tila_recon::engine::compare_document;
use tila_recon::normalize::identifier_display;
use tila_recon::report::{render_comparison, render_document_text, render_record};
use tila_recon::{AppState, Record};

use crate::exit_codes::{EXIT_ERROR, EXIT_RECON_UNMATCHED};
use crate::reconcile::mapping;
use crate::util::{load_state, open_cache, source_key, to_json};
use crate::CliError;

/// What `tila show` prints for the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Record,
    Text,
    Compare { three_way: bool },
}

pub fn cmd_show(
    config: &AppConfig,
    document: &str,
    view: View,
    sheet: Option<&str>,
    json: bool,
) -> Result<(), CliError> {
    let cache = open_cache(config)?;
    let state = load_state(config, &cache, sheet)?;
    let record = find_document(config, &state, document)?;

    let three_way = match view {
        View::Record => {
            if json {
                println!("{}", to_json(record)?);
            } else {
                print!("{}", render_record(record));
            }
            return Ok(());
        }
        View::Text => {
            let text = render_document_text(record).ok_or_else(|| {
                CliError::new(EXIT_ERROR, format!("{} has no extracted text", record.source))
                    .with_hint("re-run `tila extract --only documents --refresh`")
            })?;
            if json {
                let out = serde_json::json!({ "source": record.source, "text": text.trim_end() });
                println!("{}", to_json(&out)?);
            } else {
                print!("{}", text);
            }
            return Ok(());
        }
        View::Compare { three_way } => three_way,
    };

    let mapping = mapping(three_way);
    let report = compare_document(record, &state.input(), mapping, config.policy.not_available)
        .ok_or_else(|| {
            let missing = if three_way {
                "a spreadsheet row and a loan document"
            } else {
                "a spreadsheet row"
            };
            CliError::new(
                EXIT_RECON_UNMATCHED,
                format!(
                    "account {} has no matching {}",
                    identifier_display(record.identifier()),
                    missing
                ),
            )
        })?;

    if json {
        println!("{}", to_json(&report)?);
    } else {
        print!("{}", render_comparison(&report));
    }
    Ok(())
}

/// Resolve DOCUMENT: configured name, cached source path, file name, or
/// account number, in that order.
fn find_document<'a>(
    config: &AppConfig,
    state: &'a AppState,
    query: &str,
) -> Result<&'a Record, CliError> {
    let by_name = config
        .documents
        .iter()
        .find(|e| e.display_name() == query)
        .map(|e| source_key(config, e));
    if let Some(record) = by_name.as_deref().and_then(|s| state.document(s)) {
        return Ok(record);
    }

    let docs = state.documents();
    docs.iter()
        .find(|r| r.source == query)
        .or_else(|| {
            docs.iter().find(|r| {
                Path::new(&r.source)
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy() == query)
            })
        })
        .or_else(|| {
            docs.iter()
                .find(|r| identifier_display(r.identifier()) == query)
        })
        .ok_or_else(|| {
            CliError::usage(format!("no extracted document matches \"{}\"", query))
                .with_hint("run `tila extract --only documents`, then retry")
        })
}
