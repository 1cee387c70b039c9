use crate::config::NotAvailablePolicy;
use crate::mapping::FieldPair;
use crate::matcher::MatchedPair;
use crate::model::{FieldComparison, RecordKind, SourceValue, Verdict};
use crate::normalize::{normalize_for, Normalized};

/// Compare one mapped field across every source of a matched pair.
pub fn compare_field(
    pair: &MatchedPair<'_>,
    field: &FieldPair,
    sources: &[RecordKind],
    policy: NotAvailablePolicy,
) -> FieldComparison {
    let normalized: Vec<(RecordKind, Normalized)> = sources
        .iter()
        .map(|kind| {
            let value = match (pair.record(*kind), field_name(field, *kind)) {
                (Some(record), Some(name)) => normalize_for(record.get(name), field.transform, *kind),
                _ => Normalized::NotAvailable,
            };
            (*kind, value)
        })
        .collect();

    let values: Vec<Normalized> = normalized.iter().map(|(_, v)| v.clone()).collect();
    let verdict = compare_values(&values, policy);

    FieldComparison {
        field: field.label.to_string(),
        verdict,
        values: normalized
            .into_iter()
            .map(|(source, v)| SourceValue {
                source,
                value: v.display(),
            })
            .collect(),
    }
}

/// Verdict over normalized values from two or three sources.
///
/// Numbers agree when their hundredths agree; text agrees on exact
/// (case-sensitive) trimmed equality; mixed kinds never agree.
pub fn compare_values(values: &[Normalized], policy: NotAvailablePolicy) -> Verdict {
    let any_missing = values.iter().any(|v| !v.is_available());
    if any_missing {
        return match policy {
            NotAvailablePolicy::Skip => Verdict::Skipped,
            NotAvailablePolicy::Mismatch => {
                if values.iter().all(|v| !v.is_available()) {
                    Verdict::Match
                } else {
                    Verdict::Mismatch
                }
            }
        };
    }

    match values.split_first() {
        Some((first, rest)) if rest.iter().all(|v| v == first) => Verdict::Match,
        Some(_) => Verdict::Mismatch,
        None => Verdict::Match,
    }
}

fn field_name(field: &FieldPair, kind: RecordKind) -> Option<&'static str> {
    match kind {
        RecordKind::TilaDocument => Some(field.document),
        RecordKind::SpreadsheetRow => Some(field.spreadsheet),
        RecordKind::LoanDocument => field.loan,
    }
}
