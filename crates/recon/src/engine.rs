use crate::aggregate::Aggregator;
use crate::compare::compare_field;
use crate::config::{NotAvailablePolicy, ReconPolicy, UnmatchedPolicy};
use crate::error::ReconError;
use crate::mapping::FieldMapping;
use crate::matcher::{match_records, MatchedPair};
use crate::model::{PairReport, ReconInput, ReconMeta, ReconResult, Record};
use crate::normalize::identifier_display;

/// Run reconciliation per mapping. Returns per-pair comparisons, summary
/// counters and one mismatch bucket per mapped field.
pub fn run(
    mapping: &FieldMapping,
    input: &ReconInput<'_>,
    policy: ReconPolicy,
) -> Result<ReconResult, ReconError> {
    mapping.validate()?;

    let matches = match_records(input, mapping.three_way);

    let mut aggregator = Aggregator::new(mapping);
    let mut pairs = Vec::with_capacity(matches.matched.len());
    for pair in &matches.matched {
        let report = compare_pair(pair, mapping, policy.not_available);
        aggregator.record(pair, &report);
        pairs.push(report);
    }

    let (summary, buckets) = aggregator.finish(matches.unmatched.len());

    log::info!(
        "{}: {} checked, {} with incorrect data, {} unmatched",
        mapping.name,
        summary.total_checked,
        summary.total_mismatched,
        summary.unmatched,
    );

    let unmatched = match policy.unmatched {
        UnmatchedPolicy::Report => matches.unmatched,
        UnmatchedPolicy::Exclude => Vec::new(),
    };

    Ok(ReconResult {
        meta: ReconMeta {
            mapping: mapping.name.to_string(),
            three_way: mapping.three_way,
            policy,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        buckets,
        pairs,
        unmatched,
    })
}

/// Compare every mapped field of one matched pair.
pub fn compare_pair(
    pair: &MatchedPair<'_>,
    mapping: &FieldMapping,
    policy: NotAvailablePolicy,
) -> PairReport {
    let sources = mapping.sources();
    let mut record_sources = vec![pair.document.source.clone()];
    if let Some(loan) = pair.loan {
        record_sources.push(loan.source.clone());
    }
    record_sources.push(pair.spreadsheet.source.clone());

    PairReport {
        identifier: identifier_display(pair.document.identifier()),
        sources: record_sources,
        comparisons: mapping
            .pairs
            .iter()
            .map(|field| compare_field(pair, field, sources, policy))
            .collect(),
    }
}

/// Comparison table for a single TILA document, if it has counterparts.
pub fn compare_document(
    document: &Record,
    input: &ReconInput<'_>,
    mapping: &FieldMapping,
    policy: NotAvailablePolicy,
) -> Option<PairReport> {
    let single = ReconInput {
        documents: std::slice::from_ref(document),
        ..*input
    };
    let matches = match_records(&single, mapping.three_way);
    matches
        .matched
        .first()
        .map(|pair| compare_pair(pair, mapping, policy))
}
