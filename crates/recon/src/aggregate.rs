use crate::mapping::FieldMapping;
use crate::matcher::MatchedPair;
use crate::model::{
    FieldTally, MismatchBucket, MismatchRecord, PairReport, ReconSummary, Verdict,
};
use crate::schema::{BOOKING_DATE, PAYMENT_MONTH_DATE};

/// Running counters over matched pairs. One bucket per mapped field, in
/// mapping order, created up front so empty buckets survive.
#[derive(Debug)]
pub struct Aggregator {
    total_checked: usize,
    total_mismatched: usize,
    tallies: Vec<FieldTally>,
    buckets: Vec<MismatchBucket>,
}

impl Aggregator {
    pub fn new(mapping: &FieldMapping) -> Self {
        Self {
            total_checked: 0,
            total_mismatched: 0,
            tallies: mapping
                .labels()
                .map(|field| FieldTally {
                    field: field.to_string(),
                    mismatches: 0,
                    skipped: 0,
                })
                .collect(),
            buckets: mapping
                .labels()
                .map(|field| MismatchBucket {
                    field: field.to_string(),
                    records: Vec::new(),
                })
                .collect(),
        }
    }

    /// Fold one matched pair's comparisons into the counters.
    pub fn record(&mut self, pair: &MatchedPair<'_>, report: &PairReport) {
        self.total_checked += 1;
        if report.has_mismatch() {
            self.total_mismatched += 1;
        }

        let booking_date = date_field(Some(pair.spreadsheet), BOOKING_DATE);
        let payment_month_date = date_field(pair.loan, PAYMENT_MONTH_DATE);

        for comparison in &report.comparisons {
            let Some(idx) = self.tallies.iter().position(|t| t.field == comparison.field) else {
                log::warn!("comparison for unmapped field '{}' ignored", comparison.field);
                continue;
            };
            match comparison.verdict {
                Verdict::Match => {}
                Verdict::Skipped => self.tallies[idx].skipped += 1,
                Verdict::Mismatch => {
                    self.tallies[idx].mismatches += 1;
                    self.buckets[idx].records.push(MismatchRecord {
                        identifier: report.identifier.clone(),
                        booking_date: booking_date.clone(),
                        payment_month_date: payment_month_date.clone(),
                        field: comparison.field.clone(),
                        values: comparison.values.clone(),
                    });
                }
            }
        }
    }

    pub fn finish(self, unmatched: usize) -> (ReconSummary, Vec<MismatchBucket>) {
        (
            ReconSummary {
                total_checked: self.total_checked,
                total_mismatched: self.total_mismatched,
                unmatched,
                fields: self.tallies,
            },
            self.buckets,
        )
    }
}

fn date_field(record: Option<&crate::model::Record>, field: &str) -> Option<String> {
    let value = record?.get(field);
    value.is_available().then(|| value.display_raw())
}
