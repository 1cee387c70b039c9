//! Plain-text tables for reconciliation output.
//!
//! Rendering is a pure function of its input: identical results produce
//! byte-identical text. Every mapped field gets a detail section, empty or not.

use crate::model::{
    FieldValue, MismatchBucket, PairReport, ReconResult, ReconSummary, Record, RecordKind,
};
use crate::schema::COMPLETE_TEXT;

pub const NO_DISCREPANCIES: &str = "no discrepancies found";

/// Column-aligned pipe table.
#[derive(Debug, Clone)]
pub struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push<S: Into<String>>(&mut self, row: impl IntoIterator<Item = S>) {
        let mut row: Vec<String> = row.into_iter().map(Into::into).collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let cells = |row: &[String]| -> Vec<String> { row.iter().map(|c| c.replace('|', "/")).collect() };
        let header = cells(&self.headers);
        let body: Vec<Vec<String>> = self.rows.iter().map(|r| cells(r)).collect();

        let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
        for row in &body {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let line = |row: &[String]| -> String {
            let padded: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{cell:<w$}", w = *w))
                .collect();
            format!("| {} |\n", padded.join(" | "))
        };

        let mut out = line(&header);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&format!("|-{}-|\n", rule.join("-|-")));
        for row in &body {
            out.push_str(&line(row));
        }
        out
    }
}

/// Counts table: accounts checked, accounts with incorrect data, one row per field.
pub fn render_summary(summary: &ReconSummary) -> String {
    let mut table = TextTable::new(["Metric", "Count"]);
    table.push(["Total Accounts Checked".to_string(), summary.total_checked.to_string()]);
    table.push(["Accounts With Incorrect Data".to_string(), summary.total_mismatched.to_string()]);
    for tally in &summary.fields {
        table.push([format!("Incorrect on {}", tally.field), tally.mismatches.to_string()]);
    }
    let skipped: usize = summary.fields.iter().map(|t| t.skipped).sum();
    if skipped > 0 {
        table.push(["Fields Skipped (NA)".to_string(), skipped.to_string()]);
    }
    if summary.unmatched > 0 {
        table.push(["Unmatched Records (not checked)".to_string(), summary.unmatched.to_string()]);
    }
    table.render()
}

/// Detail section for one field's mismatches.
pub fn render_bucket(bucket: &MismatchBucket, sources: &[RecordKind]) -> String {
    let mut out = format!("Incorrect Account Details: {}\n\n", bucket.field);
    if bucket.records.is_empty() {
        out.push_str(NO_DISCREPANCIES);
        out.push('\n');
        return out;
    }

    let with_payment_month = sources.contains(&RecordKind::LoanDocument);
    let mut headers = vec![
        "Serial Number".to_string(),
        "Loan Id".to_string(),
        "Booking Date".to_string(),
    ];
    if with_payment_month {
        headers.push("Payment Month Date".to_string());
    }
    for kind in sources {
        headers.push(format!("{} ({})", bucket.field, kind.source_label()));
    }

    let mut table = TextTable::new(headers);
    for (i, record) in bucket.records.iter().enumerate() {
        let mut row = vec![
            (i + 1).to_string(),
            record.identifier.clone(),
            record.booking_date.clone().unwrap_or_else(|| "NA".into()),
        ];
        if with_payment_month {
            row.push(record.payment_month_date.clone().unwrap_or_else(|| "NA".into()));
        }
        for kind in sources {
            let value = record
                .values
                .iter()
                .find(|v| v.source == *kind)
                .map(|v| v.value.clone())
                .unwrap_or_else(|| "NA".into());
            row.push(value);
        }
        table.push(row);
    }
    out.push_str(&table.render());
    out
}

/// Full report: summary, one detail section per field, unmatched list.
pub fn render_report(result: &ReconResult) -> String {
    let sources: &[RecordKind] = if result.meta.three_way {
        &[RecordKind::TilaDocument, RecordKind::LoanDocument, RecordKind::SpreadsheetRow]
    } else {
        &[RecordKind::TilaDocument, RecordKind::SpreadsheetRow]
    };

    let mut out = String::from("Summary\n\n");
    out.push_str(&render_summary(&result.summary));

    for bucket in &result.buckets {
        out.push('\n');
        out.push_str(&render_bucket(bucket, sources));
    }

    if !result.unmatched.is_empty() {
        out.push_str("\nUnmatched Records\n\n");
        let mut table = TextTable::new(["Identifier", "Source", "Missing In"]);
        for u in &result.unmatched {
            let missing: Vec<String> = u.missing.iter().map(|k| k.to_string()).collect();
            table.push([u.identifier.clone(), u.source.clone(), missing.join(", ")]);
        }
        out.push_str(&table.render());
    }
    out
}

/// Single-record table over the schema's display fields.
pub fn render_record(record: &Record) -> String {
    let heading = match record.kind {
        RecordKind::TilaDocument => "TILA",
        RecordKind::LoanDocument => "Loan Document",
        RecordKind::SpreadsheetRow => "Spreadsheet",
    };
    let mut table = TextTable::new(["Feature", heading]);
    for field in record.kind.schema().display {
        table.push([(*field).to_string(), record.get(field).display_raw()]);
    }
    table.render()
}

/// Full text captured at extraction, `None` when the document has none.
pub fn render_document_text(record: &Record) -> Option<String> {
    match record.get(COMPLETE_TEXT) {
        FieldValue::NotAvailable => None,
        value => Some(format!("{}\n", value.display_raw())),
    }
}

/// Per-field comparison for one matched pair, with a Y/N/NA mismatch flag.
pub fn render_comparison(report: &PairReport) -> String {
    let mut headers = vec!["Field".to_string()];
    if let Some(first) = report.comparisons.first() {
        for v in &first.values {
            headers.push(
                match v.source {
                    RecordKind::TilaDocument => "TILA Data",
                    RecordKind::LoanDocument => "Loan Data",
                    RecordKind::SpreadsheetRow => "Spreadsheet Data",
                }
                .to_string(),
            );
        }
    }
    headers.push("Mismatch".to_string());

    let mut table = TextTable::new(headers);
    for c in &report.comparisons {
        let mut row = vec![c.field.clone()];
        row.extend(c.values.iter().map(|v| v.value.clone()));
        row.push(c.verdict.flag().to_string());
        table.push(row);
    }
    format!("Loan Id: {}\n\n{}", report.identifier, table.render())
}
