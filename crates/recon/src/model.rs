use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ReconPolicy;
use crate::schema::{RecordSchema, LOAN_DOCUMENT, SPREADSHEET_ROW, TILA_DOCUMENT};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single extracted value. Absence is a variant, never a missing key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    NotAvailable,
}

impl FieldValue {
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::NotAvailable)
    }

    /// Raw display form, before normalization.
    pub fn display_raw(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
            Self::NotAvailable => "NA".into(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Which source a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// TILA disclosure document.
    TilaDocument,
    /// Secondary loan document.
    LoanDocument,
    /// One logical loan from a spreadsheet export.
    SpreadsheetRow,
}

impl RecordKind {
    pub fn schema(&self) -> &'static RecordSchema {
        match self {
            Self::TilaDocument => &TILA_DOCUMENT,
            Self::LoanDocument => &LOAN_DOCUMENT,
            Self::SpreadsheetRow => &SPREADSHEET_ROW,
        }
    }

    /// Column heading used in detail tables.
    pub fn source_label(&self) -> &'static str {
        match self {
            Self::TilaDocument => "per TILA",
            Self::LoanDocument => "per loan document",
            Self::SpreadsheetRow => "per spreadsheet",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TilaDocument => write!(f, "tila"),
            Self::LoanDocument => write!(f, "loan"),
            Self::SpreadsheetRow => write!(f, "sheet"),
        }
    }
}

/// A validated extraction result: field name → value for one document or row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub kind: RecordKind,
    /// Document path, or `sheet:<index>` for spreadsheet rows.
    pub source: String,
    pub fields: BTreeMap<String, FieldValue>,
}

static NOT_AVAILABLE: FieldValue = FieldValue::NotAvailable;

impl Record {
    pub fn new(kind: RecordKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style insert, mostly for tests and fixtures.
    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> &FieldValue {
        self.fields.get(field).unwrap_or(&NOT_AVAILABLE)
    }

    pub fn identifier(&self) -> &FieldValue {
        self.get(self.kind.schema().identifier)
    }
}

/// Records grouped by source. Documents are expected in path order,
/// spreadsheet rows in sheet order.
#[derive(Debug, Clone, Copy)]
pub struct ReconInput<'a> {
    pub documents: &'a [Record],
    pub spreadsheet: &'a [Record],
    pub loan_documents: &'a [Record],
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Match,
    Mismatch,
    /// Not counted: a side was not available under the skip policy.
    Skipped,
}

impl Verdict {
    /// Single-letter flag for comparison tables.
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Match => "N",
            Self::Mismatch => "Y",
            Self::Skipped => "NA",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldComparison {
    pub field: String,
    pub verdict: Verdict,
    /// Display values in source order.
    pub values: Vec<SourceValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceValue {
    pub source: RecordKind,
    pub value: String,
}

/// Every compared field for one matched pair, in mapping order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairReport {
    pub identifier: String,
    pub sources: Vec<String>,
    pub comparisons: Vec<FieldComparison>,
}

impl PairReport {
    pub fn has_mismatch(&self) -> bool {
        self.comparisons.iter().any(|c| c.verdict == Verdict::Mismatch)
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MismatchRecord {
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_month_date: Option<String>,
    pub field: String,
    pub values: Vec<SourceValue>,
}

/// Mismatching records for one mapped field, in encounter order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MismatchBucket {
    pub field: String,
    pub records: Vec<MismatchRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldTally {
    pub field: String,
    pub mismatches: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconSummary {
    pub total_checked: usize,
    pub total_mismatched: usize,
    /// Records with no counterpart. Never part of the totals above.
    pub unmatched: usize,
    /// Per-field counts in mapping order.
    pub fields: Vec<FieldTally>,
}

impl ReconSummary {
    pub fn mismatches_for(&self, field: &str) -> usize {
        self.fields
            .iter()
            .find(|t| t.field == field)
            .map(|t| t.mismatches)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedRecord {
    pub identifier: String,
    pub source: String,
    /// Sources in which no counterpart was found.
    pub missing: Vec<RecordKind>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub buckets: Vec<MismatchBucket>,
    pub pairs: Vec<PairReport>,
    /// Populated only under the `report` unmatched policy.
    pub unmatched: Vec<UnmatchedRecord>,
}

impl ReconResult {
    pub fn bucket(&self, field: &str) -> Option<&MismatchBucket> {
        self.buckets.iter().find(|b| b.field == field)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub mapping: String,
    pub three_way: bool,
    pub policy: ReconPolicy,
    pub engine_version: String,
    pub run_at: String,
}
