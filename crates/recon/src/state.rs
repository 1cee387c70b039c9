//! Application state: loaded records per source plus a run guard.
//!
//! Owned by the caller and passed explicitly. Reads are shared; loading new
//! records needs `&mut`. A reconciliation run holds [`RunGuard`] for its
//! whole duration so overlapping runs are rejected instead of interleaved.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::ReconPolicy;
use crate::engine;
use crate::error::ReconError;
use crate::mapping::FieldMapping;
use crate::model::{ReconInput, ReconResult, Record, RecordKind};

#[derive(Debug, Default)]
pub struct AppState {
    /// Sorted by source path.
    documents: Vec<Record>,
    /// Sheet order.
    spreadsheet: Vec<Record>,
    /// Sorted by source path.
    loan_documents: Vec<Record>,
    busy: AtomicBool,
}

/// Held while a run is in progress. Clears the busy flag on drop.
#[derive(Debug)]
pub struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a record. Documents are keyed by source path;
    /// spreadsheet rows are appended.
    pub fn insert(&mut self, record: Record) {
        match record.kind {
            RecordKind::TilaDocument => upsert(&mut self.documents, record),
            RecordKind::LoanDocument => upsert(&mut self.loan_documents, record),
            RecordKind::SpreadsheetRow => self.spreadsheet.push(record),
        }
    }

    pub fn replace_spreadsheet(&mut self, rows: Vec<Record>) {
        self.spreadsheet = rows;
    }

    pub fn remove(&mut self, kind: RecordKind, source: &str) -> Option<Record> {
        let list = match kind {
            RecordKind::TilaDocument => &mut self.documents,
            RecordKind::LoanDocument => &mut self.loan_documents,
            RecordKind::SpreadsheetRow => &mut self.spreadsheet,
        };
        let idx = list.iter().position(|r| r.source == source)?;
        Some(list.remove(idx))
    }

    pub fn documents(&self) -> &[Record] {
        &self.documents
    }

    pub fn document(&self, source: &str) -> Option<&Record> {
        self.documents.iter().find(|r| r.source == source)
    }

    pub fn spreadsheet(&self) -> &[Record] {
        &self.spreadsheet
    }

    pub fn loan_documents(&self) -> &[Record] {
        &self.loan_documents
    }

    pub fn input(&self) -> ReconInput<'_> {
        ReconInput {
            documents: &self.documents,
            spreadsheet: &self.spreadsheet,
            loan_documents: &self.loan_documents,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claim the run slot. Fails with [`ReconError::Busy`] if already held.
    pub fn try_begin(&self) -> Result<RunGuard<'_>, ReconError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ReconError::Busy)?;
        Ok(RunGuard { flag: &self.busy })
    }

    /// Check that every source the mapping needs has been loaded.
    pub fn check_prerequisites(&self, mapping: &FieldMapping) -> Result<(), ReconError> {
        if self.documents.is_empty() {
            return Err(ReconError::MissingPrerequisite("no TILA documents loaded".into()));
        }
        if self.spreadsheet.is_empty() {
            return Err(ReconError::MissingPrerequisite("no spreadsheet rows loaded".into()));
        }
        if mapping.three_way && self.loan_documents.is_empty() {
            return Err(ReconError::MissingPrerequisite("no loan documents loaded".into()));
        }
        Ok(())
    }

    /// Run one reconciliation pass over the loaded records.
    pub fn reconcile(
        &self,
        mapping: &FieldMapping,
        policy: ReconPolicy,
    ) -> Result<ReconResult, ReconError> {
        let _guard = self.try_begin()?;
        self.check_prerequisites(mapping)?;
        engine::run(mapping, &self.input(), policy)
    }
}

fn upsert(list: &mut Vec<Record>, record: Record) {
    match list.binary_search_by(|r| r.source.as_str().cmp(record.source.as_str())) {
        Ok(idx) => list[idx] = record,
        Err(idx) => list.insert(idx, record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{THREE_WAY_FEES, TILA_VS_SPREADSHEET};

    fn doc(source: &str, id: &str) -> Record {
        Record::new(RecordKind::TilaDocument, source).with("Account Number", id)
    }

    fn row(id: f64) -> Record {
        Record::new(RecordKind::SpreadsheetRow, format!("sheet:{id}")).with("Loan Id", id)
    }

    #[test]
    fn documents_kept_in_path_order() {
        let mut state = AppState::new();
        state.insert(doc("c.pdf", "3"));
        state.insert(doc("a.pdf", "1"));
        state.insert(doc("b.pdf", "2"));
        state.insert(doc("a.pdf", "10"));
        let sources: Vec<_> = state.documents().iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, vec!["a.pdf", "b.pdf", "c.pdf"]);
        assert_eq!(state.document("a.pdf").unwrap().identifier().display_raw(), "10");
    }

    #[test]
    fn missing_spreadsheet_blocks_run() {
        let mut state = AppState::new();
        state.insert(doc("a.pdf", "1"));
        let err = state.reconcile(&TILA_VS_SPREADSHEET, ReconPolicy::default()).unwrap_err();
        assert!(matches!(err, ReconError::MissingPrerequisite(_)));
        assert!(err.to_string().contains("spreadsheet"));
        assert!(!state.is_busy());
    }

    #[test]
    fn three_way_needs_loan_documents() {
        let mut state = AppState::new();
        state.insert(doc("a.pdf", "1"));
        state.insert(row(1.0));
        assert!(state.check_prerequisites(&TILA_VS_SPREADSHEET).is_ok());
        let err = state.check_prerequisites(&THREE_WAY_FEES).unwrap_err();
        assert!(err.to_string().contains("loan documents"));
    }

    #[test]
    fn overlapping_run_rejected() {
        let mut state = AppState::new();
        state.insert(doc("a.pdf", "1"));
        state.insert(row(1.0));

        let guard = state.try_begin().unwrap();
        assert!(state.is_busy());
        let err = state.reconcile(&TILA_VS_SPREADSHEET, ReconPolicy::default()).unwrap_err();
        assert!(matches!(err, ReconError::Busy));

        drop(guard);
        assert!(!state.is_busy());
        let result = state.reconcile(&TILA_VS_SPREADSHEET, ReconPolicy::default()).unwrap();
        assert_eq!(result.summary.total_checked, 1);
        assert!(!state.is_busy());
    }

    #[test]
    fn remove_and_replace() {
        let mut state = AppState::new();
        state.insert(doc("a.pdf", "1"));
        state.insert(row(1.0));
        state.replace_spreadsheet(vec![row(2.0), row(3.0)]);
        assert_eq!(state.spreadsheet().len(), 2);
        assert!(state.remove(RecordKind::TilaDocument, "a.pdf").is_some());
        assert!(state.documents().is_empty());
    }
}
