//! Sequential extraction over a list of documents.
//!
//! One request at a time, in list order, no retry. A failed document is
//! dropped from the records and reported in `failures`; the batch goes on.
//! The cancel token is checked before each document.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tila_recon::{Record, RecordKind};

use crate::error::ExtractError;
use crate::extractor::DocumentExtractor;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A document to extract: display name plus location on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSource {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct BatchFailure {
    pub source: String,
    pub error: ExtractError,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<Record>,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn cancelled(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| matches!(f.error, ExtractError::Cancelled))
            .count()
    }
}

/// Extract every document in order.
///
/// The record's `source` is the document path, so later loads upsert by path.
pub fn extract_batch<E: DocumentExtractor + ?Sized>(
    extractor: &E,
    kind: RecordKind,
    documents: &[DocumentSource],
    cancel: &CancelToken,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for (i, doc) in documents.iter().enumerate() {
        let source = doc.path.display().to_string();
        if cancel.is_cancelled() {
            log::info!("{} extraction cancelled, {} document(s) skipped", kind, documents.len() - i);
            outcome.failures.extend(documents[i..].iter().map(|d| BatchFailure {
                source: d.path.display().to_string(),
                error: ExtractError::Cancelled,
            }));
            break;
        }

        log::info!("extracting {} ({}/{})", doc.name, i + 1, documents.len());
        let result = std::fs::read(&doc.path)
            .map_err(|e| ExtractError::Io(format!("{}: {}", source, e)))
            .and_then(|bytes| extractor.extract_document(&source, &bytes, kind));

        match result {
            Ok(record) => outcome.records.push(record),
            Err(error) => {
                log::warn!("{}: extraction failed: {}", doc.name, error);
                outcome.failures.push(BatchFailure { source, error });
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::path::Path;

    /// Succeeds unless the bytes say "bad"; cancels after `cancel_after` calls.
    struct Scripted {
        calls: Cell<usize>,
        cancel_after: Option<(usize, CancelToken)>,
    }

    impl DocumentExtractor for Scripted {
        fn extract_document(&self, source: &str, bytes: &[u8], kind: RecordKind) -> Result<Record, ExtractError> {
            self.calls.set(self.calls.get() + 1);
            if let Some((n, token)) = &self.cancel_after {
                if self.calls.get() >= *n {
                    token.cancel();
                }
            }
            if bytes == b"bad" {
                return Err(ExtractError::NoStructuredBlock);
            }
            Ok(Record::new(kind, source).with("Account Number", "1"))
        }
    }

    fn write_docs(dir: &Path, contents: &[&[u8]]) -> Vec<DocumentSource> {
        contents
            .iter()
            .enumerate()
            .map(|(i, bytes)| {
                let path = dir.join(format!("{i}.pdf"));
                std::fs::write(&path, bytes).unwrap();
                DocumentSource { name: format!("doc {i}"), path }
            })
            .collect()
    }

    #[test]
    fn failure_is_dropped_and_batch_continues() {
        let dir = tempfile::tempdir().unwrap();
        let docs = write_docs(dir.path(), &[b"ok", b"bad", b"ok"]);
        let extractor = Scripted { calls: Cell::new(0), cancel_after: None };

        let outcome = extract_batch(&extractor, RecordKind::TilaDocument, &docs, &CancelToken::new());
        assert_eq!(extractor.calls.get(), 3);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].source.ends_with("1.pdf"));
        assert!(matches!(outcome.failures[0].error, ExtractError::NoStructuredBlock));
    }

    #[test]
    fn missing_file_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let docs = vec![DocumentSource { name: "gone".into(), path: dir.path().join("gone.pdf") }];
        let extractor = Scripted { calls: Cell::new(0), cancel_after: None };

        let outcome = extract_batch(&extractor, RecordKind::TilaDocument, &docs, &CancelToken::new());
        assert_eq!(extractor.calls.get(), 0);
        assert!(matches!(outcome.failures[0].error, ExtractError::Io(_)));
    }

    #[test]
    fn cancel_stops_remaining_documents() {
        let dir = tempfile::tempdir().unwrap();
        let docs = write_docs(dir.path(), &[b"ok", b"ok", b"ok", b"ok"]);
        let token = CancelToken::new();
        let extractor = Scripted { calls: Cell::new(0), cancel_after: Some((2, token.clone())) };

        let outcome = extract_batch(&extractor, RecordKind::LoanDocument, &docs, &token);
        assert_eq!(extractor.calls.get(), 2);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.cancelled(), 2);
        assert_eq!(outcome.records[0].kind, RecordKind::LoanDocument);
    }
}
