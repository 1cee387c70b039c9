//! Persistent extraction cache.
//!
//! One JSON file per cache directory with three fixed sections:
//! `pdfExtractCache` (TILA documents), `excelData` (spreadsheet rows) and
//! `loanData` (loan documents). Entries are keyed by source path and carry a
//! blake3 hash of the file they came from; a changed file misses the cache.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tila_recon::{AppState, Record, RecordKind};

use crate::error::ConfigError;

pub const CACHE_FILE: &str = "extraction-cache.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionCache {
    #[serde(rename = "pdfExtractCache", default)]
    pub documents: BTreeMap<String, DocumentEntry>,
    #[serde(rename = "excelData", default)]
    pub spreadsheets: BTreeMap<String, SpreadsheetEntry>,
    #[serde(rename = "loanData", default)]
    pub loan_documents: BTreeMap<String, DocumentEntry>,
    #[serde(skip)]
    path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub name: String,
    pub hash: String,
    pub extracted_at: String,
    pub record: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadsheetEntry {
    pub name: String,
    pub hash: String,
    pub extracted_at: String,
    pub rows: Vec<Record>,
}

/// Entry counts per section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub documents: usize,
    pub spreadsheets: usize,
    pub spreadsheet_rows: usize,
    pub loan_documents: usize,
}

/// Content hash with algorithm prefix.
pub fn hash_bytes(data: &[u8]) -> String {
    format!("blake3:{}", blake3::hash(data).to_hex())
}

pub fn hash_file(path: &Path) -> Result<String, ConfigError> {
    let contents =
        fs::read(path).map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    Ok(hash_bytes(&contents))
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

impl ExtractionCache {
    /// Open the cache in `dir`. A missing file is an empty cache; a corrupt
    /// one is logged and replaced on the next save.
    pub fn open(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CACHE_FILE);
        let mut cache = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<ExtractionCache>(&text) {
                Ok(cache) => cache,
                Err(e) => {
                    log::warn!("{}: unreadable cache, starting empty: {}", path.display(), e);
                    ExtractionCache::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ExtractionCache::default(),
            Err(e) => return Err(ConfigError::Io(format!("{}: {}", path.display(), e))),
        };
        cache.path = path;
        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the cache file with the current contents.
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Io(format!("{}: {}", parent.display(), e)))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(&self.path, json)
            .map_err(|e| ConfigError::Io(format!("{}: {}", self.path.display(), e)))
    }

    fn section(&self, kind: RecordKind) -> Option<&BTreeMap<String, DocumentEntry>> {
        match kind {
            RecordKind::TilaDocument => Some(&self.documents),
            RecordKind::LoanDocument => Some(&self.loan_documents),
            RecordKind::SpreadsheetRow => None,
        }
    }

    fn section_mut(&mut self, kind: RecordKind) -> Option<&mut BTreeMap<String, DocumentEntry>> {
        match kind {
            RecordKind::TilaDocument => Some(&mut self.documents),
            RecordKind::LoanDocument => Some(&mut self.loan_documents),
            RecordKind::SpreadsheetRow => None,
        }
    }

    /// Cached record for `source`, only if the file hash still matches.
    pub fn document(&self, kind: RecordKind, source: &str, hash: &str) -> Option<&Record> {
        self.section(kind)?
            .get(source)
            .filter(|e| e.hash == hash)
            .map(|e| &e.record)
    }

    pub fn put_document(&mut self, name: &str, hash: String, record: Record) {
        let kind = record.kind;
        let Some(section) = self.section_mut(kind) else {
            log::warn!("spreadsheet row '{}' passed as a document; not cached", record.source);
            return;
        };
        section.insert(
            record.source.clone(),
            DocumentEntry {
                name: name.to_string(),
                hash,
                extracted_at: now(),
                record,
            },
        );
    }

    pub fn spreadsheet(&self, source: &str, hash: &str) -> Option<&[Record]> {
        self.spreadsheets
            .get(source)
            .filter(|e| e.hash == hash)
            .map(|e| e.rows.as_slice())
    }

    pub fn put_spreadsheet(&mut self, source: &str, name: &str, hash: String, rows: Vec<Record>) {
        self.spreadsheets.insert(
            source.to_string(),
            SpreadsheetEntry {
                name: name.to_string(),
                hash,
                extracted_at: now(),
                rows,
            },
        );
    }

    /// Drop one section, or everything when `kind` is `None`.
    pub fn clear(&mut self, kind: Option<RecordKind>) {
        match kind {
            None => {
                self.documents.clear();
                self.spreadsheets.clear();
                self.loan_documents.clear();
            }
            Some(RecordKind::TilaDocument) => self.documents.clear(),
            Some(RecordKind::LoanDocument) => self.loan_documents.clear(),
            Some(RecordKind::SpreadsheetRow) => self.spreadsheets.clear(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            documents: self.documents.len(),
            spreadsheets: self.spreadsheets.len(),
            spreadsheet_rows: self.spreadsheets.values().map(|e| e.rows.len()).sum(),
            loan_documents: self.loan_documents.len(),
        }
    }

    /// Load cached records into `state`, regardless of file hashes.
    ///
    /// `spreadsheet` picks the sheet entry by source path; `None` takes the
    /// first one in path order.
    pub fn populate(&self, state: &mut AppState, spreadsheet: Option<&str>) {
        for entry in self.documents.values().chain(self.loan_documents.values()) {
            state.insert(entry.record.clone());
        }
        let sheet = match spreadsheet {
            Some(source) => self.spreadsheets.get(source),
            None => self.spreadsheets.values().next(),
        };
        if let Some(sheet) = sheet {
            state.replace_spreadsheet(sheet.rows.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tila(source: &str, id: &str) -> Record {
        Record::new(RecordKind::TilaDocument, source).with("Account Number", id)
    }

    #[test]
    fn missing_file_is_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ExtractionCache::open(dir.path()).unwrap();
        assert_eq!(cache.stats().documents, 0);
        assert_eq!(cache.path(), dir.path().join(CACHE_FILE));
    }

    #[test]
    fn save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ExtractionCache::open(&dir.path().join("nested")).unwrap();
        cache.put_document("Loan 100", hash_bytes(b"pdf"), tila("100.pdf", "100"));
        cache.put_spreadsheet(
            "loans.csv",
            "April",
            hash_bytes(b"csv"),
            vec![Record::new(RecordKind::SpreadsheetRow, "sheet:0").with("Loan Id", 100.0)],
        );
        cache.save().unwrap();

        let reopened = ExtractionCache::open(&dir.path().join("nested")).unwrap();
        assert_eq!(reopened.stats(), CacheStats { documents: 1, spreadsheets: 1, spreadsheet_rows: 1, loan_documents: 0 });
        let record = reopened.document(RecordKind::TilaDocument, "100.pdf", &hash_bytes(b"pdf")).unwrap();
        assert_eq!(record.identifier().display_raw(), "100");
    }

    #[test]
    fn file_uses_fixed_section_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ExtractionCache::open(dir.path()).unwrap();
        cache.put_document("L", hash_bytes(b"x"), Record::new(RecordKind::LoanDocument, "l.pdf").with("Loan Id", "1"));
        cache.save().unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(CACHE_FILE)).unwrap()).unwrap();
        assert!(raw.get("pdfExtractCache").is_some());
        assert!(raw.get("excelData").is_some());
        assert_eq!(raw["loanData"]["l.pdf"]["name"], "L");
        assert!(raw["loanData"]["l.pdf"]["hash"].as_str().unwrap().starts_with("blake3:"));
    }

    #[test]
    fn changed_hash_misses() {
        let mut cache = ExtractionCache::default();
        cache.put_document("A", hash_bytes(b"v1"), tila("a.pdf", "1"));
        assert!(cache.document(RecordKind::TilaDocument, "a.pdf", &hash_bytes(b"v1")).is_some());
        assert!(cache.document(RecordKind::TilaDocument, "a.pdf", &hash_bytes(b"v2")).is_none());
        assert!(cache.document(RecordKind::LoanDocument, "a.pdf", &hash_bytes(b"v1")).is_none());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CACHE_FILE), "{ not json").unwrap();
        let cache = ExtractionCache::open(dir.path()).unwrap();
        assert_eq!(cache.stats().documents, 0);
    }

    #[test]
    fn populate_fills_state() {
        let mut cache = ExtractionCache::default();
        cache.put_document("A", hash_bytes(b"a"), tila("a.pdf", "1"));
        cache.put_spreadsheet("s.csv", "S", hash_bytes(b"s"), vec![
            Record::new(RecordKind::SpreadsheetRow, "sheet:0").with("Loan Id", 1.0),
        ]);

        let mut state = AppState::new();
        cache.populate(&mut state, None);
        assert_eq!(state.documents().len(), 1);
        assert_eq!(state.spreadsheet().len(), 1);
        assert!(state.loan_documents().is_empty());
    }

    #[test]
    fn clear_one_section() {
        let mut cache = ExtractionCache::default();
        cache.put_document("A", hash_bytes(b"a"), tila("a.pdf", "1"));
        cache.put_spreadsheet("s.csv", "S", hash_bytes(b"s"), vec![]);
        cache.clear(Some(RecordKind::TilaDocument));
        assert_eq!(cache.stats().documents, 0);
        assert_eq!(cache.stats().spreadsheets, 1);
        cache.clear(None);
        assert_eq!(cache.stats().spreadsheets, 0);
    }
}
