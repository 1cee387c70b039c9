use crate::model::{ReconInput, Record, RecordKind, UnmatchedRecord};
use crate::normalize::{identifier_display, identifier_key};

/// A TILA record joined with its counterparts by identifier.
#[derive(Debug, Clone, Copy)]
pub struct MatchedPair<'a> {
    pub document: &'a Record,
    pub spreadsheet: &'a Record,
    /// Set for three-way matching only.
    pub loan: Option<&'a Record>,
}

impl<'a> MatchedPair<'a> {
    pub fn record(&self, kind: RecordKind) -> Option<&'a Record> {
        match kind {
            RecordKind::TilaDocument => Some(self.document),
            RecordKind::SpreadsheetRow => Some(self.spreadsheet),
            RecordKind::LoanDocument => self.loan,
        }
    }
}

#[derive(Debug)]
pub struct MatchOutput<'a> {
    pub matched: Vec<MatchedPair<'a>>,
    pub unmatched: Vec<UnmatchedRecord>,
}

/// Join TILA records to spreadsheet rows (and loan documents when
/// `three_way`) by loose identifier equality.
///
/// Linear scan per record; the first matching candidate wins. Records are
/// visited in input order, so the output order is deterministic.
pub fn match_records<'a>(input: &ReconInput<'a>, three_way: bool) -> MatchOutput<'a> {
    let mut matched = Vec::new();
    let mut unmatched = Vec::new();

    for document in input.documents {
        let Some(key) = identifier_key(document.identifier()) else {
            unmatched.push(UnmatchedRecord {
                identifier: identifier_display(document.identifier()),
                source: document.source.clone(),
                missing: if three_way {
                    vec![RecordKind::LoanDocument, RecordKind::SpreadsheetRow]
                } else {
                    vec![RecordKind::SpreadsheetRow]
                },
            });
            continue;
        };

        let spreadsheet = find_first(&key, input.spreadsheet);
        let loan = if three_way {
            find_first(&key, input.loan_documents)
        } else {
            None
        };

        let mut missing = Vec::new();
        if three_way && loan.is_none() {
            missing.push(RecordKind::LoanDocument);
        }
        if spreadsheet.is_none() {
            missing.push(RecordKind::SpreadsheetRow);
        }

        match spreadsheet {
            Some(spreadsheet) if missing.is_empty() => matched.push(MatchedPair {
                document,
                spreadsheet,
                loan,
            }),
            _ => {
                log::debug!("{}: no counterpart for identifier {key}", document.source);
                unmatched.push(UnmatchedRecord {
                    identifier: key,
                    source: document.source.clone(),
                    missing,
                });
            }
        }
    }

    MatchOutput { matched, unmatched }
}

fn find_first<'a>(key: &str, candidates: &'a [Record]) -> Option<&'a Record> {
    candidates
        .iter()
        .find(|c| identifier_key(c.identifier()).as_deref() == Some(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(source: &str, id: &str) -> Record {
        Record::new(RecordKind::TilaDocument, source).with("Account Number", id)
    }

    fn row(index: usize, id: f64, borrower: &str) -> Record {
        Record::new(RecordKind::SpreadsheetRow, format!("sheet:{index}"))
            .with("Loan Id", id)
            .with("Borrower", borrower)
    }

    fn loan(source: &str, id: &str) -> Record {
        Record::new(RecordKind::LoanDocument, source).with("Loan Id", id)
    }

    #[test]
    fn numeric_string_matches_number() {
        let docs = vec![doc("a.pdf", "100")];
        let rows = vec![row(0, 100.0, "Jane")];
        let input = ReconInput { documents: &docs, spreadsheet: &rows, loan_documents: &[] };
        let out = match_records(&input, false);
        assert_eq!(out.matched.len(), 1);
        assert!(out.unmatched.is_empty());
        assert_eq!(out.matched[0].spreadsheet.source, "sheet:0");
    }

    #[test]
    fn first_matching_row_wins() {
        let docs = vec![doc("a.pdf", "100")];
        let rows = vec![row(0, 7.0, "Other"), row(1, 100.0, "First"), row(2, 100.0, "Second")];
        let input = ReconInput { documents: &docs, spreadsheet: &rows, loan_documents: &[] };
        let out = match_records(&input, false);
        assert_eq!(out.matched[0].spreadsheet.source, "sheet:1");
    }

    #[test]
    fn unmatched_record_reported_separately() {
        let docs = vec![doc("a.pdf", "100"), doc("b.pdf", "200")];
        let rows = vec![row(0, 100.0, "Jane")];
        let input = ReconInput { documents: &docs, spreadsheet: &rows, loan_documents: &[] };
        let out = match_records(&input, false);
        assert_eq!(out.matched.len(), 1);
        assert_eq!(out.unmatched.len(), 1);
        assert_eq!(out.unmatched[0].identifier, "200");
        assert_eq!(out.unmatched[0].missing, vec![RecordKind::SpreadsheetRow]);
    }

    #[test]
    fn three_way_requires_loan_document() {
        let docs = vec![doc("a.pdf", "100"), doc("b.pdf", "200")];
        let rows = vec![row(0, 100.0, "Jane"), row(1, 200.0, "John")];
        let loans = vec![loan("l1.pdf", "200")];
        let input = ReconInput { documents: &docs, spreadsheet: &rows, loan_documents: &loans };
        let out = match_records(&input, true);
        assert_eq!(out.matched.len(), 1);
        assert_eq!(out.matched[0].document.source, "b.pdf");
        assert_eq!(out.matched[0].loan.unwrap().source, "l1.pdf");
        assert_eq!(out.unmatched[0].missing, vec![RecordKind::LoanDocument]);
    }

    #[test]
    fn matching_is_deterministic() {
        let docs = vec![doc("a.pdf", "3"), doc("b.pdf", "1"), doc("c.pdf", "2")];
        let rows = vec![row(0, 1.0, "x"), row(1, 2.0, "y"), row(2, 3.0, "z")];
        let input = ReconInput { documents: &docs, spreadsheet: &rows, loan_documents: &[] };
        let first: Vec<_> = match_records(&input, false)
            .matched
            .iter()
            .map(|p| (p.document.source.clone(), p.spreadsheet.source.clone()))
            .collect();
        let second: Vec<_> = match_records(&input, false)
            .matched
            .iter()
            .map(|p| (p.document.source.clone(), p.spreadsheet.source.clone()))
            .collect();
        assert_eq!(first, second);
        assert_eq!(first[0], ("a.pdf".to_string(), "sheet:2".to_string()));
    }

    #[test]
    fn text_identifiers_never_join_by_numeric_value() {
        let docs = vec![doc("long.pdf", "9007199254740993"), doc("padded.pdf", "00123")];
        let rows = vec![
            Record::new(RecordKind::SpreadsheetRow, "sheet:0").with("Loan Id", "9007199254740992"),
            Record::new(RecordKind::SpreadsheetRow, "sheet:1").with("Loan Id", "123"),
        ];
        let input = ReconInput { documents: &docs, spreadsheet: &rows, loan_documents: &[] };
        let out = match_records(&input, false);
        assert!(out.matched.is_empty());
        assert_eq!(out.unmatched.len(), 2);
        assert_eq!(out.unmatched[0].identifier, "9007199254740993");
        assert_eq!(out.unmatched[1].identifier, "00123");
    }

    #[test]
    fn long_text_identifiers_match_exactly() {
        let docs = vec![doc("long.pdf", "9007199254740993")];
        let rows = vec![
            Record::new(RecordKind::SpreadsheetRow, "sheet:0").with("Loan Id", "9007199254740992"),
            Record::new(RecordKind::SpreadsheetRow, "sheet:1").with("Loan Id", "9007199254740993"),
        ];
        let input = ReconInput { documents: &docs, spreadsheet: &rows, loan_documents: &[] };
        let out = match_records(&input, false);
        assert_eq!(out.matched.len(), 1);
        assert_eq!(out.matched[0].spreadsheet.source, "sheet:1");
    }
}
