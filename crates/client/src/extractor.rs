//! Extraction seams: documents and spreadsheets in, validated records out.

use base64::Engine as _;
use serde_json::Value;
use tila_recon::schema::SPREADSHEET_ROW;
use tila_recon::{Record, RecordKind};

use crate::client::{LlmClient, Part};
use crate::error::ExtractError;
use crate::payload::{parse_structured_block, record_objects};
use crate::prompt::{instruction, DOCUMENT_PREAMBLE, SPREADSHEET_PREAMBLE};
use crate::sheet::SheetGrid;

const PDF_MIME: &str = "application/pdf";

/// Turns one document's bytes into a record of the given kind.
pub trait DocumentExtractor {
    fn extract_document(
        &self,
        source: &str,
        bytes: &[u8],
        kind: RecordKind,
    ) -> Result<Record, ExtractError>;
}

/// Turns spreadsheet grids into spreadsheet-row records.
pub trait SpreadsheetExtractor {
    fn extract_rows(&self, sheets: &[SheetGrid]) -> Result<Vec<Record>, ExtractError>;
}

/// Extraction through the remote service.
#[derive(Debug, Clone)]
pub struct LlmExtractor {
    client: LlmClient,
}

impl LlmExtractor {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

impl DocumentExtractor for LlmExtractor {
    fn extract_document(
        &self,
        source: &str,
        bytes: &[u8],
        kind: RecordKind,
    ) -> Result<Record, ExtractError> {
        let schema = kind.schema();
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        let parts = [Part::text(DOCUMENT_PREAMBLE), Part::inline(PDF_MIME, encoded)];

        let text = self.client.generate(&instruction(schema), &parts)?;
        let value = parse_structured_block(&text)?;
        let object = single_object(value);
        Ok(schema.validate(source, &object)?)
    }
}

impl SpreadsheetExtractor for LlmExtractor {
    fn extract_rows(&self, sheets: &[SheetGrid]) -> Result<Vec<Record>, ExtractError> {
        let mut data = serde_json::Map::new();
        for sheet in sheets {
            data.insert(sheet.name.clone(), Value::Array(sheet.objects()));
        }
        let prompt = format!("{}\n{}", SPREADSHEET_PREAMBLE, Value::Object(data));

        let text = self
            .client
            .generate(&instruction(&SPREADSHEET_ROW), &[Part::text(prompt)])?;
        let value = parse_structured_block(&text)?;
        Ok(validate_rows(record_objects(value)))
    }
}

/// Offline extraction: first row of each sheet is the header, every other
/// non-blank row is one loan. Sheets are read in workbook order.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderRowExtractor;

impl SpreadsheetExtractor for HeaderRowExtractor {
    fn extract_rows(&self, sheets: &[SheetGrid]) -> Result<Vec<Record>, ExtractError> {
        let objects = sheets.iter().flat_map(SheetGrid::objects).collect();
        Ok(validate_rows(objects))
    }
}

/// Validate row objects in order. Rows without a loan identifier (totals,
/// notes) are dropped; the rest are numbered `sheet:<n>` by position.
fn validate_rows(objects: Vec<Value>) -> Vec<Record> {
    let mut records = Vec::with_capacity(objects.len());
    for (i, object) in objects.iter().enumerate() {
        match SPREADSHEET_ROW.validate(&format!("sheet:{}", i), object) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("dropping spreadsheet row: {}", e),
        }
    }
    records
}

/// Documents describe one loan; unwrap a single-element array.
fn single_object(value: Value) -> Value {
    match value {
        Value::Array(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::parse_csv;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;
    use tila_recon::FieldValue;

    fn extractor(server: &MockServer) -> LlmExtractor {
        LlmExtractor::new(LlmClient::new(&server.base_url(), "m", "t", Duration::from_secs(5)).unwrap())
    }

    fn reply(text: &str) -> Value {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
    }

    #[test]
    fn document_round_trip_through_service() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(reply(
                "```json\n{\"Account Number\": \"100\", \"Finance Charge\": \"$500.00\", \"Late Charges\": \"N/A\"}\n```",
            ));
        });

        let record = extractor(&server)
            .extract_document("100.pdf", b"%PDF-1.4", RecordKind::TilaDocument)
            .unwrap();
        mock.assert();
        assert_eq!(record.source, "100.pdf");
        assert_eq!(record.get("Finance Charge"), &FieldValue::Text("$500.00".into()));
        assert_eq!(record.get("Late Charges"), &FieldValue::NotAvailable);
    }

    #[test]
    fn document_without_block_fails() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(reply("Sorry, the file is unreadable."));
        });
        let err = extractor(&server)
            .extract_document("x.pdf", b"", RecordKind::TilaDocument)
            .unwrap_err();
        assert!(matches!(err, ExtractError::NoStructuredBlock));
    }

    #[test]
    fn document_missing_identifier_is_schema_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(reply("```json\n{\"Borrower\": \"Jane\"}\n```"));
        });
        let err = extractor(&server)
            .extract_document("x.pdf", b"", RecordKind::LoanDocument)
            .unwrap_err();
        assert!(matches!(err, ExtractError::Schema(_)));
        assert!(err.to_string().contains("Loan Id"));
    }

    #[test]
    fn spreadsheet_rows_from_service() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(reply(
                "```json\n[{\"Loan Id\": 100, \"Borrower\": \"Jane Doe\"}, {\"Borrower\": \"no id\"}]\n```",
            ));
        });
        let grid = parse_csv("Sheet1", "Loan Id,Borrower\n100,Jane Doe\n").unwrap();
        let rows = extractor(&server).extract_rows(&[grid]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source, "sheet:0");
        assert_eq!(rows[0].identifier(), &FieldValue::Number(100.0));
    }

    #[test]
    fn header_rows_offline() {
        let a = parse_csv("a", "Loan Id,EMI Amount\n100,250\nTotal,250\n").unwrap();
        let b = parse_csv("b", "Loan Id,EMI Amount\n200,300\n").unwrap();
        let rows = HeaderRowExtractor.extract_rows(&[a, b]).unwrap();
        // "Total" is a text identifier and still a row; blank ids would be dropped
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].get("EMI Amount"), &FieldValue::Number(300.0));
        assert_eq!(rows[2].source, "sheet:2");
    }

    #[test]
    fn header_rows_drop_missing_identifier() {
        let grid = parse_csv("a", "Loan Id,Borrower\n,Nobody\n7,Someone\n").unwrap();
        let rows = HeaderRowExtractor.extract_rows(&[grid]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Borrower"), &FieldValue::Text("Someone".into()));
    }
}
