//! Fixed instructions sent with each extraction request.

use tila_recon::schema::RecordSchema;
use tila_recon::RecordKind;

pub const DOCUMENT_PREAMBLE: &str = "This is a PDF document for text extraction.";
pub const SPREADSHEET_PREAMBLE: &str = "This is an Excel document for text extraction.";

/// System instruction listing every schema field.
pub fn instruction(schema: &RecordSchema) -> String {
    let lead = match schema.kind {
        RecordKind::SpreadsheetRow => {
            "For each loan, extract the following information from the provided spreadsheet data."
        }
        RecordKind::TilaDocument | RecordKind::LoanDocument => {
            "Extract and return only the text content from the provided PDF."
        }
    };

    let mut out = String::from(lead);
    out.push_str("\nData should be in the following format:\n{\n");
    for field in schema.fields {
        out.push_str("  ");
        out.push_str(field);
        out.push_str(",\n");
    }
    out.push_str("}\n");
    if schema.kind == RecordKind::SpreadsheetRow {
        out.push_str("Return a JSON array with one object per loan.\n");
    }
    out.push_str("Use N/A for any value that is not present. Return in JSON format only.");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tila_recon::schema::{SPREADSHEET_ROW, TILA_DOCUMENT};

    #[test]
    fn lists_every_field() {
        let text = instruction(&TILA_DOCUMENT);
        for field in TILA_DOCUMENT.fields {
            assert!(text.contains(&format!("  {field},")), "{field}");
        }
        assert!(text.ends_with("Return in JSON format only."));
    }

    #[test]
    fn spreadsheet_asks_for_array() {
        let text = instruction(&SPREADSHEET_ROW);
        assert!(text.starts_with("For each loan"));
        assert!(text.contains("JSON array"));
        assert!(text.contains("EMI Amount"));
    }
}
